use anyhow::{Context, bail};

use crate::config::{Config, SecurityConfig};
use crate::db::Store;

pub async fn cmd_reset_password(config: &Config, username: &str, password: &str) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let api_key = reset_credentials(&store, &config.security, username, password).await?;
    println!("✓ Password updated for '{username}'");
    println!("  New API key: {api_key}");
    Ok(())
}

/// Sets a new password and rotates the API key, so a leaked key dies with
/// the old password.
async fn reset_credentials(
    store: &Store,
    security: &SecurityConfig,
    username: &str,
    password: &str,
) -> anyhow::Result<String> {
    if password.chars().count() < security.min_password_length {
        bail!(
            "Password must be at least {} characters",
            security.min_password_length
        );
    }
    let user = store
        .get_user_by_username(username)
        .await?
        .with_context(|| format!("No user named '{username}'"))?;

    store.update_user_password(user.id, password, security).await?;
    store.regenerate_api_key(user.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrator::m20240102_seed_admin::DEFAULT_API_KEY;

    #[tokio::test]
    async fn reset_replaces_seeded_credentials() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let security = SecurityConfig::default();

        let key = reset_credentials(&store, &security, "admin", "une-phrase-secrete")
            .await
            .unwrap();
        assert_ne!(key, DEFAULT_API_KEY);
        assert!(store.verify_api_key(DEFAULT_API_KEY).await.unwrap().is_none());
        assert!(store.verify_user_password("admin", "password").await.unwrap().is_none());
        assert!(
            store
                .verify_user_password("admin", "une-phrase-secrete")
                .await
                .unwrap()
                .is_some()
        );

        assert!(reset_credentials(&store, &security, "admin", "court").await.is_err());
        assert!(reset_credentials(&store, &security, "personne", "une-phrase-secrete").await.is_err());
    }
}
