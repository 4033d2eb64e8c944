use anyhow::{Context, Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, sea_query::SimpleExpr,
};
use tokio::task;

use super::{is_unique_violation, now};
use crate::config::SecurityConfig;
use crate::entities::users;

/// Account as seen outside the repository; the password hash never leaves it.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub api_key: String,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            api_key: model.api_key,
            is_admin: model.is_admin,
            created_at: model.created_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn find_one(&self, condition: SimpleExpr, what: &'static str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(condition)
            .one(&self.conn)
            .await
            .with_context(|| format!("Failed to look up user by {what}"))
    }

    /// Returns `None` when the username is taken.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        let hasher = Argon2Settings::from(security);
        let password = password.to_string();
        let password_hash = task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("Password hashing task panicked")??;

        let created_at = now();
        let row = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            api_key: Set(generate_api_key()),
            is_admin: Set(is_admin),
            updated_at: Set(created_at.clone()),
            created_at: Set(created_at),
            ..Default::default()
        };

        match row.insert(&self.conn).await {
            Ok(model) => Ok(Some(model.into())),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e).context("Failed to insert user"),
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let model = self
            .find_one(users::Column::Username.eq(username), "username")
            .await?;
        Ok(model.map(User::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let model = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .with_context(|| format!("Failed to look up user {id}"))?;
        Ok(model.map(User::from))
    }

    /// `None` for an unknown username and for a wrong password alike.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(model) = self
            .find_one(users::Column::Username.eq(username), "username")
            .await?
        else {
            return Ok(None);
        };

        let stored = model.password_hash.clone();
        let candidate = password.to_string();
        let matches = task::spawn_blocking(move || password_matches(&stored, &candidate))
            .await
            .context("Password verification task panicked")??;

        Ok(matches.then(|| model.into()))
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        let model = self
            .find_one(users::Column::ApiKey.eq(api_key), "API key")
            .await?;
        Ok(model.map(User::from))
    }

    pub async fn regenerate_api_key(&self, user_id: i32) -> Result<String> {
        let model = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow!("User not found: {user_id}"))?;

        let api_key = generate_api_key();
        let mut row: users::ActiveModel = model.into();
        row.api_key = Set(api_key.clone());
        row.updated_at = Set(now());
        row.update(&self.conn)
            .await
            .context("Failed to store regenerated API key")?;

        Ok(api_key)
    }

    /// Rehashes with the current cost settings. `false` for an unknown user.
    pub async fn update_password(
        &self,
        user_id: i32,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        let Some(model) = users::Entity::find_by_id(user_id).one(&self.conn).await? else {
            return Ok(false);
        };

        let hasher = Argon2Settings::from(security);
        let password = new_password.to_string();
        let password_hash = task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("Password hashing task panicked")??;

        let mut row: users::ActiveModel = model.into();
        row.password_hash = Set(password_hash);
        row.updated_at = Set(now());
        row.update(&self.conn)
            .await
            .context("Failed to store new password")?;

        Ok(true)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(users::Entity::find().count(&self.conn).await?)
    }
}

/// Argon2id cost parameters, copied out of the config so hashing can move to
/// the blocking pool.
#[derive(Debug, Clone, Copy)]
struct Argon2Settings {
    memory_kib: u32,
    iterations: u32,
    lanes: u32,
}

impl From<&SecurityConfig> for Argon2Settings {
    fn from(cfg: &SecurityConfig) -> Self {
        Self {
            memory_kib: cfg.argon2_memory_cost_kib,
            iterations: cfg.argon2_time_cost,
            lanes: cfg.argon2_parallelism,
        }
    }
}

impl Argon2Settings {
    fn hash(self, password: &str) -> Result<String> {
        let params = Params::new(self.memory_kib, self.iterations, self.lanes, None)
            .map_err(|e| anyhow!("Invalid Argon2 params: {e}"))?;
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow!("Failed to hash password: {e}"))
    }
}

/// The PHC string carries its own parameters, so the default verifier works
/// for hashes made with any cost.
fn password_matches(stored: &str, candidate: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow!("Corrupt password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}

/// 64 hex characters from 32 random bytes.
#[must_use]
pub fn generate_api_key() -> String {
    use rand::Rng;
    use std::fmt::Write;

    let bytes: [u8; 32] = rand::rng().random();
    let mut key = String::with_capacity(64);
    for b in bytes {
        let _ = write!(key, "{b:02x}");
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_are_hex_and_distinct() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn cheap_hash_verifies_with_default_verifier() {
        let settings = Argon2Settings {
            memory_kib: 1024,
            iterations: 1,
            lanes: 1,
        };
        let hash = settings.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(password_matches(&hash, "correct horse").unwrap());
        assert!(!password_matches(&hash, "wrong").unwrap());
    }

    #[test]
    fn corrupt_hash_is_an_error() {
        assert!(password_matches("not-a-phc-string", "x").is_err());
    }
}
