//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::db::{Store, User};
use crate::services::auth_service::{
    AuthError, AuthService, LoginResult, UserInfo, validate_username,
};

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<RwLock<Config>>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let security = self.config.read().await.security.clone();
        if !security.allow_registration {
            return Err(AuthError::RegistrationDisabled);
        }

        let username = validate_username(username)?;
        check_password_length(password, security.min_password_length)?;

        let user = self
            .store
            .create_user(username, password, false, &security)
            .await?
            .ok_or_else(|| AuthError::UsernameTaken(username.to_string()))?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(LoginResult::from(user))
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let user = self
            .store
            .verify_user_password(username.trim(), password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(LoginResult::from(user))
    }

    async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>, AuthError> {
        if api_key.is_empty() {
            return Ok(None);
        }
        Ok(self.store.verify_api_key(api_key).await?)
    }

    async fn get_user_info(&self, user_id: i32) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(UserInfo::from(user))
    }

    async fn regenerate_api_key(&self, user_id: i32) -> Result<String, AuthError> {
        let key = self.store.regenerate_api_key(user_id).await?;
        info!(user_id, "API key regenerated");
        Ok(key)
    }

    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let security = self.config.read().await.security.clone();
        check_password_length(new_password, security.min_password_length)?;
        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if self
            .store
            .verify_user_password(&user.username, current_password)
            .await?
            .is_none()
        {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        if !self
            .store
            .update_user_password(user_id, new_password, &security)
            .await?
        {
            return Err(AuthError::UserNotFound);
        }

        info!(user_id, "Password changed");
        Ok(())
    }
}

fn check_password_length(password: &str, min: usize) -> Result<(), AuthError> {
    if password.chars().count() < min {
        return Err(AuthError::Validation(format!(
            "Password must be at least {min} characters"
        )));
    }
    Ok(())
}
