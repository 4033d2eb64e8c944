//! Domain service for accounts and credentials.
//!
//! Handles registration, login and API key management. Session cookies are
//! an HTTP concern and stay in the API layer.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Registration is disabled")]
    RegistrationDisabled,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// Returned by login and registration.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user_id: i32,
    pub username: String,
    pub api_key: String,
    pub is_admin: bool,
}

impl From<User> for LoginResult {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            api_key: user.api_key,
            is_admin: user.is_admin,
        }
    }
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a regular (non-admin) account.
    ///
    /// # Errors
    ///
    /// - Returns [`AuthError::RegistrationDisabled`] when sign-up is turned off
    /// - Returns [`AuthError::Validation`] for a malformed username or short password
    /// - Returns [`AuthError::UsernameTaken`] on a duplicate username
    async fn register(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>, AuthError>;

    async fn get_user_info(&self, user_id: i32) -> Result<UserInfo, AuthError>;

    /// Issues a fresh API key; the old one stops working immediately.
    async fn regenerate_api_key(&self, user_id: i32) -> Result<String, AuthError>;

    /// # Errors
    ///
    /// - Returns [`AuthError::Validation`] for a short or unchanged new password,
    ///   or when `current_password` is wrong
    /// - Returns [`AuthError::UserNotFound`] if the account is gone
    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}

/// 3 to 32 characters of letters, digits, `_`, `-` or `.`.
pub fn validate_username(username: &str) -> Result<&str, AuthError> {
    let username = username.trim();
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(AuthError::Validation(
            "Username must be between 3 and 32 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AuthError::Validation(
            "Username can only contain letters, numbers, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username(" zeex_fan ").unwrap(), "zeex_fan");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }
}
