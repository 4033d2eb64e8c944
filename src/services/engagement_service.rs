//! Per-user engagement: watchlist, watch history and comments.

use thiserror::Error;

use crate::db::User;
use crate::models::{Comment, HistoryEntry, ProgressUpdate, WatchlistEntry};

pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, Error)]
pub enum EngagementError {
    #[error("Show {0} not found")]
    ShowNotFound(i32),

    #[error("Episode {0} not found")]
    EpisodeNotFound(i32),

    #[error("Comment {0} not found")]
    CommentNotFound(i32),

    #[error("Only the author or an admin may delete this comment")]
    Forbidden,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for EngagementError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for EngagementError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait EngagementService: Send + Sync {
    async fn watchlist(&self, user_id: i32) -> Result<Vec<WatchlistEntry>, EngagementError>;

    /// Returns `false` when the show was already saved.
    async fn add_to_watchlist(&self, user_id: i32, video_id: i32)
    -> Result<bool, EngagementError>;

    async fn remove_from_watchlist(
        &self,
        user_id: i32,
        video_id: i32,
    ) -> Result<bool, EngagementError>;

    async fn history(
        &self,
        user_id: i32,
        completed: Option<bool>,
        limit: u64,
    ) -> Result<Vec<HistoryEntry>, EngagementError>;

    async fn update_progress(
        &self,
        user_id: i32,
        update: &ProgressUpdate,
    ) -> Result<(), EngagementError>;

    /// Returns how many entries were removed.
    async fn clear_history(&self, user_id: i32) -> Result<u64, EngagementError>;

    async fn comments(
        &self,
        video_id: i32,
        limit: u64,
    ) -> Result<(Vec<Comment>, u64), EngagementError>;

    /// # Errors
    ///
    /// Returns [`EngagementError::Validation`] for blank text or text longer
    /// than [`MAX_COMMENT_LEN`] characters.
    async fn post_comment(
        &self,
        user: &User,
        video_id: i32,
        text: &str,
    ) -> Result<Comment, EngagementError>;

    async fn delete_comment(&self, user: &User, comment_id: i32) -> Result<(), EngagementError>;
}

/// Trims and bounds comment text.
pub fn normalize_comment(text: &str) -> Result<&str, EngagementError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(EngagementError::Validation(
            "Comment text is required".to_string(),
        ));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(EngagementError::Validation(format!(
            "Comment must be {MAX_COMMENT_LEN} characters or less"
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_comment() {
        assert_eq!(normalize_comment("  super film  ").unwrap(), "super film");
        assert!(normalize_comment("   ").is_err());
        assert!(normalize_comment(&"é".repeat(MAX_COMMENT_LEN)).is_ok());
        assert!(normalize_comment(&"a".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }
}
