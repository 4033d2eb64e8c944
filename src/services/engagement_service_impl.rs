//! `SeaORM` implementation of the `EngagementService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{Store, User};
use crate::models::{Comment, HistoryEntry, ProgressUpdate, WatchlistEntry};
use crate::services::engagement_service::{EngagementError, EngagementService, normalize_comment};

pub struct SeaOrmEngagementService {
    store: Store,
}

impl SeaOrmEngagementService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn require_show(&self, video_id: i32) -> Result<(), EngagementError> {
        if self.store.get_show(video_id).await?.is_none() {
            return Err(EngagementError::ShowNotFound(video_id));
        }
        Ok(())
    }
}

#[async_trait]
impl EngagementService for SeaOrmEngagementService {
    async fn watchlist(&self, user_id: i32) -> Result<Vec<WatchlistEntry>, EngagementError> {
        Ok(self.store.list_watchlist(user_id).await?)
    }

    async fn add_to_watchlist(
        &self,
        user_id: i32,
        video_id: i32,
    ) -> Result<bool, EngagementError> {
        self.require_show(video_id).await?;
        Ok(self.store.add_to_watchlist(user_id, video_id).await?)
    }

    async fn remove_from_watchlist(
        &self,
        user_id: i32,
        video_id: i32,
    ) -> Result<bool, EngagementError> {
        Ok(self.store.remove_from_watchlist(user_id, video_id).await?)
    }

    async fn history(
        &self,
        user_id: i32,
        completed: Option<bool>,
        limit: u64,
    ) -> Result<Vec<HistoryEntry>, EngagementError> {
        Ok(self.store.list_history(user_id, completed, limit).await?)
    }

    async fn update_progress(
        &self,
        user_id: i32,
        update: &ProgressUpdate,
    ) -> Result<(), EngagementError> {
        if update.progress < 0 {
            return Err(EngagementError::Validation(
                "progress must be 0 or greater".to_string(),
            ));
        }
        self.require_show(update.video_id).await?;

        if let Some(episode_id) = update.episode_id {
            let (_, _, show) = self
                .store
                .get_episode_with_context(episode_id)
                .await?
                .ok_or(EngagementError::EpisodeNotFound(episode_id))?;
            if show.id != update.video_id {
                return Err(EngagementError::Validation(format!(
                    "Episode {episode_id} does not belong to show {}",
                    update.video_id
                )));
            }
        }

        self.store.record_progress(user_id, update).await?;
        Ok(())
    }

    async fn clear_history(&self, user_id: i32) -> Result<u64, EngagementError> {
        Ok(self.store.clear_history(user_id).await?)
    }

    async fn comments(
        &self,
        video_id: i32,
        limit: u64,
    ) -> Result<(Vec<Comment>, u64), EngagementError> {
        Ok(self.store.list_comments(video_id, 0, limit).await?)
    }

    async fn post_comment(
        &self,
        user: &User,
        video_id: i32,
        text: &str,
    ) -> Result<Comment, EngagementError> {
        let text = normalize_comment(text)?;
        self.require_show(video_id).await?;

        let comment = self
            .store
            .add_comment(user.id, &user.username, video_id, text)
            .await?;
        info!(comment_id = comment.id, video_id, user_id = user.id, "Comment posted");
        Ok(comment)
    }

    async fn delete_comment(&self, user: &User, comment_id: i32) -> Result<(), EngagementError> {
        let author = self
            .store
            .comment_author(comment_id)
            .await?
            .ok_or(EngagementError::CommentNotFound(comment_id))?;

        if author != user.id && !user.is_admin {
            return Err(EngagementError::Forbidden);
        }

        self.store.delete_comment(comment_id).await?;
        info!(comment_id, by = user.id, "Comment deleted");
        Ok(())
    }
}
