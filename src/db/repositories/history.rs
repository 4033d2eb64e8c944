use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use super::now;
use super::show::ShowRepository;
use crate::entities::{prelude::*, watch_history};
use crate::models::{HistoryEntry, ProgressUpdate};

pub struct HistoryRepository {
    conn: DatabaseConnection,
}

impl HistoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// One row per (user, show); later reports overwrite earlier ones.
    pub async fn record(&self, user_id: i32, update: &ProgressUpdate) -> anyhow::Result<()> {
        let active = watch_history::ActiveModel {
            user_id: Set(user_id),
            video_id: Set(update.video_id),
            episode_id: Set(update.episode_id),
            progress: Set(update.progress.max(0)),
            completed: Set(update.completed),
            updated_at: Set(now()),
            ..Default::default()
        };

        WatchHistory::insert(active)
            .on_conflict(
                OnConflict::columns([watch_history::Column::UserId, watch_history::Column::VideoId])
                    .update_columns([
                        watch_history::Column::EpisodeId,
                        watch_history::Column::Progress,
                        watch_history::Column::Completed,
                        watch_history::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn list(
        &self,
        user_id: i32,
        completed: Option<bool>,
        limit: u64,
    ) -> anyhow::Result<Vec<HistoryEntry>> {
        let mut query = WatchHistory::find().filter(watch_history::Column::UserId.eq(user_id));
        if let Some(completed) = completed {
            query = query.filter(watch_history::Column::Completed.eq(completed));
        }
        let rows = query
            .order_by_desc(watch_history::Column::UpdatedAt)
            .limit(limit)
            .find_also_related(Shows)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(entry, show)| HistoryEntry {
                id: entry.id,
                video_id: entry.video_id,
                episode_id: entry.episode_id,
                progress: entry.progress,
                completed: entry.completed,
                updated_at: entry.updated_at,
                video: show.map(ShowRepository::map_model),
            })
            .collect())
    }

    pub async fn clear(&self, user_id: i32) -> anyhow::Result<u64> {
        let result = WatchHistory::delete_many()
            .filter(watch_history::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
