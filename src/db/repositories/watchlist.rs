use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::show::ShowRepository;
use super::{is_unique_violation, now};
use crate::entities::{prelude::*, watchlist};
use crate::models::WatchlistEntry;

pub struct WatchlistRepository {
    conn: DatabaseConnection,
}

impl WatchlistRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns `false` when the show is already on the user's list.
    pub async fn add(&self, user_id: i32, video_id: i32) -> anyhow::Result<bool> {
        let active = watchlist::ActiveModel {
            user_id: Set(user_id),
            video_id: Set(video_id),
            added_at: Set(now()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove(&self, user_id: i32, video_id: i32) -> anyhow::Result<bool> {
        let result = Watchlist::delete_many()
            .filter(watchlist::Column::UserId.eq(user_id))
            .filter(watchlist::Column::VideoId.eq(video_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Newest additions first, each joined with its show.
    pub async fn list(&self, user_id: i32) -> anyhow::Result<Vec<WatchlistEntry>> {
        let rows = Watchlist::find()
            .filter(watchlist::Column::UserId.eq(user_id))
            .order_by_desc(watchlist::Column::AddedAt)
            .find_also_related(Shows)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(entry, show)| WatchlistEntry {
                id: entry.id,
                video_id: entry.video_id,
                added_at: entry.added_at,
                video: show.map(ShowRepository::map_model),
            })
            .collect())
    }
}
