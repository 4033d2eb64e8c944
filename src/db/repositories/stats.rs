use sea_orm::DatabaseConnection;

use super::{
    episode::EpisodeRepository, season::SeasonRepository, show::ShowRepository,
    source::SourceRepository, upload_task::UploadTaskRepository, user::UserRepository,
};
use crate::models::{CatalogStats, ShowKind, UploadStatus};

pub struct StatsRepository {
    conn: DatabaseConnection,
}

impl StatsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn catalog(&self) -> anyhow::Result<CatalogStats> {
        let shows = ShowRepository::new(self.conn.clone());

        let (shows_total, movies, series, total_views) = tokio::try_join!(
            shows.count(None),
            shows.count(Some(ShowKind::Movie)),
            shows.count(Some(ShowKind::Series)),
            shows.total_views(),
        )?;

        let seasons = SeasonRepository::new(self.conn.clone()).count().await?;
        let episodes = EpisodeRepository::new(self.conn.clone()).count().await?;
        let video_sources = SourceRepository::new(self.conn.clone()).count().await?;
        let users = UserRepository::new(self.conn.clone()).count().await?;
        let pending_uploads = UploadTaskRepository::new(self.conn.clone())
            .count_by_status(UploadStatus::Pending)
            .await?;

        Ok(CatalogStats {
            shows_total,
            movies,
            series,
            seasons,
            episodes,
            video_sources,
            total_views,
            users,
            pending_uploads,
        })
    }
}
