use crate::entities::prelude::*;
use crate::entities::{episodes, seasons, shows, video_sources, watch_history, watchlist};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_seasons_show_number")
                    .table(Seasons)
                    .col(seasons::Column::ShowId)
                    .col(seasons::Column::SeasonNumber)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_season_number")
                    .table(Episodes)
                    .col(episodes::Column::SeasonId)
                    .col(episodes::Column::EpisodeNumber)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_watchlist_user_video")
                    .table(Watchlist)
                    .col(watchlist::Column::UserId)
                    .col(watchlist::Column::VideoId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_watch_history_user_video")
                    .table(WatchHistory)
                    .col(watch_history::Column::UserId)
                    .col(watch_history::Column::VideoId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Plain lookup indexes for the hot listing paths.
        manager
            .create_index(
                Index::create()
                    .name("idx_shows_created_at")
                    .table(Shows)
                    .col(shows::Column::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_video_sources_episode")
                    .table(VideoSources)
                    .col(video_sources::Column::EpisodeId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_video_sources_episode")
                    .table(VideoSources)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_shows_created_at")
                    .table(Shows)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_watch_history_user_video")
                    .table(WatchHistory)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_watchlist_user_video")
                    .table(Watchlist)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_episodes_season_number")
                    .table(Episodes)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_seasons_show_number")
                    .table(Seasons)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
