use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use super::now;
use crate::entities::{prelude::*, video_sources};
use crate::models::{NewVideoSource, ServerName, SourceUpdate, VideoSource};

pub struct SourceRepository {
    conn: DatabaseConnection,
}

impl SourceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: video_sources::Model) -> VideoSource {
        VideoSource {
            id: model.id,
            episode_id: model.episode_id,
            server_name: model.server_name.parse().unwrap_or(ServerName::Telegram),
            link: model.link,
            file_id: model.file_id,
            filemoon_code: model.filemoon_code,
            quality: model.quality,
            language: model.language,
            is_active: model.is_active,
            file_size: model.file_size,
            duration: model.duration,
            mime_type: model.mime_type,
            created_at: model.created_at,
        }
    }

    pub async fn create(
        &self,
        episode_id: i32,
        source: &NewVideoSource,
    ) -> anyhow::Result<VideoSource> {
        let active = video_sources::ActiveModel {
            episode_id: Set(episode_id),
            server_name: Set(source.server_name.as_str().to_string()),
            link: Set(source.link.clone()),
            file_id: Set(source.file_id.clone()),
            filemoon_code: Set(source.filemoon_code.clone()),
            quality: Set(source.quality.clone().unwrap_or_else(|| "HD".to_string())),
            language: Set(source.language.clone().unwrap_or_else(|| "FR".to_string())),
            is_active: Set(true),
            file_size: Set(source.file_size),
            duration: Set(source.duration),
            mime_type: Set(source.mime_type.clone()),
            created_at: Set(now()),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        info!(
            source_id = model.id,
            episode_id,
            server = %model.server_name,
            "Video source added"
        );
        Ok(Self::map_model(model))
    }

    pub async fn get(&self, id: i32) -> anyhow::Result<Option<VideoSource>> {
        let model = VideoSources::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(Self::map_model))
    }

    pub async fn list_for_episode(
        &self,
        episode_id: i32,
        active_only: bool,
    ) -> anyhow::Result<Vec<VideoSource>> {
        let mut query = VideoSources::find().filter(video_sources::Column::EpisodeId.eq(episode_id));
        if active_only {
            query = query.filter(video_sources::Column::IsActive.eq(true));
        }
        let rows = query
            .order_by_asc(video_sources::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn list_for_episodes(
        &self,
        episode_ids: &[i32],
        active_only: bool,
    ) -> anyhow::Result<Vec<VideoSource>> {
        if episode_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = VideoSources::find()
            .filter(video_sources::Column::EpisodeId.is_in(episode_ids.iter().copied()));
        if active_only {
            query = query.filter(video_sources::Column::IsActive.eq(true));
        }
        let rows = query
            .order_by_asc(video_sources::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Most recent source carrying this Telegram `file_id`.
    pub async fn find_by_file_id(&self, file_id: &str) -> anyhow::Result<Option<VideoSource>> {
        let model = VideoSources::find()
            .filter(video_sources::Column::FileId.eq(file_id))
            .order_by_desc(video_sources::Column::Id)
            .one(&self.conn)
            .await?;
        Ok(model.map(Self::map_model))
    }

    pub async fn update(&self, id: i32, update: &SourceUpdate) -> anyhow::Result<Option<VideoSource>> {
        let Some(model) = VideoSources::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: video_sources::ActiveModel = model.into();
        if let Some(link) = &update.link {
            active.link = Set(link.clone());
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(quality) = &update.quality {
            active.quality = Set(quality.clone());
        }
        if let Some(code) = &update.filemoon_code {
            active.filemoon_code = Set(Some(code.clone()));
        }

        let model = active.update(&self.conn).await?;
        Ok(Some(Self::map_model(model)))
    }

    pub async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        let result = VideoSources::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> anyhow::Result<u64> {
        Ok(VideoSources::find().count(&self.conn).await?)
    }
}
