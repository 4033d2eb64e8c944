use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::season::SeasonRepository;
use super::show::ShowRepository;
use super::{is_unique_violation, now};
use crate::entities::{episodes, prelude::*, seasons, upload_tasks, video_sources};
use crate::models::{Episode, EpisodeUpdate, NewEpisode, Season, Show};

pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub(crate) fn map_model(model: episodes::Model) -> Episode {
        Episode {
            id: model.id,
            season_id: model.season_id,
            episode_number: model.episode_number,
            title: model.title,
            overview: model.overview,
            thumbnail: model.thumbnail,
            air_date: model.air_date,
            runtime: model.runtime,
            created_at: model.created_at,
        }
    }

    /// Returns `None` when the season already has an episode with that number.
    pub async fn create(
        &self,
        season_id: i32,
        episode: &NewEpisode,
    ) -> anyhow::Result<Option<Episode>> {
        let active = episodes::ActiveModel {
            season_id: Set(season_id),
            episode_number: Set(episode.episode_number),
            title: Set(episode.display_title()),
            overview: Set(episode.overview.clone()),
            thumbnail: Set(episode.thumbnail.clone()),
            air_date: Set(episode.air_date.clone()),
            runtime: Set(episode.runtime),
            created_at: Set(now()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(Self::map_model(model))),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, id: i32) -> anyhow::Result<Option<Episode>> {
        let model = Episodes::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(Self::map_model))
    }

    pub async fn get_by_number(
        &self,
        season_id: i32,
        episode_number: i32,
    ) -> anyhow::Result<Option<Episode>> {
        let model = Episodes::find()
            .filter(episodes::Column::SeasonId.eq(season_id))
            .filter(episodes::Column::EpisodeNumber.eq(episode_number))
            .one(&self.conn)
            .await?;
        Ok(model.map(Self::map_model))
    }

    /// Episode together with its season and show.
    pub async fn with_context(&self, id: i32) -> anyhow::Result<Option<(Episode, Season, Show)>> {
        let Some((episode, Some(season))) = Episodes::find_by_id(id)
            .find_also_related(Seasons)
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };
        let Some(show) = Shows::find_by_id(season.show_id).one(&self.conn).await? else {
            return Ok(None);
        };
        Ok(Some((
            Self::map_model(episode),
            SeasonRepository::map_model(season),
            ShowRepository::map_model(show),
        )))
    }

    pub async fn list_for_season(&self, season_id: i32) -> anyhow::Result<Vec<Episode>> {
        let rows = Episodes::find()
            .filter(episodes::Column::SeasonId.eq(season_id))
            .order_by_asc(episodes::Column::EpisodeNumber)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Batch variant ordered by season then episode number.
    pub async fn list_for_seasons(&self, season_ids: &[i32]) -> anyhow::Result<Vec<Episode>> {
        if season_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Episodes::find()
            .filter(episodes::Column::SeasonId.is_in(season_ids.iter().copied()))
            .order_by_asc(episodes::Column::SeasonId)
            .order_by_asc(episodes::Column::EpisodeNumber)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Every episode of a show, ordered by season then episode number.
    pub async fn list_for_show(&self, show_id: i32) -> anyhow::Result<Vec<Episode>> {
        let season_ids: Vec<i32> = Seasons::find()
            .select_only()
            .column(seasons::Column::Id)
            .filter(seasons::Column::ShowId.eq(show_id))
            .order_by_asc(seasons::Column::SeasonNumber)
            .into_tuple()
            .all(&self.conn)
            .await?;
        self.list_for_seasons(&season_ids).await
    }

    pub async fn count_for_season(&self, season_id: i32) -> anyhow::Result<u64> {
        Ok(Episodes::find()
            .filter(episodes::Column::SeasonId.eq(season_id))
            .count(&self.conn)
            .await?)
    }

    pub async fn update(&self, id: i32, update: &EpisodeUpdate) -> anyhow::Result<Option<Episode>> {
        let Some(model) = Episodes::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: episodes::ActiveModel = model.into();
        if let Some(title) = &update.title {
            active.title = Set(title.clone());
        }
        if let Some(overview) = &update.overview {
            active.overview = Set(Some(overview.clone()));
        }
        if let Some(thumbnail) = &update.thumbnail {
            active.thumbnail = Set(Some(thumbnail.clone()));
        }
        if let Some(date) = &update.air_date {
            active.air_date = Set(Some(date.clone()));
        }
        if let Some(runtime) = update.runtime {
            active.runtime = Set(Some(runtime));
        }

        let model = active.update(&self.conn).await?;
        Ok(Some(Self::map_model(model)))
    }

    pub async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        let txn = self.conn.begin().await?;
        VideoSources::delete_many()
            .filter(video_sources::Column::EpisodeId.eq(id))
            .exec(&txn)
            .await?;
        UploadTasks::delete_many()
            .filter(upload_tasks::Column::EpisodeId.eq(id))
            .exec(&txn)
            .await?;
        let result = Episodes::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> anyhow::Result<u64> {
        Ok(Episodes::find().count(&self.conn).await?)
    }
}
