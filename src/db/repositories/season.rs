use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{is_unique_violation, now};
use crate::entities::{episodes, prelude::*, seasons, upload_tasks, video_sources};
use crate::models::{NewSeason, Season, SeasonUpdate};

pub struct SeasonRepository {
    conn: DatabaseConnection,
}

impl SeasonRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub(crate) fn map_model(model: seasons::Model) -> Season {
        Season {
            id: model.id,
            show_id: model.show_id,
            season_number: model.season_number,
            name: model.name,
            poster_path: model.poster_path,
            overview: model.overview,
            air_date: model.air_date,
            created_at: model.created_at,
        }
    }

    /// Returns `None` when the show already has a season with that number.
    pub async fn create(&self, show_id: i32, season: &NewSeason) -> anyhow::Result<Option<Season>> {
        let active = seasons::ActiveModel {
            show_id: Set(show_id),
            season_number: Set(season.season_number),
            name: Set(season.display_name()),
            poster_path: Set(season.poster_path.clone()),
            overview: Set(season.overview.clone()),
            air_date: Set(season.air_date.clone()),
            created_at: Set(now()),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(Self::map_model(model))),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, id: i32) -> anyhow::Result<Option<Season>> {
        let model = Seasons::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(Self::map_model))
    }

    pub async fn get_by_number(
        &self,
        show_id: i32,
        season_number: i32,
    ) -> anyhow::Result<Option<Season>> {
        let model = Seasons::find()
            .filter(seasons::Column::ShowId.eq(show_id))
            .filter(seasons::Column::SeasonNumber.eq(season_number))
            .one(&self.conn)
            .await?;
        Ok(model.map(Self::map_model))
    }

    pub async fn list_for_show(&self, show_id: i32) -> anyhow::Result<Vec<Season>> {
        let rows = Seasons::find()
            .filter(seasons::Column::ShowId.eq(show_id))
            .order_by_asc(seasons::Column::SeasonNumber)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn update(&self, id: i32, update: &SeasonUpdate) -> anyhow::Result<Option<Season>> {
        let Some(model) = Seasons::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: seasons::ActiveModel = model.into();
        if let Some(name) = &update.name {
            active.name = Set(name.clone());
        }
        if let Some(poster) = &update.poster_path {
            active.poster_path = Set(Some(poster.clone()));
        }
        if let Some(overview) = &update.overview {
            active.overview = Set(Some(overview.clone()));
        }
        if let Some(date) = &update.air_date {
            active.air_date = Set(Some(date.clone()));
        }

        let model = active.update(&self.conn).await?;
        Ok(Some(Self::map_model(model)))
    }

    pub async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        let txn = self.conn.begin().await?;

        let episode_ids: Vec<i32> = Episodes::find()
            .select_only()
            .column(episodes::Column::Id)
            .filter(episodes::Column::SeasonId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        if !episode_ids.is_empty() {
            VideoSources::delete_many()
                .filter(video_sources::Column::EpisodeId.is_in(episode_ids.clone()))
                .exec(&txn)
                .await?;
            UploadTasks::delete_many()
                .filter(upload_tasks::Column::EpisodeId.is_in(episode_ids))
                .exec(&txn)
                .await?;
        }
        Episodes::delete_many()
            .filter(episodes::Column::SeasonId.eq(id))
            .exec(&txn)
            .await?;

        let result = Seasons::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> anyhow::Result<u64> {
        Ok(Seasons::find().count(&self.conn).await?)
    }
}
