use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use super::{contains_pattern, is_unique_violation, now};
use crate::entities::{
    comments, episodes, prelude::*, seasons, shows, upload_tasks, video_sources, watch_history,
    watchlist,
};
use crate::models::{NewShow, Show, ShowFilter, ShowKind, ShowSort, ShowUpdate, SortOrder};

pub struct ShowRepository {
    conn: DatabaseConnection,
}

impl ShowRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub(crate) fn map_model(model: shows::Model) -> Show {
        Show {
            id: model.id,
            tmdb_id: model.tmdb_id,
            title: model.title,
            kind: model.kind.parse().unwrap_or(ShowKind::Series),
            overview: model.overview,
            poster_path: model.poster_path,
            backdrop_path: model.backdrop_path,
            release_date: model.release_date,
            genres: model
                .genres
                .and_then(|g| serde_json::from_str(&g).ok())
                .unwrap_or_default(),
            runtime: model.runtime,
            rating: model.rating,
            language: model.language,
            views: model.views,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    /// Returns `None` when a show with the same `tmdb_id` already exists.
    pub async fn create(&self, show: &NewShow) -> anyhow::Result<Option<Show>> {
        let timestamp = now();
        let active = shows::ActiveModel {
            tmdb_id: Set(show.tmdb_id),
            title: Set(show.title.trim().to_string()),
            kind: Set(show.kind.as_str().to_string()),
            overview: Set(show.overview.clone()),
            poster_path: Set(show.poster_path.clone()),
            backdrop_path: Set(show.backdrop_path.clone()),
            release_date: Set(show.release_date.clone()),
            genres: Set(serde_json::to_string(&show.genres).ok()),
            runtime: Set(show.runtime),
            rating: Set(show.rating),
            language: Set(show.language.clone().unwrap_or_else(|| "fr".to_string())),
            views: Set(0),
            status: Set("active".to_string()),
            created_at: Set(timestamp.clone()),
            updated_at: Set(timestamp),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => {
                info!(show_id = model.id, title = %model.title, "Show created");
                Ok(Some(Self::map_model(model)))
            }
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Refreshes TMDB-sourced metadata, keeping views and timestamps of creation.
    pub async fn upsert_metadata(&self, show: &NewShow) -> anyhow::Result<()> {
        let timestamp = now();
        let active = shows::ActiveModel {
            tmdb_id: Set(show.tmdb_id),
            title: Set(show.title.clone()),
            kind: Set(show.kind.as_str().to_string()),
            overview: Set(show.overview.clone()),
            poster_path: Set(show.poster_path.clone()),
            backdrop_path: Set(show.backdrop_path.clone()),
            release_date: Set(show.release_date.clone()),
            genres: Set(serde_json::to_string(&show.genres).ok()),
            runtime: Set(show.runtime),
            rating: Set(show.rating),
            language: Set(show.language.clone().unwrap_or_else(|| "fr".to_string())),
            views: Set(0),
            status: Set("active".to_string()),
            created_at: Set(timestamp.clone()),
            updated_at: Set(timestamp),
            ..Default::default()
        };

        Shows::insert(active)
            .on_conflict(
                OnConflict::column(shows::Column::TmdbId)
                    .update_columns([
                        shows::Column::Title,
                        shows::Column::Overview,
                        shows::Column::PosterPath,
                        shows::Column::BackdropPath,
                        shows::Column::ReleaseDate,
                        shows::Column::Genres,
                        shows::Column::Runtime,
                        shows::Column::Rating,
                        shows::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: i32) -> anyhow::Result<Option<Show>> {
        let model = Shows::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(Self::map_model))
    }

    pub async fn get_by_tmdb_id(&self, tmdb_id: i32) -> anyhow::Result<Option<Show>> {
        let model = Shows::find()
            .filter(shows::Column::TmdbId.eq(tmdb_id))
            .one(&self.conn)
            .await?;
        Ok(model.map(Self::map_model))
    }

    fn filter_condition(filter: &ShowFilter) -> Condition {
        let mut cond = Condition::all();
        if !filter.include_inactive {
            cond = cond.add(shows::Column::Status.eq("active"));
        }
        if let Some(kind) = filter.kind {
            cond = cond.add(shows::Column::Kind.eq(kind.as_str()));
        }
        if let Some(genre) = filter.genre.as_deref().filter(|g| !g.is_empty()) {
            cond = cond.add(shows::Column::Genres.like(contains_pattern(genre)));
        }
        if let Some(from) = filter.year_from {
            cond = cond.add(shows::Column::ReleaseDate.gte(format!("{from:04}-01-01")));
        }
        if let Some(to) = filter.year_to {
            cond = cond.add(shows::Column::ReleaseDate.lte(format!("{to:04}-12-31")));
        }
        if let Some(min) = filter.min_rating {
            cond = cond.add(shows::Column::Rating.gte(min));
        }
        if let Some(q) = filter.search.as_deref().filter(|q| !q.is_empty()) {
            cond = cond.add(
                Condition::any()
                    .add(shows::Column::Title.like(contains_pattern(q)))
                    .add(shows::Column::Overview.like(contains_pattern(q))),
            );
        }
        cond
    }

    /// Returns one page of shows plus the total number of matches.
    pub async fn list(&self, filter: &ShowFilter) -> anyhow::Result<(Vec<Show>, u64)> {
        let cond = Self::filter_condition(filter);

        let total = Shows::find()
            .filter(cond.clone())
            .count(&self.conn)
            .await?;

        let column = match filter.sort {
            ShowSort::CreatedAt => shows::Column::CreatedAt,
            ShowSort::UpdatedAt => shows::Column::UpdatedAt,
            ShowSort::Title => shows::Column::Title,
            ShowSort::Rating => shows::Column::Rating,
            ShowSort::Views => shows::Column::Views,
            ShowSort::ReleaseDate => shows::Column::ReleaseDate,
        };
        let query = Shows::find().filter(cond);
        let query = match filter.order {
            SortOrder::Asc => query.order_by_asc(column),
            SortOrder::Desc => query.order_by_desc(column),
        };

        let rows = query
            .order_by_desc(shows::Column::Id)
            .offset(filter.offset)
            .limit(filter.limit)
            .all(&self.conn)
            .await?;

        Ok((rows.into_iter().map(Self::map_model).collect(), total))
    }

    /// Every show matching the structured filters, unpaginated. Used as the
    /// candidate set for relevance scoring.
    pub async fn candidates(&self, filter: &ShowFilter) -> anyhow::Result<Vec<Show>> {
        let rows = Shows::find()
            .filter(Self::filter_condition(filter))
            .order_by_desc(shows::Column::Views)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn trending(&self, kind: Option<ShowKind>, limit: u64) -> anyhow::Result<Vec<Show>> {
        let mut query = Shows::find().filter(shows::Column::Status.eq("active"));
        if let Some(kind) = kind {
            query = query.filter(shows::Column::Kind.eq(kind.as_str()));
        }
        let rows = query
            .order_by_desc(shows::Column::Views)
            .order_by_desc(shows::Column::Rating)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn recent(&self, kind: Option<ShowKind>, limit: u64) -> anyhow::Result<Vec<Show>> {
        let mut query = Shows::find().filter(shows::Column::Status.eq("active"));
        if let Some(kind) = kind {
            query = query.filter(shows::Column::Kind.eq(kind.as_str()));
        }
        let rows = query
            .order_by_desc(shows::Column::CreatedAt)
            .order_by_desc(shows::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Case-insensitive match on title or overview, ordered by title.
    pub async fn search(
        &self,
        query: &str,
        kind: Option<ShowKind>,
        limit: u64,
    ) -> anyhow::Result<Vec<Show>> {
        let filter = ShowFilter {
            kind,
            search: Some(query.to_string()),
            ..Default::default()
        };
        let rows = Shows::find()
            .filter(Self::filter_condition(&filter))
            .order_by_asc(shows::Column::Title)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Active shows sharing any of the first three genres of `show`.
    pub async fn related(&self, show: &Show, limit: u64) -> anyhow::Result<Vec<Show>> {
        let mut query = Shows::find()
            .filter(shows::Column::Id.ne(show.id))
            .filter(shows::Column::Status.eq("active"));

        let genres: Vec<&String> = show.genres.iter().take(3).collect();
        if genres.is_empty() {
            query = query.filter(shows::Column::Kind.eq(show.kind.as_str()));
        } else {
            let any_genre = genres.into_iter().fold(Condition::any(), |cond, genre| {
                cond.add(shows::Column::Genres.like(contains_pattern(&format!("\"{genre}\""))))
            });
            query = query.filter(any_genre);
        }

        let rows = query
            .order_by_desc(shows::Column::Views)
            .order_by_desc(shows::Column::Rating)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn update(&self, id: i32, update: &ShowUpdate) -> anyhow::Result<Option<Show>> {
        let Some(model) = Shows::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: shows::ActiveModel = model.into();
        if let Some(title) = &update.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(overview) = &update.overview {
            active.overview = Set(Some(overview.clone()));
        }
        if let Some(poster) = &update.poster_path {
            active.poster_path = Set(Some(poster.clone()));
        }
        if let Some(backdrop) = &update.backdrop_path {
            active.backdrop_path = Set(Some(backdrop.clone()));
        }
        if let Some(date) = &update.release_date {
            active.release_date = Set(Some(date.clone()));
        }
        if let Some(genres) = &update.genres {
            active.genres = Set(serde_json::to_string(genres).ok());
        }
        if let Some(runtime) = update.runtime {
            active.runtime = Set(Some(runtime));
        }
        if let Some(rating) = update.rating {
            active.rating = Set(Some(rating));
        }
        if let Some(status) = &update.status {
            active.status = Set(status.clone());
        }
        active.updated_at = Set(now());

        let model = active.update(&self.conn).await?;
        Ok(Some(Self::map_model(model)))
    }

    /// Marks the show as recently changed so it surfaces in `recent` listings.
    pub async fn touch(&self, id: i32) -> anyhow::Result<()> {
        Shows::update_many()
            .col_expr(shows::Column::UpdatedAt, Expr::value(now()))
            .filter(shows::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn increment_views(&self, id: i32) -> anyhow::Result<()> {
        Shows::update_many()
            .col_expr(
                shows::Column::Views,
                Expr::col(shows::Column::Views).add(1),
            )
            .filter(shows::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Removes the show and everything hanging off it.
    pub async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        let txn = self.conn.begin().await?;

        let season_ids: Vec<i32> = Seasons::find()
            .select_only()
            .column(seasons::Column::Id)
            .filter(seasons::Column::ShowId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        let episode_ids: Vec<i32> = if season_ids.is_empty() {
            Vec::new()
        } else {
            Episodes::find()
                .select_only()
                .column(episodes::Column::Id)
                .filter(episodes::Column::SeasonId.is_in(season_ids.clone()))
                .into_tuple()
                .all(&txn)
                .await?
        };

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
        if !season_ids.is_empty() {
            Episodes::delete_many()
                .filter(episodes::Column::SeasonId.is_in(season_ids))
                .exec(&txn)
                .await?;
        }
        Seasons::delete_many()
            .filter(seasons::Column::ShowId.eq(id))
            .exec(&txn)
            .await?;
        Comments::delete_many()
            .filter(comments::Column::VideoId.eq(id))
            .exec(&txn)
            .await?;
        Watchlist::delete_many()
            .filter(watchlist::Column::VideoId.eq(id))
            .exec(&txn)
            .await?;
        WatchHistory::delete_many()
            .filter(watch_history::Column::VideoId.eq(id))
            .exec(&txn)
            .await?;

        let result = Shows::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        let removed = result.rows_affected > 0;
        if removed {
            info!(show_id = id, "Show removed");
        }
        Ok(removed)
    }

    pub async fn count(&self, kind: Option<ShowKind>) -> anyhow::Result<u64> {
        let mut query = Shows::find();
        if let Some(kind) = kind {
            query = query.filter(shows::Column::Kind.eq(kind.as_str()));
        }
        Ok(query.count(&self.conn).await?)
    }

    pub async fn total_views(&self) -> anyhow::Result<i64> {
        let total: Option<Option<i64>> = Shows::find()
            .select_only()
            .column_as(shows::Column::Views.sum(), "total")
            .into_tuple()
            .one(&self.conn)
            .await?;
        Ok(total.flatten().unwrap_or(0))
    }
}
