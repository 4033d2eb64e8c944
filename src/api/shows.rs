use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState, Pagination, SearchResponse, ShowDetailsDto, ShowDto,
    ShowEpisodesDto, ShowListFilters, ShowPage,
};
use crate::api::validation::{
    clamp_limit, normalize_page, page_offset, parse_kind, validate_id, validate_limit, validate_search_query,
};
use crate::models::{ShowFilter, ShowSort, SortOrder};
use crate::services::CatalogError;

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ShowNotFound(id) => Self::show_not_found(id),
            CatalogError::EpisodeNotFound(id) => Self::not_found("Episode", id),
            CatalogError::SeasonNotFound | CatalogError::NoSources => {
                Self::NotFound(err.to_string())
            }
            CatalogError::Duplicate(msg) => Self::Conflict(msg),
            CatalogError::Validation(msg) => Self::validation(msg),
            CatalogError::Tmdb(msg) => Self::tmdb_error(msg),
            CatalogError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ShowListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub search: Option<String>,
    #[serde(default)]
    pub trending: bool,
}

/// GET /shows
///
/// Unknown `sort_by` values fall back to `created_at`; `trending=true`
/// overrides sorting with views descending.
pub async fn list_shows(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ShowListQuery>,
) -> Result<Json<ApiResponse<ShowPage>>, ApiError> {
    let (page, limit) = normalize_page(query.page, query.limit);
    let kind = parse_kind(query.kind.as_deref())?;
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);
    let genre = query
        .genre
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(ToString::to_string);

    let (sort, order) = if query.trending {
        (ShowSort::Views, SortOrder::Desc)
    } else {
        (
            query
                .sort_by
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            SortOrder::parse_lenient(query.order.as_deref()),
        )
    };

    let filter = ShowFilter {
        kind,
        genre: genre.clone(),
        year_from: query.year,
        year_to: query.year,
        search: search.clone(),
        sort,
        order,
        offset: page_offset(page, limit),
        limit,
        ..ShowFilter::default()
    };

    let (shows, total) = state.store().list_shows(&filter).await?;
    let image_base = state.image_base().await;

    Ok(Json(ApiResponse::success(ShowPage {
        items: ShowDto::list(shows, &image_base),
        pagination: Pagination::new(page, limit, total),
        filters: ShowListFilters {
            kind: kind.map(|k| k.as_str().to_string()),
            genre,
            year: query.year,
            search,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<u64>,
}

/// GET /shows/search
///
/// Accepts the advanced syntax (`genre:drame year:>2010 "phrase"`).
pub async fn search_shows(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let q = validate_search_query(&query.q, 2, 100)?;
    let kind = parse_kind(query.kind.as_deref())?;
    let limit = validate_limit(query.limit, 20, 1, 50)?;

    let results = state
        .catalog()
        .search(q, kind, usize::try_from(limit).unwrap_or(50))
        .await?;

    Ok(Json(ApiResponse::success(SearchResponse {
        query: q.to_string(),
        total: results.len(),
        results,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u64>,
}

/// GET /shows/suggest
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let limit = clamp_limit(query.limit, 10, 20);
    let titles = state
        .catalog()
        .suggest(query.q.trim(), usize::try_from(limit).unwrap_or(10))
        .await?;
    Ok(Json(ApiResponse::success(titles)))
}

/// GET /shows/{id}
///
/// The view counter is bumped in the background; the response never waits
/// for it.
pub async fn get_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ShowDetailsDto>>, ApiError> {
    validate_id("show", id)?;
    let details = state.catalog().show_details(id).await?;
    spawn_view_increment(&state, id);
    Ok(Json(ApiResponse::success(details)))
}

pub fn spawn_view_increment(state: &AppState, id: i32) {
    let store = state.store().clone();
    tokio::spawn(async move {
        if let Err(e) = store.increment_show_views(id).await {
            tracing::warn!(show_id = id, error = %e, "Failed to increment views");
        }
    });
}

#[derive(Debug, Deserialize)]
pub struct EpisodesQuery {
    pub season: Option<i32>,
}

/// GET /shows/{id}/episodes
pub async fn get_show_episodes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<EpisodesQuery>,
) -> Result<Json<ApiResponse<ShowEpisodesDto>>, ApiError> {
    validate_id("show", id)?;
    if let Some(season) = query.season
        && season < 0
    {
        return Err(ApiError::validation(format!(
            "Invalid season number: {season}"
        )));
    }

    let episodes = state.catalog().show_episodes(id, query.season).await?;
    Ok(Json(ApiResponse::success(episodes)))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

/// GET /shows/{id}/related
pub async fn get_related(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<ShowDto>>>, ApiError> {
    validate_id("show", id)?;
    let limit = validate_limit(query.limit, 6, 1, 20)?;

    let show = state
        .store()
        .get_show(id)
        .await?
        .ok_or_else(|| ApiError::show_not_found(id))?;
    let related = state.store().related_shows(&show, limit).await?;

    Ok(Json(ApiResponse::success(ShowDto::list(
        related,
        &state.image_base().await,
    ))))
}
