//! TMDB proxy. Keeps the API key server-side.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, ShowDto};
use crate::api::validation::{validate_id, validate_search_query};
use crate::clients::tmdb::{TmdbDetails, TmdbPopular, TmdbSearchResult};
use crate::models::ShowKind;

#[derive(Debug, Deserialize)]
pub struct TmdbQuery {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// `movie` unless `tv`/`series` is asked for.
fn media_kind(raw: Option<&str>) -> Result<ShowKind, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(ShowKind::Movie),
        Some(value) => value.parse().map_err(ApiError::validation),
    }
}

fn require_configured(state: &AppState) -> Result<(), ApiError> {
    if state.tmdb().is_configured() {
        Ok(())
    } else {
        Err(ApiError::tmdb_error("TMDB API key is not configured"))
    }
}

/// GET /tmdb/search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TmdbQuery>,
) -> Result<Json<ApiResponse<Vec<TmdbSearchResult>>>, ApiError> {
    let q = validate_search_query(&query.q, 2, 100)?;
    let kind = media_kind(query.kind.as_deref())?;
    require_configured(&state)?;

    let results = state
        .tmdb()
        .search(q, kind)
        .await
        .map_err(|e| ApiError::tmdb_error(e.to_string()))?;
    Ok(Json(ApiResponse::success(results)))
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// GET /tmdb/popular
pub async fn popular(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<ApiResponse<Vec<TmdbPopular>>>, ApiError> {
    let kind = media_kind(query.kind.as_deref())?;
    require_configured(&state)?;

    let titles = state
        .tmdb()
        .popular(kind)
        .await
        .map_err(|e| ApiError::tmdb_error(e.to_string()))?;
    Ok(Json(ApiResponse::success(titles)))
}

/// GET /tmdb/{tmdb_id}
pub async fn details(
    State(state): State<Arc<AppState>>,
    Path(tmdb_id): Path<i32>,
    Query(query): Query<TmdbQuery>,
) -> Result<Json<ApiResponse<TmdbDetails>>, ApiError> {
    validate_id("TMDB", tmdb_id)?;
    let kind = media_kind(query.kind.as_deref())?;
    require_configured(&state)?;

    let details = state
        .tmdb()
        .details(tmdb_id, kind)
        .await
        .map_err(|e| ApiError::tmdb_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("TMDB title", tmdb_id))?;
    Ok(Json(ApiResponse::success(details)))
}

/// POST /tmdb/enrich/{show_id} (admin)
pub async fn enrich(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<i32>,
) -> Result<Json<ApiResponse<ShowDto>>, ApiError> {
    validate_id("show", show_id)?;
    require_configured(&state)?;

    let show = state.catalog().refresh_from_tmdb(show_id).await?;
    Ok(Json(ApiResponse::success(ShowDto::new(
        show,
        &state.image_base().await,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_defaults_to_movie() {
        assert_eq!(media_kind(None).unwrap(), ShowKind::Movie);
        assert_eq!(media_kind(Some("tv")).unwrap(), ShowKind::Series);
        assert!(media_kind(Some("anime")).is_err());
    }
}
