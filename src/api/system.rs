use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState, DependencyStatus, GenreDto, HealthResponse, ShowDto,
    TrendingResponse,
};
use crate::api::error::internal_detail;
use crate::api::validation::{parse_kind, validate_limit};
use crate::constants::{GENRES, limits, time_window};
use crate::models::CatalogStats;

/// GET / and GET /api/health
///
/// Always 200; a failing dependency only downgrades `status` to `degraded`.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    let mut dependencies = Vec::with_capacity(4);

    let database = match state.store().ping().await {
        Ok(()) => DependencyStatus {
            name: "database",
            status: "up",
            detail: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            DependencyStatus {
                name: "database",
                status: "down",
                detail: internal_detail(&e),
            }
        }
    };
    let healthy = database.status == "up";
    dependencies.push(database);
    dependencies.push(configured("tmdb", state.tmdb().is_configured()));
    dependencies.push(configured("telegram", state.telegram().is_configured()));
    dependencies.push(configured("filemoon", state.filemoon().is_configured()));

    let service = state.config().read().await.general.app_name.clone();
    Json(ApiResponse::success(HealthResponse {
        service,
        version: env!("CARGO_PKG_VERSION"),
        status: if healthy { "healthy" } else { "degraded" },
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        dependencies,
    }))
}

const fn configured(name: &'static str, ok: bool) -> DependencyStatus {
    DependencyStatus {
        name,
        status: if ok { "configured" } else { "not_configured" },
        detail: None,
    }
}

/// GET /genres
pub async fn get_genres() -> Json<ApiResponse<Vec<GenreDto>>> {
    Json(ApiResponse::success(genres()))
}

fn genres() -> Vec<GenreDto> {
    GENRES
        .iter()
        .map(|&(id, name)| GenreDto { id, name })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub time_window: Option<String>,
    pub limit: Option<u64>,
}

/// GET /trending
///
/// Ranked by cumulative views. `time_window` is validated and echoed back.
pub async fn get_trending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<ApiResponse<TrendingResponse>>, ApiError> {
    let kind = parse_kind(query.kind.as_deref())?;
    let window = match query.time_window.as_deref().map(str::trim) {
        None | Some("") => time_window::WEEK,
        Some(w) if w == time_window::DAY => time_window::DAY,
        Some(w) if w == time_window::WEEK => time_window::WEEK,
        Some(other) => {
            return Err(ApiError::validation(format!(
                "Invalid time_window: {other}. Expected day or week"
            )));
        }
    };
    let limit = validate_limit(
        query.limit,
        limits::TRENDING_DEFAULT,
        1,
        limits::TRENDING_MAX,
    )?;

    let shows = state.store().trending_shows(kind, limit).await?;
    Ok(Json(ApiResponse::success(TrendingResponse {
        items: ShowDto::list(shows, &state.image_base().await),
        time_window: window.to_string(),
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<u64>,
}

/// GET /recent
pub async fn get_recent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<ApiResponse<Vec<ShowDto>>>, ApiError> {
    let kind = parse_kind(query.kind.as_deref())?;
    let limit = validate_limit(query.limit, limits::RECENT_DEFAULT, 1, limits::TRENDING_MAX)?;
    let shows = state.store().recent_shows(kind, limit).await?;
    Ok(Json(ApiResponse::success(ShowDto::list(
        shows,
        &state.image_base().await,
    ))))
}

/// GET /admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<CatalogStats>>, ApiError> {
    let stats = state.store().catalog_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_list() {
        let genres = genres();
        assert_eq!(genres.len(), 19);
        assert!(genres.iter().any(|g| g.id == 35 && g.name == "Comédie"));
        assert!(genres.iter().any(|g| g.id == 878 && g.name == "Science-Fiction"));
    }
}
