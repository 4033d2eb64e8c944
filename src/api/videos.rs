//! Routes kept for the older frontend, which still talks about videos and
//! folders. Everything here is a thin view over shows.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::shows::spawn_view_increment;
use super::{
    ApiError, ApiResponse, AppState, FolderDetailsDto, FolderDto, ShowDetailsDto, ShowDto,
};
use crate::api::validation::{clamp_limit, validate_id, validate_rating};
use crate::models::{ShowFilter, ShowSort, SortOrder};

#[derive(Debug, Deserialize)]
pub struct RecentVideosQuery {
    pub limit: Option<u64>,
}

/// GET /videos/recent
pub async fn recent_videos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentVideosQuery>,
) -> Result<Json<ApiResponse<Vec<ShowDto>>>, ApiError> {
    let limit = clamp_limit(query.limit, 12, 100);
    let shows = state.store().recent_shows(None, limit).await?;
    Ok(Json(ApiResponse::success(ShowDto::list(
        shows,
        &state.image_base().await,
    ))))
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoSearchQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub limit: Option<u64>,
}

/// GET /videos/search
///
/// Plain substring filter; `year` is exact and `rating` is a minimum.
pub async fn search_videos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VideoSearchQuery>,
) -> Result<Json<ApiResponse<Vec<ShowDto>>>, ApiError> {
    if let Some(rating) = query.rating {
        validate_rating(rating)?;
    }

    let filter = ShowFilter {
        search: non_blank(query.q),
        genre: non_blank(query.genre),
        year_from: query.year,
        year_to: query.year,
        min_rating: query.rating,
        sort: ShowSort::Views,
        order: SortOrder::Desc,
        limit: clamp_limit(query.limit, 20, 100),
        ..ShowFilter::default()
    };

    let (shows, _) = state.store().list_shows(&filter).await?;
    Ok(Json(ApiResponse::success(ShowDto::list(
        shows,
        &state.image_base().await,
    ))))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// GET /videos/{id}
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ShowDetailsDto>>, ApiError> {
    validate_id("video", id)?;
    let details = state.catalog().show_details(id).await?;
    spawn_view_increment(&state, id);
    Ok(Json(ApiResponse::success(details)))
}

/// GET /folders
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<FolderDto>>>, ApiError> {
    let shows = state.store().show_candidates(&ShowFilter::default()).await?;
    let image_base = state.image_base().await;
    let folders = ShowDto::list(shows, &image_base)
        .iter()
        .map(FolderDto::from)
        .collect();
    Ok(Json(ApiResponse::success(folders)))
}

/// GET /folders/{id}
pub async fn get_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<FolderDetailsDto>>, ApiError> {
    validate_id("folder", id)?;
    let folder = state.catalog().folder_details(id).await?;
    Ok(Json(ApiResponse::success(folder)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank_trims() {
        assert_eq!(non_blank(Some("  drame ".to_string())).as_deref(), Some("drame"));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
