use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, MessageResponse, VideoIdRequest};
use crate::api::validation::{clamp_limit, validate_id};
use crate::models::{HistoryEntry, ProgressUpdate, WatchlistEntry};
use crate::services::EngagementError;

impl From<EngagementError> for ApiError {
    fn from(err: EngagementError) -> Self {
        match err {
            EngagementError::ShowNotFound(id) => Self::show_not_found(id),
            EngagementError::EpisodeNotFound(id) => Self::not_found("Episode", id),
            EngagementError::CommentNotFound(id) => Self::not_found("Comment", id),
            EngagementError::Forbidden => Self::forbidden(err.to_string()),
            EngagementError::Validation(msg) => Self::validation(msg),
            EngagementError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WatchlistChange {
    pub video_id: i32,
    pub added: bool,
}

/// GET /user/watchlist
pub async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<WatchlistEntry>>>, ApiError> {
    let entries = state.engagement().watchlist(user.id).await?;
    Ok(Json(ApiResponse::success(entries)))
}

/// POST /user/watchlist/add
///
/// Adding a show twice is not an error; `added` reports whether a row was
/// created.
pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<VideoIdRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WatchlistChange>>), ApiError> {
    validate_id("video", payload.video_id)?;
    let added = state
        .engagement()
        .add_to_watchlist(user.id, payload.video_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(WatchlistChange {
            video_id: payload.video_id,
            added,
        })),
    ))
}

/// DELETE /user/watchlist/{video_id}
pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(video_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let removed = state
        .engagement()
        .remove_from_watchlist(user.id, video_id)
        .await?;
    if !removed {
        return Err(ApiError::NotFound(format!(
            "Show {video_id} is not in the watchlist"
        )));
    }
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Retiré de la liste",
    ))))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub completed: Option<bool>,
    pub limit: Option<u64>,
}

/// GET /user/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryEntry>>>, ApiError> {
    let limit = clamp_limit(query.limit, 50, 100);
    let entries = state
        .engagement()
        .history(user.id, query.completed, limit)
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

/// DELETE /user/history
pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let removed = state.engagement().clear_history(user.id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "{removed} history entries removed"
    )))))
}

/// POST /user/history/update
pub async fn update_history(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ProgressUpdate>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_id("video", payload.video_id)?;
    state.engagement().update_progress(user.id, &payload).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Progression enregistrée",
    ))))
}
