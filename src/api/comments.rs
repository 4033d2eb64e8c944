use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, CommentPage, MessageResponse};
use crate::api::validation::{clamp_limit, validate_id};
use crate::models::Comment;

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PostCommentRequest {
    pub video_id: i32,
    #[serde(default)]
    pub text: String,
}

/// GET /comments/{video_id} (public)
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i32>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<ApiResponse<CommentPage<Comment>>>, ApiError> {
    validate_id("video", video_id)?;
    let limit = clamp_limit(query.limit, 50, 100);
    let (items, total) = state.engagement().comments(video_id, limit).await?;
    Ok(Json(ApiResponse::success(CommentPage { items, total })))
}

/// POST /comments/post
pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<PostCommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), ApiError> {
    validate_id("video", payload.video_id)?;
    let comment = state
        .engagement()
        .post_comment(&user, payload.video_id, &payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}

/// DELETE /comments/{id}
///
/// Only the author or an admin may delete.
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.engagement().delete_comment(&user, id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Commentaire supprimé",
    ))))
}
