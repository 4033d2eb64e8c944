use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, EpisodeDto, SourceDto};
use crate::api::validation::validate_id;

#[derive(Debug, Serialize)]
pub struct EpisodeSourcesResponse {
    pub episode_id: i32,
    pub sources: Vec<SourceDto>,
}

/// GET /episodes/{id}
pub async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EpisodeDto>>, ApiError> {
    validate_id("episode", id)?;
    let episode = state.catalog().episode_details(id).await?;
    Ok(Json(ApiResponse::success(episode)))
}

/// GET /episodes/{id}/sources
pub async fn get_sources(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EpisodeSourcesResponse>>, ApiError> {
    validate_id("episode", id)?;
    let sources = state.catalog().episode_sources(id).await?;
    Ok(Json(ApiResponse::success(EpisodeSourcesResponse {
        episode_id: id,
        sources,
    })))
}
