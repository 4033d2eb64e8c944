//! Catalog management. Every route here sits behind `require_admin`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, ShowDto};
use crate::api::validation::{clamp_limit, validate_id, validate_rating, validate_title};
use crate::clients::filemoon::FileSummary;
use crate::constants::limits;
use crate::models::{
    Episode, EpisodeUpdate, NewEpisode, NewSeason, NewVideoSource, Season, SeasonUpdate,
    ServerName, ShowKind, ShowUpdate, SourceUpdate, UploadStatus, UploadTask, VideoSource,
};
use crate::services::UploadError;

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NotFound(id) => Self::not_found("Upload task", id),
            UploadError::InvalidState { .. } => Self::Conflict(err.to_string()),
            UploadError::NotConfigured(what) => Self::ExternalApiError {
                service: what.to_string(),
                message: err.to_string(),
            },
            UploadError::Telegram(msg) => Self::telegram_error(msg),
            UploadError::Filemoon(message) => Self::ExternalApiError {
                service: "Filemoon".to_string(),
                message,
            },
            UploadError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateShowRequest {
    pub tmdb_id: i32,
    #[serde(alias = "type")]
    pub kind: ShowKind,
}

#[derive(Debug, Serialize)]
pub struct ImportedShowDto {
    pub show: ShowDto,
    pub season: Season,
}

/// POST /admin/shows
pub async fn create_show(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateShowRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ImportedShowDto>>), ApiError> {
    validate_id("TMDB", payload.tmdb_id)?;
    let imported = state
        .catalog()
        .import_from_tmdb(payload.tmdb_id, payload.kind)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ImportedShowDto {
            show: ShowDto::new(imported.show, &state.image_base().await),
            season: imported.season,
        })),
    ))
}

/// PUT /admin/shows/{id}
pub async fn update_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(mut update): Json<ShowUpdate>,
) -> Result<Json<ApiResponse<ShowDto>>, ApiError> {
    validate_id("show", id)?;
    if let Some(title) = update.title.as_deref() {
        update.title = Some(validate_title(title)?.to_string());
    }
    if let Some(rating) = update.rating {
        validate_rating(rating)?;
    }
    if let Some(status) = update.status.as_deref()
        && !matches!(status, "active" | "inactive")
    {
        return Err(ApiError::validation(format!(
            "Invalid status: {status}. Must be 'active' or 'inactive'"
        )));
    }

    let show = state
        .store()
        .update_show(id, &update)
        .await?
        .ok_or_else(|| ApiError::show_not_found(id))?;
    Ok(Json(ApiResponse::success(ShowDto::new(
        show,
        &state.image_base().await,
    ))))
}

/// DELETE /admin/shows/{id}
///
/// Seasons, episodes and sources go with it.
pub async fn delete_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_id("show", id)?;
    if !state.store().delete_show(id).await? {
        return Err(ApiError::show_not_found(id));
    }
    tracing::info!(show_id = id, "Show deleted");
    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Show {id} deleted"
    )))))
}

/// POST /admin/shows/{id}/seasons
pub async fn create_season(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<i32>,
    Json(payload): Json<NewSeason>,
) -> Result<(StatusCode, Json<ApiResponse<Season>>), ApiError> {
    validate_id("show", show_id)?;
    let season = state.catalog().create_season(show_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(season))))
}

/// PUT /admin/seasons/{id}
pub async fn update_season(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(update): Json<SeasonUpdate>,
) -> Result<Json<ApiResponse<Season>>, ApiError> {
    validate_id("season", id)?;
    let season = state
        .store()
        .update_season(id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Season", id))?;
    Ok(Json(ApiResponse::success(season)))
}

/// DELETE /admin/seasons/{id}
pub async fn delete_season(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_id("season", id)?;
    if !state.store().delete_season(id).await? {
        return Err(ApiError::not_found("Season", id));
    }
    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Season {id} deleted"
    )))))
}

/// POST /admin/seasons/{id}/episodes
pub async fn create_episode(
    State(state): State<Arc<AppState>>,
    Path(season_id): Path<i32>,
    Json(payload): Json<NewEpisode>,
) -> Result<(StatusCode, Json<ApiResponse<Episode>>), ApiError> {
    validate_id("season", season_id)?;
    let episode = state.catalog().create_episode(season_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(episode))))
}

/// PUT /admin/episodes/{id}
pub async fn update_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(update): Json<EpisodeUpdate>,
) -> Result<Json<ApiResponse<Episode>>, ApiError> {
    validate_id("episode", id)?;
    let episode = state
        .store()
        .update_episode(id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Episode", id))?;
    Ok(Json(ApiResponse::success(episode)))
}

/// DELETE /admin/episodes/{id}
pub async fn delete_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_id("episode", id)?;
    if !state.store().delete_episode(id).await? {
        return Err(ApiError::not_found("Episode", id));
    }
    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Episode {id} deleted"
    )))))
}

/// POST /admin/episodes/{id}/sources
pub async fn create_source(
    State(state): State<Arc<AppState>>,
    Path(episode_id): Path<i32>,
    Json(payload): Json<NewVideoSource>,
) -> Result<(StatusCode, Json<ApiResponse<VideoSource>>), ApiError> {
    validate_id("episode", episode_id)?;
    let source = state.catalog().create_source(episode_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(source))))
}

/// PUT /admin/sources/{id}
pub async fn update_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(update): Json<SourceUpdate>,
) -> Result<Json<ApiResponse<VideoSource>>, ApiError> {
    validate_id("source", id)?;
    let source = state
        .store()
        .update_source(id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Source", id))?;
    Ok(Json(ApiResponse::success(source)))
}

/// DELETE /admin/sources/{id}
pub async fn delete_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_id("source", id)?;
    let source = state
        .store()
        .get_source(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Source", id))?;
    if !state.store().delete_source(id).await? {
        return Err(ApiError::not_found("Source", id));
    }

    // The hosted copy goes too; a failure leaves an orphan on Filemoon only.
    if source.server_name == ServerName::Filemoon
        && let Some(code) = source.filemoon_code.as_deref()
        && state.filemoon().is_configured()
        && let Err(e) = state.filemoon().delete(code).await
    {
        tracing::warn!(source_id = id, file_code = code, error = %e, "Filemoon delete failed");
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Source {id} deleted"
    )))))
}

#[derive(Debug, Default, Deserialize)]
pub struct FilemoonFilesQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /admin/filemoon/files
pub async fn list_filemoon_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilemoonFilesQuery>,
) -> Result<Json<ApiResponse<Vec<FileSummary>>>, ApiError> {
    if !state.filemoon().is_configured() {
        return Err(UploadError::NotConfigured("Filemoon API key").into());
    }
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);
    let files = state
        .filemoon()
        .list(page, per_page)
        .await
        .map_err(|e| UploadError::Filemoon(e.to_string()))?;
    Ok(Json(ApiResponse::success(files)))
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadsQuery {
    pub status: Option<String>,
    pub limit: Option<u64>,
}

/// GET /admin/uploads
pub async fn list_uploads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadsQuery>,
) -> Result<Json<ApiResponse<Vec<UploadTask>>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("" | "all") => None,
        Some(raw) => Some(raw.parse::<UploadStatus>().map_err(ApiError::validation)?),
    };
    let limit = clamp_limit(query.limit, limits::UPLOADS_DEFAULT, 200);
    let tasks = state.store().list_upload_tasks(status, limit).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

/// POST /admin/uploads/{id}/retry
///
/// Runs the task inline and returns its final state, failed or not. Tasks
/// already completed or in flight answer 409.
pub async fn retry_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UploadTask>>, ApiError> {
    validate_id("upload task", id)?;
    let uploads = state.uploads();
    match uploads.retry(id).await {
        Ok(task) => Ok(Json(ApiResponse::success(task))),
        Err(e @ (UploadError::NotFound(_) | UploadError::InvalidState { .. })) => Err(e.into()),
        Err(e) => {
            tracing::warn!(task_id = id, error = %e, "Upload retry failed");
            let task = state
                .store()
                .get_upload_task(id)
                .await?
                .ok_or(UploadError::NotFound(id))?;
            Ok(Json(ApiResponse::success(task)))
        }
    }
}
