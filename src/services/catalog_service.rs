//! Domain service for the show catalog.
//!
//! Assembles the nested views the player needs (show, seasons, episodes,
//! playable sources) and owns the write paths that must stay consistent:
//! TMDB imports, numbered seasons and episodes, source validation.

use thiserror::Error;

use crate::api::types::{EpisodeDto, FolderDetailsDto, ShowDetailsDto, ShowEpisodesDto, SourceDto};
use crate::models::{
    Episode, NewEpisode, NewSeason, NewVideoSource, Season, Show, ShowKind, VideoSource,
};
use crate::services::search::SearchHit;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Show {0} not found")]
    ShowNotFound(i32),

    #[error("Saison non trouvée")]
    SeasonNotFound,

    #[error("Episode {0} not found")]
    EpisodeNotFound(i32),

    #[error("Aucune source trouvée pour cet épisode")]
    NoSources,

    #[error("{0}")]
    Duplicate(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("TMDB error: {0}")]
    Tmdb(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// A freshly imported show together with the season created for it.
#[derive(Debug, Clone)]
pub struct ImportedShow {
    pub show: Show,
    pub season: Season,
}

#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    /// Show with image URLs and, for series, its seasons and episode counts.
    async fn show_details(&self, id: i32) -> Result<ShowDetailsDto, CatalogError>;

    /// Movie sources, one season's episodes, or every season with episodes.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::SeasonNotFound`] when `season` names a missing
    /// season.
    async fn show_episodes(
        &self,
        id: i32,
        season: Option<i32>,
    ) -> Result<ShowEpisodesDto, CatalogError>;

    async fn episode_details(&self, id: i32) -> Result<EpisodeDto, CatalogError>;

    /// Active sources formatted for the player.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NoSources`] when the episode has none.
    async fn episode_sources(&self, id: i32) -> Result<Vec<SourceDto>, CatalogError>;

    async fn folder_details(&self, id: i32) -> Result<FolderDetailsDto, CatalogError>;

    async fn search(
        &self,
        query: &str,
        kind: Option<ShowKind>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, CatalogError>;

    async fn suggest(&self, partial: &str, limit: usize) -> Result<Vec<String>, CatalogError>;

    /// Imports a TMDB title and creates its first season: season 0 "Film" for
    /// a movie, season 1 for a series.
    ///
    /// # Errors
    ///
    /// - Returns [`CatalogError::Duplicate`] when the TMDB id is already in the catalog
    /// - Returns [`CatalogError::Tmdb`] when TMDB is unreachable or does not know the id
    async fn import_from_tmdb(
        &self,
        tmdb_id: i32,
        kind: ShowKind,
    ) -> Result<ImportedShow, CatalogError>;

    /// Re-fetches TMDB metadata for an existing show.
    async fn refresh_from_tmdb(&self, show_id: i32) -> Result<Show, CatalogError>;

    async fn create_season(
        &self,
        show_id: i32,
        season: &NewSeason,
    ) -> Result<Season, CatalogError>;

    async fn create_episode(
        &self,
        season_id: i32,
        episode: &NewEpisode,
    ) -> Result<Episode, CatalogError>;

    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for a Filemoon source without a code
    /// or a Telegram source without a file id.
    async fn create_source(
        &self,
        episode_id: i32,
        source: &NewVideoSource,
    ) -> Result<VideoSource, CatalogError>;
}
