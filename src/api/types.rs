use serde::{Deserialize, Serialize};

use crate::clients::filemoon;
use crate::clients::tmdb::image_url;
use crate::models::{Episode, Season, ServerName, Show, VideoSource};
use crate::services::search::SearchHit;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowDto {
    #[serde(flatten)]
    pub show: Show,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
}

impl ShowDto {
    #[must_use]
    pub fn new(show: Show, image_base: &str) -> Self {
        Self {
            poster_url: image_url(image_base, show.poster_path.as_deref(), "w500"),
            backdrop_url: image_url(image_base, show.backdrop_path.as_deref(), "original"),
            show,
        }
    }

    #[must_use]
    pub fn list(shows: Vec<Show>, image_base: &str) -> Vec<Self> {
        shows.into_iter().map(|s| Self::new(s, image_base)).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonSummaryDto {
    #[serde(flatten)]
    pub season: Season,
    pub episode_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowDetailsDto {
    #[serde(flatten)]
    pub show: ShowDto,
    pub seasons: Vec<SeasonSummaryDto>,
}

/// A source as the player consumes it: Filemoon sources embed, Telegram
/// sources go through the streaming proxy.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDto {
    pub id: i32,
    pub server: ServerName,
    pub quality: String,
    pub language: String,
    pub is_active: bool,
    pub embed_url: Option<String>,
    pub direct_link: Option<String>,
}

impl SourceDto {
    #[must_use]
    pub fn new(source: VideoSource, player_base: &str) -> Self {
        let (embed_url, direct_link) = match source.server_name {
            ServerName::Filemoon => (
                source
                    .filemoon_code
                    .as_deref()
                    .map(|code| filemoon::player_url(player_base, code)),
                None,
            ),
            ServerName::Telegram => (
                None,
                source
                    .file_id
                    .as_deref()
                    .map(|id| format!("/api/stream/telegram/{id}")),
            ),
        };

        Self {
            id: source.id,
            server: source.server_name,
            quality: source.quality,
            language: source.language,
            is_active: source.is_active,
            embed_url,
            direct_link,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeDto {
    #[serde(flatten)]
    pub episode: Episode,
    pub sources: Vec<SourceDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonEpisodesDto {
    pub season_id: i32,
    pub season_number: i32,
    pub name: String,
    pub poster: Option<String>,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ShowEpisodesDto {
    #[serde(rename = "movie")]
    Movie { sources: Vec<SourceDto> },
    #[serde(rename = "series")]
    Season {
        season: i32,
        season_id: i32,
        episodes: Vec<Episode>,
    },
    #[serde(rename = "series")]
    Series { seasons: Vec<SeasonEpisodesDto> },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    #[must_use]
    pub const fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShowListFilters {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShowPage {
    pub items: Vec<ShowDto>,
    pub pagination: Pagination,
    pub filters: ShowListFilters,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct TrendingResponse {
    pub items: Vec<ShowDto>,
    pub time_window: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenreDto {
    pub id: i32,
    pub name: &'static str,
}

/// Legacy folder view of a show.
#[derive(Debug, Serialize)]
pub struct FolderDto {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub poster_url: Option<String>,
    pub created_at: String,
}

impl From<&ShowDto> for FolderDto {
    fn from(dto: &ShowDto) -> Self {
        Self {
            id: dto.show.id,
            name: dto.show.title.clone(),
            kind: dto.show.kind.as_str().to_string(),
            poster_url: dto.poster_url.clone(),
            created_at: dto.show.created_at.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubfolderDto {
    pub id: i32,
    pub name: String,
    pub season_number: i32,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Serialize)]
pub struct FolderDetailsDto {
    pub folder: ShowDto,
    pub subfolders: Vec<SubfolderDto>,
}

#[derive(Debug, Serialize)]
pub struct CommentPage<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct DependencyStatus {
    pub name: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: String,
    pub version: &'static str,
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub dependencies: Vec<DependencyStatus>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoIdRequest {
    pub video_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_math() {
        let p = Pagination::new(1, 20, 45);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(!p.has_prev);

        let last = Pagination::new(3, 20, 45);
        assert!(!last.has_next);
        assert!(last.has_prev);

        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
    }

    #[test]
    fn test_source_links() {
        let source = VideoSource {
            id: 1,
            episode_id: 1,
            server_name: ServerName::Telegram,
            link: String::new(),
            file_id: Some("BAAC_x-1".to_string()),
            filemoon_code: None,
            quality: "HD".to_string(),
            language: "FR".to_string(),
            is_active: true,
            file_size: None,
            duration: None,
            mime_type: None,
            created_at: String::new(),
        };
        let dto = SourceDto::new(source.clone(), "https://filemoon.sx/e/");
        assert_eq!(dto.direct_link.as_deref(), Some("/api/stream/telegram/BAAC_x-1"));
        assert!(dto.embed_url.is_none());

        let filemoon = VideoSource {
            server_name: ServerName::Filemoon,
            filemoon_code: Some("abc123".to_string()),
            file_id: None,
            ..source
        };
        let dto = SourceDto::new(filemoon, "https://filemoon.sx/e/");
        assert_eq!(dto.embed_url.as_deref(), Some("https://filemoon.sx/e/abc123"));
    }
}
