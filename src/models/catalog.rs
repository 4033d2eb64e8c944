use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowKind {
    Movie,
    Series,
}

impl ShowKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }

    /// TMDB names series `tv`.
    #[must_use]
    pub const fn tmdb_media_type(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "tv",
        }
    }
}

impl fmt::Display for ShowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "film" => Ok(Self::Movie),
            "series" | "tv" | "serie" => Ok(Self::Series),
            other => Err(format!(
                "Invalid type: {other}. Must be 'movie' or 'series'"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerName {
    Filemoon,
    Telegram,
}

impl ServerName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filemoon => "filemoon",
            Self::Telegram => "telegram",
        }
    }
}

impl FromStr for ServerName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "filemoon" => Ok(Self::Filemoon),
            "telegram" => Ok(Self::Telegram),
            other => Err(format!("Invalid server: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Show {
    pub id: i32,
    pub tmdb_id: i32,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ShowKind,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub genres: Vec<String>,
    pub runtime: Option<i32>,
    pub rating: Option<f64>,
    pub language: String,
    pub views: i64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Show {
    /// Year component of `release_date` (`YYYY-MM-DD`).
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewShow {
    pub tmdb_id: i32,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ShowKind,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub runtime: Option<i32>,
    pub rating: Option<f64>,
    pub language: Option<String>,
}

/// Fields an admin may change on an existing show.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowUpdate {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub genres: Option<Vec<String>>,
    pub runtime: Option<i32>,
    pub rating: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Rating,
    Views,
    ReleaseDate,
}

impl FromStr for ShowSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "title" => Ok(Self::Title),
            "rating" => Ok(Self::Rating),
            "views" => Ok(Self::Views),
            "release_date" => Ok(Self::ReleaseDate),
            other => Err(format!("Invalid sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Anything other than `asc` sorts descending.
    #[must_use]
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::to_lowercase).as_deref() {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShowFilter {
    pub kind: Option<ShowKind>,
    pub genre: Option<String>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub min_rating: Option<f64>,
    pub search: Option<String>,
    /// Listings only expose `active` shows unless set.
    pub include_inactive: bool,
    pub sort: ShowSort,
    pub order: SortOrder,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Season {
    pub id: i32,
    pub show_id: i32,
    pub season_number: i32,
    pub name: String,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSeason {
    pub season_number: i32,
    pub name: Option<String>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
}

impl NewSeason {
    #[must_use]
    pub const fn numbered(season_number: i32) -> Self {
        Self {
            season_number,
            name: None,
            poster_path: None,
            overview: None,
            air_date: None,
        }
    }

    /// Season 0 holds a movie's single episode.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            if self.season_number == 0 {
                "Film".to_string()
            } else {
                format!("Saison {}", self.season_number)
            }
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonUpdate {
    pub name: Option<String>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Episode {
    pub id: i32,
    pub season_id: i32,
    pub episode_number: i32,
    pub title: String,
    pub overview: Option<String>,
    pub thumbnail: Option<String>,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEpisode {
    pub episode_number: i32,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub thumbnail: Option<String>,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
}

impl NewEpisode {
    #[must_use]
    pub const fn numbered(episode_number: i32) -> Self {
        Self {
            episode_number,
            title: None,
            overview: None,
            thumbnail: None,
            air_date: None,
            runtime: None,
        }
    }

    #[must_use]
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Épisode {}", self.episode_number))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeUpdate {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub thumbnail: Option<String>,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoSource {
    pub id: i32,
    pub episode_id: i32,
    pub server_name: ServerName,
    pub link: String,
    pub file_id: Option<String>,
    pub filemoon_code: Option<String>,
    pub quality: String,
    pub language: String,
    pub is_active: bool,
    pub file_size: Option<i64>,
    pub duration: Option<i32>,
    pub mime_type: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVideoSource {
    pub server_name: ServerName,
    pub link: String,
    pub file_id: Option<String>,
    pub filemoon_code: Option<String>,
    pub quality: Option<String>,
    pub language: Option<String>,
    pub file_size: Option<i64>,
    pub duration: Option<i32>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceUpdate {
    pub link: Option<String>,
    pub is_active: Option<bool>,
    pub quality: Option<String>,
    pub filemoon_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogStats {
    pub shows_total: u64,
    pub movies: u64,
    pub series: u64,
    pub seasons: u64,
    pub episodes: u64,
    pub video_sources: u64,
    pub total_views: i64,
    pub users: u64,
    pub pending_uploads: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_kind_accepts_tmdb_alias() {
        assert_eq!("tv".parse::<ShowKind>().unwrap(), ShowKind::Series);
        assert_eq!(" Movie ".parse::<ShowKind>().unwrap(), ShowKind::Movie);
        assert!("anime".parse::<ShowKind>().is_err());
        assert_eq!(ShowKind::Series.tmdb_media_type(), "tv");
    }

    #[test]
    fn default_names() {
        assert_eq!(NewSeason::numbered(0).display_name(), "Film");
        assert_eq!(NewSeason::numbered(2).display_name(), "Saison 2");
        assert_eq!(NewEpisode::numbered(7).display_title(), "Épisode 7");
    }

    #[test]
    fn sort_order_is_lenient() {
        assert_eq!(SortOrder::parse_lenient(Some("ASC")), SortOrder::Asc);
        assert_eq!(SortOrder::parse_lenient(Some("sideways")), SortOrder::Desc);
        assert_eq!(SortOrder::parse_lenient(None), SortOrder::Desc);
    }
}
