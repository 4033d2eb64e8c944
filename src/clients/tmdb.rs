use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::http::{RetryPolicy, send_with_retry};
use crate::config::TmdbConfig;
use crate::models::{NewShow, ShowKind};

#[derive(Debug, Deserialize)]
struct Paged<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawSearchItem {
    id: i32,
    title: Option<String>,
    name: Option<String>,
    original_title: Option<String>,
    original_name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    genre_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbSearchResult {
    pub tmdb_id: i32,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f64,
    pub genre_ids: Vec<i32>,
    pub media_type: String,
}

impl TmdbSearchResult {
    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .filter(|y| !y.is_empty())
    }
}

impl RawSearchItem {
    fn into_result(self, kind: ShowKind) -> TmdbSearchResult {
        TmdbSearchResult {
            tmdb_id: self.id,
            title: self.title.or(self.name).unwrap_or_default(),
            original_title: self.original_title.or(self.original_name),
            overview: self.overview.unwrap_or_default(),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            release_date: self
                .release_date
                .or(self.first_air_date)
                .filter(|d| !d.is_empty()),
            vote_average: self.vote_average,
            genre_ids: self.genre_ids,
            media_type: kind.tmdb_media_type().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NamedItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    key: String,
    site: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawVideos {
    #[serde(default)]
    results: Vec<RawVideo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbSeasonSummary {
    pub season_number: i32,
    pub name: Option<String>,
    pub episode_count: Option<i32>,
    pub air_date: Option<String>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDetails {
    id: i32,
    title: Option<String>,
    name: Option<String>,
    original_title: Option<String>,
    original_name: Option<String>,
    overview: Option<String>,
    tagline: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    runtime: Option<i32>,
    #[serde(default)]
    episode_run_time: Vec<i32>,
    #[serde(default)]
    genres: Vec<NamedItem>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: i64,
    #[serde(default)]
    popularity: f64,
    status: Option<String>,
    homepage: Option<String>,
    original_language: Option<String>,
    #[serde(default)]
    videos: RawVideos,
    number_of_seasons: Option<i32>,
    number_of_episodes: Option<i32>,
    seasons: Option<Vec<TmdbSeasonSummary>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbDetails {
    pub tmdb_id: i32,
    pub title: String,
    pub original_title: Option<String>,
    pub overview: String,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub genres: Vec<String>,
    pub vote_average: f64,
    pub vote_count: i64,
    pub popularity: f64,
    pub status: Option<String>,
    pub homepage: Option<String>,
    pub original_language: Option<String>,
    /// At most three YouTube trailer or teaser URLs.
    pub trailers: Vec<String>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    pub seasons: Option<Vec<TmdbSeasonSummary>>,
}

impl RawDetails {
    fn into_details(self, kind: ShowKind) -> TmdbDetails {
        let trailers = self
            .videos
            .results
            .into_iter()
            .filter(|v| v.site == "YouTube" && matches!(v.kind.as_str(), "Trailer" | "Teaser"))
            .take(3)
            .map(|v| format!("https://youtube.com/watch?v={}", v.key))
            .collect();

        TmdbDetails {
            tmdb_id: self.id,
            title: self.title.or(self.name).unwrap_or_default(),
            original_title: self.original_title.or(self.original_name),
            overview: self.overview.unwrap_or_default(),
            tagline: self.tagline.filter(|t| !t.is_empty()),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            release_date: self
                .release_date
                .or(self.first_air_date)
                .filter(|d| !d.is_empty()),
            runtime: self
                .runtime
                .or_else(|| self.episode_run_time.first().copied()),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            popularity: self.popularity,
            status: self.status,
            homepage: self.homepage.filter(|h| !h.is_empty()),
            original_language: self.original_language,
            trailers,
            number_of_seasons: self.number_of_seasons,
            number_of_episodes: self.number_of_episodes,
            seasons: match kind {
                ShowKind::Series => self.seasons,
                ShowKind::Movie => None,
            },
        }
    }
}

impl TmdbDetails {
    /// Catalog row for this title. The language is the TMDB original language.
    #[must_use]
    pub fn to_new_show(&self, kind: ShowKind) -> NewShow {
        NewShow {
            tmdb_id: self.tmdb_id,
            title: self.title.clone(),
            kind,
            overview: Some(self.overview.clone()).filter(|o| !o.is_empty()),
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
            release_date: self.release_date.clone(),
            genres: self.genres.clone(),
            runtime: self.runtime,
            rating: Some(self.vote_average),
            language: self.original_language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbEpisode {
    pub episode_number: i32,
    #[serde(alias = "name")]
    pub title: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub still_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbSeason {
    pub season_number: i32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub air_date: Option<String>,
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TmdbPopular {
    pub tmdb_id: i32,
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: f64,
    pub media_type: String,
}

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    config: TmdbConfig,
    retry: RetryPolicy,
}

impl TmdbClient {
    #[must_use]
    pub fn with_shared_client(client: Client, config: TmdbConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            config,
            retry,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// GETs `endpoint` with the api key and language. `Ok(None)` on 404.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>> {
        let url = Url::parse_with_params(
            &self.url(endpoint),
            [
                ("api_key", self.config.api_key.as_str()),
                ("language", self.config.language.as_str()),
            ]
            .into_iter()
            .chain(params.iter().map(|(k, v)| (*k, v.as_str()))),
        )?;
        let response = send_with_retry(self.retry, || self.client.get(url.clone())).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("TMDB API error: {} - {}", status, body));
        }

        Ok(Some(response.json().await?))
    }

    pub async fn search(&self, query: &str, kind: ShowKind) -> Result<Vec<TmdbSearchResult>> {
        let endpoint = format!("/search/{}", kind.tmdb_media_type());
        let page: Option<Paged<RawSearchItem>> = self
            .get_json(&endpoint, &[("query", query.to_string()), ("page", "1".to_string())])
            .await?;

        Ok(page
            .map(|p| p.results)
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.into_result(kind))
            .collect())
    }

    pub async fn details(&self, tmdb_id: i32, kind: ShowKind) -> Result<Option<TmdbDetails>> {
        let endpoint = format!("/{}/{}", kind.tmdb_media_type(), tmdb_id);
        let raw: Option<RawDetails> = self
            .get_json(
                &endpoint,
                &[
                    (
                        "append_to_response",
                        "credits,keywords,videos,images".to_string(),
                    ),
                    ("include_image_language", "fr,null".to_string()),
                ],
            )
            .await?;

        Ok(raw.map(|r| r.into_details(kind)))
    }

    pub async fn season(&self, tmdb_id: i32, season_number: i32) -> Result<Option<TmdbSeason>> {
        let endpoint = format!("/tv/{tmdb_id}/season/{season_number}");
        self.get_json(&endpoint, &[]).await
    }

    /// Top ten of the first popularity page.
    pub async fn popular(&self, kind: ShowKind) -> Result<Vec<TmdbPopular>> {
        let endpoint = format!("/{}/popular", kind.tmdb_media_type());
        let page: Option<Paged<RawSearchItem>> =
            self.get_json(&endpoint, &[("page", "1".to_string())]).await?;

        Ok(page
            .map(|p| p.results)
            .unwrap_or_default()
            .into_iter()
            .take(10)
            .map(|item| {
                let r = item.into_result(kind);
                TmdbPopular {
                    tmdb_id: r.tmdb_id,
                    title: r.title,
                    poster_path: r.poster_path,
                    vote_average: r.vote_average,
                    media_type: r.media_type,
                }
            })
            .collect())
    }
}

/// Absolute image URL; paths that already look absolute pass through.
#[must_use]
pub fn image_url(base: &str, path: Option<&str>, size: &str) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    if path.starts_with("http") {
        return Some(path.to_string());
    }
    Some(format!("{}/{}{}", base.trim_end_matches('/'), size, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_url_variants() {
        let base = "https://image.tmdb.org/t/p";
        assert_eq!(
            image_url(base, Some("/abc.jpg"), "w500").as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert_eq!(
            image_url(base, Some("https://cdn/x.jpg"), "w500").as_deref(),
            Some("https://cdn/x.jpg")
        );
        assert_eq!(image_url(base, Some(""), "w500"), None);
        assert_eq!(image_url(base, None, "w500"), None);
    }

    #[test]
    fn details_keep_three_youtube_trailers() {
        let raw: RawDetails = serde_json::from_value(serde_json::json!({
            "id": 66732,
            "name": "Stranger Things",
            "first_air_date": "2016-07-15",
            "episode_run_time": [50],
            "genres": [{"id": 18, "name": "Drame"}],
            "vote_average": 8.6,
            "videos": {"results": [
                {"key": "a", "site": "YouTube", "type": "Trailer"},
                {"key": "b", "site": "Vimeo", "type": "Trailer"},
                {"key": "c", "site": "YouTube", "type": "Featurette"},
                {"key": "d", "site": "YouTube", "type": "Teaser"},
                {"key": "e", "site": "YouTube", "type": "Trailer"},
                {"key": "f", "site": "YouTube", "type": "Trailer"}
            ]},
            "number_of_seasons": 4,
            "seasons": [{"season_number": 1, "name": "Saison 1", "episode_count": 8}]
        }))
        .unwrap();

        let details = raw.into_details(ShowKind::Series);
        assert_eq!(details.title, "Stranger Things");
        assert_eq!(details.release_date.as_deref(), Some("2016-07-15"));
        assert_eq!(details.runtime, Some(50));
        assert_eq!(details.genres, vec!["Drame"]);
        assert_eq!(
            details.trailers,
            vec![
                "https://youtube.com/watch?v=a",
                "https://youtube.com/watch?v=d",
                "https://youtube.com/watch?v=e",
            ]
        );
        assert_eq!(details.seasons.as_ref().map(Vec::len), Some(1));

        let show = details.to_new_show(ShowKind::Series);
        assert_eq!(show.tmdb_id, 66732);
        assert_eq!(show.rating, Some(8.6));
    }

    #[test]
    fn search_item_falls_back_to_tv_fields() {
        let raw: RawSearchItem = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Dark",
            "original_name": "Dark",
            "first_air_date": "",
            "genre_ids": [18]
        }))
        .unwrap();
        let result = raw.into_result(ShowKind::Series);
        assert_eq!(result.title, "Dark");
        assert_eq!(result.release_date, None);
        assert_eq!(result.media_type, "tv");
        assert_eq!(result.year(), None);
    }
}
