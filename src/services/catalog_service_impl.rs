//! `SeaORM` implementation of the `CatalogService` trait.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};

use crate::api::types::{
    EpisodeDto, FolderDetailsDto, SeasonEpisodesDto, SeasonSummaryDto, ShowDetailsDto, ShowDto,
    ShowEpisodesDto, SourceDto, SubfolderDto,
};
use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::models::{
    Episode, NewEpisode, NewSeason, NewVideoSource, Season, ServerName, Show, ShowFilter,
    ShowKind, VideoSource,
};
use crate::parser::parse_advanced_query;
use crate::services::catalog_service::{CatalogError, CatalogService, ImportedShow};
use crate::services::search::{SearchEngine, SearchHit};

pub struct SeaOrmCatalogService {
    store: Store,
    tmdb: Arc<TmdbClient>,
    config: Arc<RwLock<Config>>,
    event_bus: broadcast::Sender<NotificationEvent>,
    engine: SearchEngine,
}

impl SeaOrmCatalogService {
    #[must_use]
    pub fn new(
        store: Store,
        tmdb: Arc<TmdbClient>,
        config: Arc<RwLock<Config>>,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> Self {
        Self {
            store,
            tmdb,
            config,
            event_bus,
            engine: SearchEngine::default(),
        }
    }

    async fn image_base(&self) -> String {
        self.config.read().await.tmdb.image_base_url.clone()
    }

    async fn player_base(&self) -> String {
        self.config.read().await.filemoon.player_url.clone()
    }

    async fn require_show(&self, id: i32) -> Result<Show, CatalogError> {
        self.store
            .get_show(id)
            .await?
            .ok_or(CatalogError::ShowNotFound(id))
    }

    async fn format_sources(&self, sources: Vec<VideoSource>) -> Vec<SourceDto> {
        let player = self.player_base().await;
        sources
            .into_iter()
            .map(|s| SourceDto::new(s, &player))
            .collect()
    }

    /// Episodes of every season of a show, grouped by season id.
    async fn episodes_by_season(
        &self,
        seasons: &[Season],
    ) -> Result<HashMap<i32, Vec<Episode>>, CatalogError> {
        let ids: Vec<i32> = seasons.iter().map(|s| s.id).collect();
        let mut grouped: HashMap<i32, Vec<Episode>> = HashMap::new();
        for episode in self.store.list_episodes_for_seasons(&ids).await? {
            grouped.entry(episode.season_id).or_default().push(episode);
        }
        for episodes in grouped.values_mut() {
            episodes.sort_by_key(|e| e.episode_number);
        }
        Ok(grouped)
    }

    /// Fills the blanks of a series season from TMDB. Lookup failures are
    /// logged and the season is created with what the caller gave.
    async fn with_tmdb_season(&self, show: &Show, season: &NewSeason) -> NewSeason {
        let mut season = season.clone();
        if show.kind != ShowKind::Series || season.season_number < 1 || !self.tmdb.is_configured() {
            return season;
        }

        match self.tmdb.season(show.tmdb_id, season.season_number).await {
            Ok(Some(meta)) => {
                season.name = season.name.or(meta.name);
                season.overview = season.overview.or(meta.overview);
                season.poster_path = season.poster_path.or(meta.poster_path);
                season.air_date = season.air_date.or(meta.air_date);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(show_id = show.id, season = season.season_number, error = %e, "TMDB season lookup failed");
            }
        }
        season
    }

    fn publish(&self, event: NotificationEvent) {
        // No subscribers is not an error.
        let _ = self.event_bus.send(event);
    }
}

#[async_trait::async_trait]
impl CatalogService for SeaOrmCatalogService {
    async fn show_details(&self, id: i32) -> Result<ShowDetailsDto, CatalogError> {
        let show = self.require_show(id).await?;

        let mut seasons = Vec::new();
        if show.kind == ShowKind::Series {
            for season in self.store.list_seasons(id).await? {
                let episode_count = self.store.count_episodes_for_season(season.id).await?;
                seasons.push(SeasonSummaryDto {
                    season,
                    episode_count,
                });
            }
        }

        Ok(ShowDetailsDto {
            show: ShowDto::new(show, &self.image_base().await),
            seasons,
        })
    }

    async fn show_episodes(
        &self,
        id: i32,
        season: Option<i32>,
    ) -> Result<ShowEpisodesDto, CatalogError> {
        let show = self.require_show(id).await?;

        if show.kind == ShowKind::Movie {
            let episode_ids: Vec<i32> = self
                .store
                .list_episodes_for_show(id)
                .await?
                .iter()
                .map(|e| e.id)
                .collect();
            let sources = self
                .store
                .list_sources_for_episodes(&episode_ids, true)
                .await?;
            return Ok(ShowEpisodesDto::Movie {
                sources: self.format_sources(sources).await,
            });
        }

        if let Some(number) = season {
            let target = self
                .store
                .get_season_by_number(id, number)
                .await?
                .ok_or(CatalogError::SeasonNotFound)?;
            let episodes = self.store.list_episodes(target.id).await?;
            return Ok(ShowEpisodesDto::Season {
                season: number,
                season_id: target.id,
                episodes,
            });
        }

        let seasons = self.store.list_seasons(id).await?;
        let mut grouped = self.episodes_by_season(&seasons).await?;
        let seasons = seasons
            .into_iter()
            .map(|s| SeasonEpisodesDto {
                episodes: grouped.remove(&s.id).unwrap_or_default(),
                season_id: s.id,
                season_number: s.season_number,
                name: s.name,
                poster: s.poster_path,
            })
            .collect();

        Ok(ShowEpisodesDto::Series { seasons })
    }

    async fn episode_details(&self, id: i32) -> Result<EpisodeDto, CatalogError> {
        let episode = self
            .store
            .get_episode(id)
            .await?
            .ok_or(CatalogError::EpisodeNotFound(id))?;
        let sources = self.store.list_sources(id, true).await?;

        Ok(EpisodeDto {
            episode,
            sources: self.format_sources(sources).await,
        })
    }

    async fn episode_sources(&self, id: i32) -> Result<Vec<SourceDto>, CatalogError> {
        let sources = self.store.list_sources(id, true).await?;
        if sources.is_empty() {
            return Err(CatalogError::NoSources);
        }
        Ok(self.format_sources(sources).await)
    }

    async fn folder_details(&self, id: i32) -> Result<FolderDetailsDto, CatalogError> {
        let show = self.require_show(id).await?;
        let seasons = self.store.list_seasons(id).await?;
        let mut grouped = self.episodes_by_season(&seasons).await?;

        let subfolders = seasons
            .into_iter()
            .map(|s| SubfolderDto {
                episodes: grouped.remove(&s.id).unwrap_or_default(),
                id: s.id,
                name: s.name,
                season_number: s.season_number,
            })
            .collect();

        Ok(FolderDetailsDto {
            folder: ShowDto::new(show, &self.image_base().await),
            subfolders,
        })
    }

    async fn search(
        &self,
        query: &str,
        kind: Option<ShowKind>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, CatalogError> {
        let mut parsed = parse_advanced_query(query);
        if kind.is_some() {
            parsed.filters.kind = kind;
        }

        let candidates = self
            .store
            .show_candidates(&ShowFilter {
                kind: parsed.filters.kind,
                ..ShowFilter::default()
            })
            .await?;

        Ok(self.engine.advanced_search(&parsed, candidates, limit))
    }

    async fn suggest(&self, partial: &str, limit: usize) -> Result<Vec<String>, CatalogError> {
        let shows = self.store.show_candidates(&ShowFilter::default()).await?;
        Ok(self
            .engine
            .suggest(partial, shows.iter().map(|s| s.title.as_str()), limit))
    }

    async fn import_from_tmdb(
        &self,
        tmdb_id: i32,
        kind: ShowKind,
    ) -> Result<ImportedShow, CatalogError> {
        if self.store.get_show_by_tmdb_id(tmdb_id).await?.is_some() {
            return Err(CatalogError::Duplicate(format!(
                "Show with TMDB id {tmdb_id} already exists"
            )));
        }

        let details = self
            .tmdb
            .details(tmdb_id, kind)
            .await
            .map_err(|e| CatalogError::Tmdb(e.to_string()))?
            .ok_or_else(|| CatalogError::Tmdb(format!("TMDB has no {kind} with id {tmdb_id}")))?;

        let show = self
            .store
            .create_show(&details.to_new_show(kind))
            .await?
            .ok_or_else(|| {
                CatalogError::Duplicate(format!("Show with TMDB id {tmdb_id} already exists"))
            })?;

        let first = match kind {
            ShowKind::Movie => NewSeason::numbered(0),
            ShowKind::Series => self.with_tmdb_season(&show, &NewSeason::numbered(1)).await,
        };
        let season = self
            .store
            .create_season(show.id, &first)
            .await?
            .ok_or_else(|| CatalogError::Duplicate("Season already exists".to_string()))?;

        info!(show_id = show.id, tmdb_id, kind = %kind, title = %show.title, "Imported show from TMDB");
        self.publish(NotificationEvent::ShowCreated {
            show_id: show.id,
            title: show.title.clone(),
        });

        Ok(ImportedShow { show, season })
    }

    async fn refresh_from_tmdb(&self, show_id: i32) -> Result<Show, CatalogError> {
        let show = self.require_show(show_id).await?;
        let details = self
            .tmdb
            .details(show.tmdb_id, show.kind)
            .await
            .map_err(|e| CatalogError::Tmdb(e.to_string()))?
            .ok_or_else(|| {
                CatalogError::Tmdb(format!("TMDB has no {} with id {}", show.kind, show.tmdb_id))
            })?;

        self.store
            .refresh_show_metadata(&details.to_new_show(show.kind))
            .await?;
        info!(show_id, tmdb_id = show.tmdb_id, "Refreshed show metadata");

        self.require_show(show_id).await
    }

    async fn create_season(
        &self,
        show_id: i32,
        season: &NewSeason,
    ) -> Result<Season, CatalogError> {
        if season.season_number < 0 {
            return Err(CatalogError::Validation(
                "season_number must be 0 or greater".to_string(),
            ));
        }
        let show = self.require_show(show_id).await?;
        let season = self.with_tmdb_season(&show, season).await;

        let created = self
            .store
            .create_season(show_id, &season)
            .await?
            .ok_or_else(|| {
                CatalogError::Duplicate(format!(
                    "La saison {} existe déjà",
                    season.season_number
                ))
            })?;
        self.store.touch_show(show_id).await?;
        Ok(created)
    }

    async fn create_episode(
        &self,
        season_id: i32,
        episode: &NewEpisode,
    ) -> Result<Episode, CatalogError> {
        if episode.episode_number < 1 {
            return Err(CatalogError::Validation(
                "episode_number must be 1 or greater".to_string(),
            ));
        }
        let season = self
            .store
            .get_season(season_id)
            .await?
            .ok_or(CatalogError::SeasonNotFound)?;

        let created = self
            .store
            .create_episode(season_id, episode)
            .await?
            .ok_or_else(|| {
                CatalogError::Duplicate(format!(
                    "L'épisode {} existe déjà dans la saison {}",
                    episode.episode_number, season.season_number
                ))
            })?;

        self.store.touch_show(season.show_id).await?;
        self.publish(NotificationEvent::EpisodeAdded {
            show_id: season.show_id,
            season_number: season.season_number,
            episode_number: created.episode_number,
        });
        Ok(created)
    }

    async fn create_source(
        &self,
        episode_id: i32,
        source: &NewVideoSource,
    ) -> Result<VideoSource, CatalogError> {
        match source.server_name {
            ServerName::Filemoon
                if source
                    .filemoon_code
                    .as_deref()
                    .is_none_or(|c| c.trim().is_empty()) =>
            {
                return Err(CatalogError::Validation(
                    "filemoon_code is required for filemoon sources".to_string(),
                ));
            }
            ServerName::Telegram
                if source
                    .file_id
                    .as_deref()
                    .is_none_or(|id| crate::domain::FileId::parse(id).is_none()) =>
            {
                return Err(CatalogError::Validation(
                    "a valid file_id is required for telegram sources".to_string(),
                ));
            }
            _ => {}
        }

        if self.store.get_episode(episode_id).await?.is_none() {
            return Err(CatalogError::EpisodeNotFound(episode_id));
        }
        Ok(self.store.create_source(episode_id, source).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::http::RetryPolicy;
    use crate::config::HttpConfig;
    use crate::models::NewShow;

    async fn service() -> (SeaOrmCatalogService, broadcast::Receiver<NotificationEvent>, i32) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let show = store
            .create_show(&NewShow {
                tmdb_id: 1399,
                title: "Le Bureau des légendes".to_string(),
                kind: ShowKind::Series,
                overview: None,
                poster_path: None,
                backdrop_path: None,
                release_date: Some("2015-04-27".to_string()),
                genres: vec!["Drame".to_string()],
                runtime: None,
                rating: Some(8.2),
                language: None,
            })
            .await
            .unwrap()
            .unwrap();

        let config = Config::default();
        let tmdb = Arc::new(TmdbClient::with_shared_client(
            reqwest::Client::new(),
            config.tmdb.clone(),
            RetryPolicy::from(&HttpConfig::default()),
        ));
        let (tx, rx) = broadcast::channel(16);
        let service = SeaOrmCatalogService::new(store, tmdb, Arc::new(RwLock::new(config)), tx);
        (service, rx, show.id)
    }

    #[tokio::test]
    async fn duplicate_season_is_a_conflict() {
        let (service, _rx, show_id) = service().await;
        service
            .create_season(show_id, &NewSeason::numbered(1))
            .await
            .unwrap();
        let err = service
            .create_season(show_id, &NewSeason::numbered(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate(_)));

        let err = service
            .create_season(show_id, &NewSeason::numbered(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn new_episode_is_announced_on_the_bus() {
        let (service, mut rx, show_id) = service().await;
        let season = service
            .create_season(show_id, &NewSeason::numbered(2))
            .await
            .unwrap();
        service
            .create_episode(season.id, &NewEpisode::numbered(5))
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            NotificationEvent::EpisodeAdded {
                show_id: id,
                season_number,
                episode_number,
            } => {
                assert_eq!(id, show_id);
                assert_eq!(season_number, 2);
                assert_eq!(episode_number, 5);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let err = service
            .create_episode(season.id + 100, &NewEpisode::numbered(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::SeasonNotFound));
    }
}
