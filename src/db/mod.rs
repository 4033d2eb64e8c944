use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::models::{
    BotSession, CatalogStats, Comment, Episode, EpisodeUpdate, HistoryEntry, NewEpisode,
    NewSeason, NewShow, NewVideoSource, ProgressUpdate, Season, SeasonUpdate, Show, ShowFilter,
    ShowKind, ShowUpdate, SourceUpdate, UploadStatus, UploadTask, UploadTaskUpdate, VideoSource,
    WatchlistEntry,
};

pub mod migrator;
pub mod repositories;

pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:")
                .split('?')
                .next()
                .unwrap_or_default();
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        // The in-memory database lives only as long as its connection.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn show_repo(&self) -> repositories::show::ShowRepository {
        repositories::show::ShowRepository::new(self.conn.clone())
    }

    fn season_repo(&self) -> repositories::season::SeasonRepository {
        repositories::season::SeasonRepository::new(self.conn.clone())
    }

    fn episode_repo(&self) -> repositories::episode::EpisodeRepository {
        repositories::episode::EpisodeRepository::new(self.conn.clone())
    }

    fn source_repo(&self) -> repositories::source::SourceRepository {
        repositories::source::SourceRepository::new(self.conn.clone())
    }

    fn watchlist_repo(&self) -> repositories::watchlist::WatchlistRepository {
        repositories::watchlist::WatchlistRepository::new(self.conn.clone())
    }

    fn history_repo(&self) -> repositories::history::HistoryRepository {
        repositories::history::HistoryRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    fn bot_session_repo(&self) -> repositories::bot_session::BotSessionRepository {
        repositories::bot_session::BotSessionRepository::new(self.conn.clone())
    }

    fn upload_task_repo(&self) -> repositories::upload_task::UploadTaskRepository {
        repositories::upload_task::UploadTaskRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn stats_repo(&self) -> repositories::stats::StatsRepository {
        repositories::stats::StatsRepository::new(self.conn.clone())
    }

    // Shows

    pub async fn list_shows(&self, filter: &ShowFilter) -> Result<(Vec<Show>, u64)> {
        self.show_repo().list(filter).await
    }

    pub async fn show_candidates(&self, filter: &ShowFilter) -> Result<Vec<Show>> {
        self.show_repo().candidates(filter).await
    }

    pub async fn get_show(&self, id: i32) -> Result<Option<Show>> {
        self.show_repo().get(id).await
    }

    pub async fn get_show_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<Show>> {
        self.show_repo().get_by_tmdb_id(tmdb_id).await
    }

    pub async fn create_show(&self, show: &NewShow) -> Result<Option<Show>> {
        self.show_repo().create(show).await
    }

    pub async fn refresh_show_metadata(&self, show: &NewShow) -> Result<()> {
        self.show_repo().upsert_metadata(show).await
    }

    pub async fn update_show(&self, id: i32, update: &ShowUpdate) -> Result<Option<Show>> {
        self.show_repo().update(id, update).await
    }

    pub async fn touch_show(&self, id: i32) -> Result<()> {
        self.show_repo().touch(id).await
    }

    pub async fn delete_show(&self, id: i32) -> Result<bool> {
        self.show_repo().delete(id).await
    }

    pub async fn increment_show_views(&self, id: i32) -> Result<()> {
        self.show_repo().increment_views(id).await
    }

    pub async fn search_shows(
        &self,
        query: &str,
        kind: Option<ShowKind>,
        limit: u64,
    ) -> Result<Vec<Show>> {
        self.show_repo().search(query, kind, limit).await
    }

    pub async fn trending_shows(&self, kind: Option<ShowKind>, limit: u64) -> Result<Vec<Show>> {
        self.show_repo().trending(kind, limit).await
    }

    pub async fn recent_shows(&self, kind: Option<ShowKind>, limit: u64) -> Result<Vec<Show>> {
        self.show_repo().recent(kind, limit).await
    }

    pub async fn related_shows(&self, show: &Show, limit: u64) -> Result<Vec<Show>> {
        self.show_repo().related(show, limit).await
    }

    // Seasons

    pub async fn list_seasons(&self, show_id: i32) -> Result<Vec<Season>> {
        self.season_repo().list_for_show(show_id).await
    }

    pub async fn get_season(&self, id: i32) -> Result<Option<Season>> {
        self.season_repo().get(id).await
    }

    pub async fn get_season_by_number(
        &self,
        show_id: i32,
        season_number: i32,
    ) -> Result<Option<Season>> {
        self.season_repo()
            .get_by_number(show_id, season_number)
            .await
    }

    pub async fn create_season(&self, show_id: i32, season: &NewSeason) -> Result<Option<Season>> {
        self.season_repo().create(show_id, season).await
    }

    pub async fn update_season(&self, id: i32, update: &SeasonUpdate) -> Result<Option<Season>> {
        self.season_repo().update(id, update).await
    }

    pub async fn delete_season(&self, id: i32) -> Result<bool> {
        self.season_repo().delete(id).await
    }

    // Episodes

    pub async fn list_episodes(&self, season_id: i32) -> Result<Vec<Episode>> {
        self.episode_repo().list_for_season(season_id).await
    }

    pub async fn list_episodes_for_seasons(&self, season_ids: &[i32]) -> Result<Vec<Episode>> {
        self.episode_repo().list_for_seasons(season_ids).await
    }

    pub async fn list_episodes_for_show(&self, show_id: i32) -> Result<Vec<Episode>> {
        self.episode_repo().list_for_show(show_id).await
    }

    pub async fn count_episodes_for_season(&self, season_id: i32) -> Result<u64> {
        self.episode_repo().count_for_season(season_id).await
    }

    pub async fn get_episode(&self, id: i32) -> Result<Option<Episode>> {
        self.episode_repo().get(id).await
    }

    pub async fn get_episode_with_context(&self, id: i32) -> Result<Option<(Episode, Season, Show)>> {
        self.episode_repo().with_context(id).await
    }

    pub async fn get_episode_by_number(
        &self,
        season_id: i32,
        episode_number: i32,
    ) -> Result<Option<Episode>> {
        self.episode_repo()
            .get_by_number(season_id, episode_number)
            .await
    }

    pub async fn create_episode(
        &self,
        season_id: i32,
        episode: &NewEpisode,
    ) -> Result<Option<Episode>> {
        self.episode_repo().create(season_id, episode).await
    }

    pub async fn update_episode(&self, id: i32, update: &EpisodeUpdate) -> Result<Option<Episode>> {
        self.episode_repo().update(id, update).await
    }

    pub async fn delete_episode(&self, id: i32) -> Result<bool> {
        self.episode_repo().delete(id).await
    }

    // Video sources

    pub async fn list_sources(&self, episode_id: i32, active_only: bool) -> Result<Vec<VideoSource>> {
        self.source_repo()
            .list_for_episode(episode_id, active_only)
            .await
    }

    pub async fn list_sources_for_episodes(
        &self,
        episode_ids: &[i32],
        active_only: bool,
    ) -> Result<Vec<VideoSource>> {
        self.source_repo()
            .list_for_episodes(episode_ids, active_only)
            .await
    }

    pub async fn get_source(&self, id: i32) -> Result<Option<VideoSource>> {
        self.source_repo().get(id).await
    }

    pub async fn find_source_by_file_id(&self, file_id: &str) -> Result<Option<VideoSource>> {
        self.source_repo().find_by_file_id(file_id).await
    }

    pub async fn create_source(
        &self,
        episode_id: i32,
        source: &NewVideoSource,
    ) -> Result<VideoSource> {
        self.source_repo().create(episode_id, source).await
    }

    pub async fn update_source(&self, id: i32, update: &SourceUpdate) -> Result<Option<VideoSource>> {
        self.source_repo().update(id, update).await
    }

    pub async fn delete_source(&self, id: i32) -> Result<bool> {
        self.source_repo().delete(id).await
    }

    // Watchlist, history, comments

    pub async fn list_watchlist(&self, user_id: i32) -> Result<Vec<WatchlistEntry>> {
        self.watchlist_repo().list(user_id).await
    }

    pub async fn add_to_watchlist(&self, user_id: i32, video_id: i32) -> Result<bool> {
        self.watchlist_repo().add(user_id, video_id).await
    }

    pub async fn remove_from_watchlist(&self, user_id: i32, video_id: i32) -> Result<bool> {
        self.watchlist_repo().remove(user_id, video_id).await
    }

    pub async fn list_history(
        &self,
        user_id: i32,
        completed: Option<bool>,
        limit: u64,
    ) -> Result<Vec<HistoryEntry>> {
        self.history_repo().list(user_id, completed, limit).await
    }

    pub async fn record_progress(&self, user_id: i32, update: &ProgressUpdate) -> Result<()> {
        self.history_repo().record(user_id, update).await
    }

    pub async fn clear_history(&self, user_id: i32) -> Result<u64> {
        self.history_repo().clear(user_id).await
    }

    pub async fn list_comments(
        &self,
        video_id: i32,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Comment>, u64)> {
        self.comment_repo().list(video_id, offset, limit).await
    }

    pub async fn add_comment(
        &self,
        user_id: i32,
        username: &str,
        video_id: i32,
        text: &str,
    ) -> Result<Comment> {
        self.comment_repo()
            .add(user_id, username, video_id, text)
            .await
    }

    pub async fn comment_author(&self, id: i32) -> Result<Option<i32>> {
        self.comment_repo().author(id).await
    }

    pub async fn delete_comment(&self, id: i32) -> Result<bool> {
        self.comment_repo().delete(id).await
    }

    // Bot sessions

    pub async fn get_bot_session(&self, admin_id: i64) -> Result<Option<BotSession>> {
        self.bot_session_repo().get(admin_id).await
    }

    pub async fn save_bot_session(&self, session: &BotSession) -> Result<()> {
        self.bot_session_repo().save(session).await
    }

    pub async fn clear_bot_session(&self, admin_id: i64) -> Result<bool> {
        self.bot_session_repo().delete(admin_id).await
    }

    pub async fn purge_bot_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.bot_session_repo().purge_older_than(cutoff).await
    }

    // Upload tasks

    pub async fn create_upload_task(
        &self,
        episode_id: i32,
        file_id: &str,
        title: &str,
    ) -> Result<UploadTask> {
        self.upload_task_repo()
            .create(episode_id, file_id, title)
            .await
    }

    pub async fn get_upload_task(&self, id: i32) -> Result<Option<UploadTask>> {
        self.upload_task_repo().get(id).await
    }

    pub async fn update_upload_task(
        &self,
        id: i32,
        update: &UploadTaskUpdate,
    ) -> Result<Option<UploadTask>> {
        self.upload_task_repo().update(id, update).await
    }

    pub async fn claim_upload_task(&self, id: i32, from: &[UploadStatus]) -> Result<bool> {
        self.upload_task_repo().claim(id, from).await
    }

    pub async fn list_upload_tasks(
        &self,
        status: Option<UploadStatus>,
        limit: u64,
    ) -> Result<Vec<UploadTask>> {
        self.upload_task_repo().list(status, limit).await
    }

    pub async fn list_stale_upload_tasks(&self, cutoff: DateTime<Utc>) -> Result<Vec<UploadTask>> {
        self.upload_task_repo()
            .list_stale_pending(&cutoff.to_rfc3339())
            .await
    }

    // Users

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo()
            .create(username, password, is_admin, security)
            .await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn regenerate_api_key(&self, user_id: i32) -> Result<String> {
        self.user_repo().regenerate_api_key(user_id).await
    }

    pub async fn update_user_password(
        &self,
        user_id: i32,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        self.user_repo()
            .update_password(user_id, new_password, security)
            .await
    }

    pub async fn catalog_stats(&self) -> Result<CatalogStats> {
        self.stats_repo().catalog().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShowKind;

    fn new_show(tmdb_id: i32, title: &str, kind: ShowKind, genres: &[&str]) -> NewShow {
        NewShow {
            tmdb_id,
            title: title.to_string(),
            kind,
            overview: Some(format!("{title} overview")),
            poster_path: None,
            backdrop_path: None,
            release_date: Some("2020-05-01".to_string()),
            genres: genres.iter().map(ToString::to_string).collect(),
            runtime: None,
            rating: Some(7.5),
            language: None,
        }
    }

    async fn store() -> Store {
        Store::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn duplicate_tmdb_id_is_rejected() {
        let store = store().await;
        let show = new_show(1, "Dune", ShowKind::Movie, &["Science-Fiction"]);
        assert!(store.create_show(&show).await.unwrap().is_some());
        assert!(store.create_show(&show).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn season_and_episode_numbers_are_unique_per_parent() {
        let store = store().await;
        let show = store
            .create_show(&new_show(2, "Dark", ShowKind::Series, &[]))
            .await
            .unwrap()
            .unwrap();

        let season = store
            .create_season(show.id, &NewSeason::numbered(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(season.name, "Saison 1");
        assert!(
            store
                .create_season(show.id, &NewSeason::numbered(1))
                .await
                .unwrap()
                .is_none()
        );

        let ep = store
            .create_episode(season.id, &NewEpisode::numbered(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ep.title, "Épisode 1");
        assert!(
            store
                .create_episode(season.id, &NewEpisode::numbered(1))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn delete_show_cascades() {
        let store = store().await;
        let show = store
            .create_show(&new_show(3, "Lupin", ShowKind::Series, &[]))
            .await
            .unwrap()
            .unwrap();
        let season = store
            .create_season(show.id, &NewSeason::numbered(1))
            .await
            .unwrap()
            .unwrap();
        let ep = store
            .create_episode(season.id, &NewEpisode::numbered(1))
            .await
            .unwrap()
            .unwrap();

        assert!(store.delete_show(show.id).await.unwrap());
        assert!(store.get_season(season.id).await.unwrap().is_none());
        assert!(store.get_episode(ep.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let store = store().await;
        for i in 0..5 {
            let kind = if i % 2 == 0 {
                ShowKind::Movie
            } else {
                ShowKind::Series
            };
            store
                .create_show(&new_show(100 + i, &format!("Show {i}"), kind, &["Drame"]))
                .await
                .unwrap();
        }

        let filter = ShowFilter {
            kind: Some(ShowKind::Movie),
            limit: 2,
            ..Default::default()
        };
        let (items, total) = store.list_shows(&filter).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 2);

        let filter = ShowFilter {
            genre: Some("Drame".to_string()),
            year_from: Some(2020),
            year_to: Some(2020),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(store.list_shows(&filter).await.unwrap().1, 5);
    }

    #[tokio::test]
    async fn genre_and_search_match_substrings_literally() {
        let store = store().await;
        store
            .create_show(&new_show(200, "Dune", ShowKind::Movie, &["Science-Fiction"]))
            .await
            .unwrap();
        store
            .create_show(&new_show(201, "100% Coco", ShowKind::Movie, &["Comédie"]))
            .await
            .unwrap();

        let by_genre = |genre: &str| ShowFilter {
            genre: Some(genre.to_string()),
            limit: 10,
            ..Default::default()
        };
        let (items, _) = store.list_shows(&by_genre("Science")).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Dune");
        assert_eq!(store.list_shows(&by_genre("fiction")).await.unwrap().1, 1);
        assert_eq!(store.list_shows(&by_genre("_")).await.unwrap().1, 0);

        let by_search = |q: &str| ShowFilter {
            search: Some(q.to_string()),
            limit: 10,
            ..Default::default()
        };
        let (items, total) = store.list_shows(&by_search("%")).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].title, "100% Coco");
        assert_eq!(store.list_shows(&by_search("D_ne")).await.unwrap().1, 0);
    }

    #[tokio::test]
    async fn watchlist_pair_is_unique() {
        let store = store().await;
        let show = store
            .create_show(&new_show(4, "Arcane", ShowKind::Series, &[]))
            .await
            .unwrap()
            .unwrap();
        let admin = store.get_user_by_username("admin").await.unwrap().unwrap();

        assert!(store.add_to_watchlist(admin.id, show.id).await.unwrap());
        assert!(!store.add_to_watchlist(admin.id, show.id).await.unwrap());
        assert_eq!(store.list_watchlist(admin.id).await.unwrap().len(), 1);
        assert!(store.remove_from_watchlist(admin.id, show.id).await.unwrap());
    }

    #[tokio::test]
    async fn history_upserts_per_show() {
        let store = store().await;
        let show = store
            .create_show(&new_show(5, "Mindhunter", ShowKind::Series, &[]))
            .await
            .unwrap()
            .unwrap();
        let admin = store.get_user_by_username("admin").await.unwrap().unwrap();

        for progress in [10, 20] {
            store
                .record_progress(
                    admin.id,
                    &ProgressUpdate {
                        video_id: show.id,
                        episode_id: None,
                        progress,
                        completed: false,
                    },
                )
                .await
                .unwrap();
        }
        let history = store.list_history(admin.id, None, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].progress, 20);
        assert!(
            store
                .list_history(admin.id, Some(true), 10)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn upload_task_terminal_status_sets_completed_at() {
        let store = store().await;
        let show = store
            .create_show(&new_show(6, "Heat", ShowKind::Movie, &[]))
            .await
            .unwrap()
            .unwrap();
        let season = store
            .create_season(show.id, &NewSeason::numbered(0))
            .await
            .unwrap()
            .unwrap();
        let ep = store
            .create_episode(season.id, &NewEpisode::numbered(1))
            .await
            .unwrap()
            .unwrap();

        let task = store
            .create_upload_task(ep.id, "BAAC", "Heat S00E01")
            .await
            .unwrap();
        assert!(task.completed_at.is_none());

        let done = store
            .update_upload_task(
                task.id,
                &UploadTaskUpdate {
                    status: Some(UploadStatus::Completed),
                    progress: Some(150),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(done.completed_at.is_some());
        assert_eq!(done.progress, 100);
    }
}
