use axum::{
    Router,
    http::{HeaderValue, header},
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::compression::{
    CompressionLayer,
    predicate::{DefaultPredicate, NotForContentType, Predicate},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::{RwLock, broadcast};

use crate::clients::filemoon::FilemoonClient;
use crate::clients::telegram::TelegramFileClient;
use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::services::{AuthService, CatalogService, EngagementService, UploadService};
use crate::state::SharedState;

mod admin;
pub mod auth;
mod comments;
mod episodes;
mod error;
mod events;
mod observability;
mod shows;
pub mod stream;
mod system;
mod tmdb;
pub mod types;
mod user;
pub mod validation;
mod videos;

pub use error::{ApiError, expose_internal_errors};
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn CatalogService> {
        &self.shared.catalog
    }

    #[must_use]
    pub fn engagement(&self) -> &Arc<dyn EngagementService> {
        &self.shared.engagement
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth
    }

    #[must_use]
    pub fn tmdb(&self) -> &Arc<TmdbClient> {
        &self.shared.tmdb
    }

    #[must_use]
    pub fn telegram(&self) -> &Arc<TelegramFileClient> {
        &self.shared.telegram
    }

    #[must_use]
    pub fn filemoon(&self) -> &Arc<FilemoonClient> {
        &self.shared.filemoon
    }

    #[must_use]
    pub fn uploads(&self) -> &UploadService {
        &self.shared.uploads
    }

    #[must_use]
    pub fn event_bus(&self) -> &broadcast::Sender<NotificationEvent> {
        &self.shared.event_bus
    }

    /// TMDB image CDN root, read per request so config reloads apply.
    pub async fn image_base(&self) -> String {
        self.config().read().await.tmdb.image_base_url.clone()
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, debug) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.general.debug,
        )
    };
    expose_internal_errors(debug);

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(7)));

    let api_router = Router::new()
        .merge(public_routes())
        .merge(user_routes(state.clone()))
        .merge(admin_routes(state.clone()))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };
    let cors_layer = cors_layer
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
        ]);

    Router::new()
        .route("/", get(system::health))
        .with_state(state)
        .nest("/api", api_router)
        .layer(cors_layer)
        .layer(CompressionLayer::new().compress_when(
            // Proxied media keeps its byte ranges intact.
            DefaultPredicate::new()
                .and(NotForContentType::const_new("video/"))
                .and(NotForContentType::const_new("application/octet-stream")),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(system::health))
        .route("/genres", get(system::get_genres))
        .route("/trending", get(system::get_trending))
        .route("/recent", get(system::get_recent))
        .route("/shows", get(shows::list_shows))
        .route("/shows/search", get(shows::search_shows))
        .route("/shows/suggest", get(shows::suggest))
        .route("/shows/{id}", get(shows::get_show))
        .route("/shows/{id}/episodes", get(shows::get_show_episodes))
        .route("/shows/{id}/related", get(shows::get_related))
        .route("/episodes/{id}", get(episodes::get_episode))
        .route("/episodes/{id}/sources", get(episodes::get_sources))
        .route("/videos/recent", get(videos::recent_videos))
        .route("/videos/search", get(videos::search_videos))
        .route("/videos/{id}", get(videos::get_video))
        .route("/folders", get(videos::list_folders))
        .route("/folders/{id}", get(videos::get_folder))
        .route("/stream/telegram/{file_id}", get(stream::stream_telegram))
        .route("/tmdb/search", get(tmdb::search))
        .route("/tmdb/popular", get(tmdb::popular))
        .route("/tmdb/{tmdb_id}", get(tmdb::details))
        .route("/comments/{id}", get(comments::list_comments))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
}

fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/api-key", get(auth::get_api_key))
        .route("/auth/api-key/regenerate", post(auth::regenerate_api_key))
        .route("/user/watchlist", get(user::get_watchlist))
        .route("/user/watchlist/add", post(user::add_to_watchlist))
        .route(
            "/user/watchlist/{video_id}",
            delete(user::remove_from_watchlist),
        )
        .route(
            "/user/history",
            get(user::get_history).delete(user::clear_history),
        )
        .route("/user/history/update", post(user::update_history))
        .route("/comments/post", post(comments::post_comment))
        .route("/comments/{id}", delete(comments::delete_comment))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/shows", post(admin::create_show))
        .route(
            "/admin/shows/{id}",
            put(admin::update_show).delete(admin::delete_show),
        )
        .route("/admin/shows/{id}/seasons", post(admin::create_season))
        .route(
            "/admin/seasons/{id}",
            put(admin::update_season).delete(admin::delete_season),
        )
        .route("/admin/seasons/{id}/episodes", post(admin::create_episode))
        .route(
            "/admin/episodes/{id}",
            put(admin::update_episode).delete(admin::delete_episode),
        )
        .route("/admin/episodes/{id}/sources", post(admin::create_source))
        .route(
            "/admin/sources/{id}",
            put(admin::update_source).delete(admin::delete_source),
        )
        .route("/admin/filemoon/files", get(admin::list_filemoon_files))
        .route("/admin/uploads", get(admin::list_uploads))
        .route("/admin/uploads/{id}/retry", post(admin::retry_upload))
        .route("/admin/stats", get(system::get_stats))
        .route("/tmdb/enrich/{show_id}", post(tmdb::enrich))
        .route("/metrics", get(observability::get_metrics))
        .route("/events", get(events::sse_handler))
        // Layers run outside-in from the last one added: authenticate first.
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
