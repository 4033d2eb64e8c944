use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

use crate::clients::filemoon::FilemoonClient;
use crate::clients::http::{RetryPolicy, build_shared_http_client};
use crate::clients::telegram::TelegramFileClient;
use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::services::{
    AuthService, CatalogService, EngagementService, SeaOrmAuthService, SeaOrmCatalogService,
    SeaOrmEngagementService, UploadService,
};

/// Long-lived handles shared by the HTTP server, the bot and the scheduler.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub tmdb: Arc<TmdbClient>,

    pub filemoon: Arc<FilemoonClient>,

    pub telegram: Arc<TelegramFileClient>,

    pub catalog: Arc<dyn CatalogService>,

    pub engagement: Arc<dyn EngagementService>,

    pub auth: Arc<dyn AuthService>,

    pub uploads: UploadService,

    pub event_bus: broadcast::Sender<NotificationEvent>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size.max(1));
        Self::with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        // One pooled client for every upstream API.
        let http_client = build_shared_http_client(&config.http)?;
        let retry = RetryPolicy::from(&config.http);

        let tmdb = Arc::new(TmdbClient::with_shared_client(
            http_client.clone(),
            config.tmdb.clone(),
            retry,
        ));
        let filemoon = Arc::new(FilemoonClient::with_shared_client(
            http_client.clone(),
            config.filemoon.clone(),
            retry,
        ));
        let telegram = Arc::new(
            TelegramFileClient::with_shared_client(http_client, &config.telegram, retry)
                .with_stream_timeout(Duration::from_secs(config.streaming.timeout_seconds)),
        );

        let config = Arc::new(RwLock::new(config));

        let catalog = Arc::new(SeaOrmCatalogService::new(
            store.clone(),
            tmdb.clone(),
            config.clone(),
            event_bus.clone(),
        )) as Arc<dyn CatalogService>;
        let engagement =
            Arc::new(SeaOrmEngagementService::new(store.clone())) as Arc<dyn EngagementService>;
        let auth =
            Arc::new(SeaOrmAuthService::new(store.clone(), config.clone())) as Arc<dyn AuthService>;
        let uploads = UploadService::new(
            store.clone(),
            filemoon.clone(),
            telegram.clone(),
            event_bus.clone(),
        );

        Ok(Self {
            config,
            store,
            tmdb,
            filemoon,
            telegram,
            catalog,
            engagement,
            auth,
            uploads,
            event_bus,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
