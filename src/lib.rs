pub mod api;
pub mod bot;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod parser;
pub mod services;
pub mod state;

use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use services::Scheduler;
use state::SharedState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    init_tracing(&config)?;

    let Some(command) = cli.command else {
        return serve(config, prometheus_handle, Components::all()).await;
    };

    match command {
        Commands::Serve => serve(config, prometheus_handle, Components::all()).await,
        Commands::Api => serve(config, prometheus_handle, Components::api_only()).await,
        Commands::Bot => serve(config, prometheus_handle, Components::bot_only()).await,
        Commands::Stats => cli::commands::cmd_stats(&config).await,
        Commands::Search { query } => cli::commands::cmd_search(&config, &query.join(" ")).await,
        Commands::Import { tmdb_id, kind } => {
            cli::commands::cmd_import(&config, tmdb_id, kind).await
        }
        Commands::ResetPassword { username, password } => {
            cli::commands::cmd_reset_password(&config, &username, &password).await
        }
        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("Config file already exists.");
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Components {
    api: bool,
    bot: bool,
    scheduler: bool,
}

impl Components {
    const fn all() -> Self {
        Self {
            api: true,
            bot: true,
            scheduler: true,
        }
    }

    const fn api_only() -> Self {
        Self {
            api: true,
            bot: false,
            scheduler: false,
        }
    }

    const fn bot_only() -> Self {
        Self {
            api: false,
            bot: true,
            scheduler: false,
        }
    }
}

async fn serve(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
    components: Components,
) -> anyhow::Result<()> {
    info!(
        "ZeeXClub v{} starting ({:?})",
        env!("CARGO_PKG_VERSION"),
        components
    );

    let missing = config.missing_credentials();
    if !missing.is_empty() {
        warn!(missing = ?missing, "Some upstream credentials are not configured");
    }

    let shared = Arc::new(SharedState::new(config.clone()).await?);
    let mut handles: Vec<JoinHandle<()>> = Vec::new();

    let scheduler = components.scheduler.then(|| {
        Arc::new(Scheduler::new(
            shared.store.clone(),
            shared.uploads.clone(),
            config.scheduler.clone(),
            config.bot.session_ttl_seconds,
        ))
    });
    if let Some(scheduler) = scheduler.clone() {
        handles.push(tokio::spawn(async move {
            if let Err(e) = scheduler.start().await {
                error!("Scheduler error: {}", e);
            }
        }));
    }

    if components.bot {
        if config.telegram.bot_enabled && !config.telegram.bot_token.is_empty() {
            let ctx = bot::BotContext::new(
                &config,
                shared.store.clone(),
                shared.catalog.clone(),
                shared.tmdb.clone(),
                shared.uploads.clone(),
            );
            let token = config.telegram.bot_token.clone();
            let api_base = config.telegram.api_base_url.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = bot::run(ctx, &token, &api_base).await {
                    error!("Telegram bot error: {}", e);
                }
            }));
        } else {
            info!("Telegram bot is disabled in config");
        }
    }

    if components.api && config.server.enabled {
        let port = config.server.port;
        let api_state = api::create_app_state(shared.clone(), prometheus_handle);
        let app = api::router(api_state).await;
        let addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        handles.push(tokio::spawn(async move {
            info!("Web server running at http://0.0.0.0:{}", port);
            if let Err(e) = axum::serve(listener, app).await {
                error!("Web server error: {}", e);
            }
        }));
    }

    if handles.is_empty() {
        warn!("Nothing to run: every component is disabled");
        return Ok(());
    }

    info!("Running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }
    for handle in handles {
        handle.abort();
    }
    info!("Stopped");

    Ok(())
}
