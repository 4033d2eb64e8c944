use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub tmdb: TmdbConfig,

    pub filemoon: FilemoonConfig,

    pub telegram: TelegramConfig,

    pub streaming: StreamingConfig,

    pub http: HttpConfig,

    pub scheduler: SchedulerConfig,

    pub bot: BotConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub app_name: String,

    pub database_path: String,

    pub log_level: String,

    /// Exposes internal error messages in 5xx bodies.
    pub debug: bool,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            app_name: "ZeeXClub API".to_string(),
            database_path: "sqlite:data/zeexclub.db".to_string(),
            log_level: "info".to_string(),
            debug: false,
            event_bus_buffer_size: 100,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Public origin of the frontend, used in bot messages.
    pub frontend_url: String,

    /// Whether to set the Secure flag on session cookies.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
            frontend_url: "http://localhost:3000".to_string(),
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub api_key: String,

    pub base_url: String,

    pub image_base_url: String,

    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p".to_string(),
            language: "fr-FR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilemoonConfig {
    pub api_key: String,

    pub base_url: String,

    pub player_url: String,
}

impl Default for FilemoonConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://filemoon.sx/api".to_string(),
            player_url: "https://filemoon.sx/e/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_enabled: bool,

    pub bot_token: String,

    pub api_base_url: String,

    /// Telegram user ids allowed to drive the admin bot.
    pub admin_user_ids: Vec<u64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_enabled: false,
            bot_token: String::new(),
            api_base_url: "https://api.telegram.org".to_string(),
            admin_user_ids: Vec::new(),
        }
    }
}

impl TelegramConfig {
    #[must_use]
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub buffer_size: usize,

    pub timeout_seconds: u64,

    pub cache_max_age_seconds: u64,

    pub default_content_type: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256 * 1024,
            timeout_seconds: 300,
            cache_max_age_seconds: 3600,
            default_content_type: "video/mp4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds for upstream API calls (default: 30)
    pub request_timeout_seconds: u64,

    /// Total attempts per upstream request, first try included.
    pub retry_attempts: u32,

    /// Fixed delay between attempts.
    pub retry_backoff_ms: u64,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 30,
            retry_attempts: 3,
            retry_backoff_ms: 500,
            user_agent: "ZeeXClub/1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub session_cleanup_cron: String,

    pub upload_retry_cron: String,

    /// Pending uploads younger than this are left to the bot's `/done` flow.
    pub upload_grace_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_cleanup_cron: "0 */5 * * * *".to_string(),
            upload_retry_cron: "0 */15 * * * *".to_string(),
            upload_grace_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub session_ttl_seconds: u64,

    pub session_cleanup_interval_seconds: u64,

    pub docs_page_size: u64,

    pub upload_delay_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 3600,
            session_cleanup_interval_seconds: 300,
            docs_page_size: 10,
            upload_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "zeexclub".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    pub min_password_length: usize,

    pub allow_registration: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
            allow_registration: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            tmdb: TmdbConfig::default(),
            filemoon: FilemoonConfig::default(),
            telegram: TelegramConfig::default(),
            streaming: StreamingConfig::default(),
            http: HttpConfig::default(),
            scheduler: SchedulerConfig::default(),
            bot: BotConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies `.env` and environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Secrets are usually injected by the environment rather than written to disk.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("TMDB_API_KEY") {
            self.tmdb.api_key = key;
        }
        if let Some(key) = lookup("FILEMOON_API_KEY") {
            self.filemoon.api_key = key;
        }
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(ids) = lookup("ADMIN_USER_IDS") {
            self.telegram.admin_user_ids = parse_id_list(&ids);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.general.database_path = url;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("FRONTEND_URL") {
            self.server.frontend_url = url;
        }
        if let Some(debug) = lookup("DEBUG") {
            self.general.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("zeexclub").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".zeexclub").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_enabled && self.telegram.bot_token.is_empty() {
            anyhow::bail!("Telegram bot token cannot be empty when the bot is enabled");
        }

        if self.telegram.bot_enabled && self.telegram.admin_user_ids.is_empty() {
            anyhow::bail!("At least one admin user id is required when the bot is enabled");
        }

        if self.http.retry_attempts == 0 {
            anyhow::bail!("http.retry_attempts must be at least 1");
        }

        if self.streaming.buffer_size == 0 {
            anyhow::bail!("streaming.buffer_size must be > 0");
        }

        if self.bot.docs_page_size == 0 {
            anyhow::bail!("bot.docs_page_size must be > 0");
        }

        Ok(())
    }

    /// Lists the upstream credentials that are missing, for startup warnings.
    #[must_use]
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.tmdb.api_key.is_empty() {
            missing.push("TMDB_API_KEY");
        }
        if self.filemoon.api_key.is_empty() {
            missing.push("FILEMOON_API_KEY");
        }
        if self.telegram.bot_token.is_empty() {
            missing.push("TELEGRAM_BOT_TOKEN");
        }
        missing
    }
}

fn parse_id_list(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.streaming.buffer_size, 262_144);
        assert_eq!(config.http.retry_attempts, 3);
        assert_eq!(config.bot.session_ttl_seconds, 3600);
        assert_eq!(config.tmdb.base_url, "https://api.themoviedb.org/3");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[tmdb]"));
        assert!(toml_str.contains("[streaming]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [http]
            retry_attempts = 5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.http.retry_attempts, 5);

        assert_eq!(config.filemoon.player_url, "https://filemoon.sx/e/");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "TMDB_API_KEY" => Some("tmdb-key".to_string()),
            "ADMIN_USER_IDS" => Some("12, 34,nope,56".to_string()),
            "PORT" => Some("9100".to_string()),
            _ => None,
        });

        assert_eq!(config.tmdb.api_key, "tmdb-key");
        assert_eq!(config.telegram.admin_user_ids, vec![12, 34, 56]);
        assert_eq!(config.server.port, 9100);
        assert!(config.telegram.is_admin(34));
        assert!(!config.telegram.is_admin(99));
    }

    #[test]
    fn test_validate_rejects_bot_without_token() {
        let mut config = Config::default();
        config.telegram.bot_enabled = true;
        config.telegram.admin_user_ids = vec![1];
        assert!(config.validate().is_err());

        config.telegram.bot_token = "123:abc".to_string();
        assert!(config.validate().is_ok());
    }
}
