//! Configuration for nuliga-sync.

use serde::{Deserialize, Serialize};

/// Portal access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Championship identifier the portal keys everything on,
    /// e.g. "TVM Sommer 2026"
    #[serde(default = "default_championship")]
    pub championship: String,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: f64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

fn default_base_url() -> String {
    "https://tvm.liga.nu".to_string()
}

fn default_championship() -> String {
    "TVM Sommer 2026".to_string()
}

fn default_requests_per_minute() -> u32 {
    20
}

fn default_min_delay_secs() -> f64 {
    1.5
}

fn default_max_delay_secs() -> f64 {
    3.0
}

fn default_cache_dir() -> String {
    "data/cache/portal".to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            championship: default_championship(),
            requests_per_minute: default_requests_per_minute(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            cache_dir: default_cache_dir(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/nuliga.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum bigram similarity for an automatic match
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,
}

fn default_accept_threshold() -> f64 {
    0.7
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            accept_threshold: default_accept_threshold(),
        }
    }
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Season label stored on teams and fixtures, e.g. "Sommer 2026"
    #[serde(default = "default_season")]
    pub season: String,
}

fn default_season() -> String {
    "Sommer 2026".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            season: default_season(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (NULIGA_DATABASE_PATH,
            // NULIGA_SYNC_SEASON, etc.)
            .add_source(
                config::Environment::with_prefix("NULIGA")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
