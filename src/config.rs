//! Configuration management for the leader routing pipelines.
//!
//! Supports loading from environment variables, config files, and CLI arguments.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Solana JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Retry policy for RPC calls
    #[serde(default)]
    pub rpc: RetryConfig,

    /// Geolocation service settings
    #[serde(default)]
    pub geo: GeoConfig,

    /// Output document paths
    #[serde(default)]
    pub paths: PathConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per RPC call (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-attempt timeout (seconds)
    #[serde(default = "default_rpc_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Base delay for exponential backoff (ms)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl RetryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_rpc_timeout_secs(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Base URL of the ip-api compatible lookup service
    #[serde(default = "default_geo_base_url")]
    pub base_url: String,

    /// Per-lookup timeout (seconds)
    #[serde(default = "default_geo_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Outbound lookup budget enforced by the throttle
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Sleep after a rate-limit response (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,

    /// Rate-limit retries per IP before giving up on it
    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
}

impl GeoConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }

    /// Minimum spacing between two outbound lookups.
    ///
    /// 45 requests/minute gives ~1.33s.
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs(60) / self.requests_per_minute.max(1)
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            base_url: default_geo_base_url(),
            request_timeout_secs: default_geo_timeout_secs(),
            requests_per_minute: default_requests_per_minute(),
            rate_limit_cooldown_secs: default_cooldown_secs(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_schedule_output")]
    pub schedule_output: PathBuf,

    #[serde(default = "default_geo_output")]
    pub geo_output: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            schedule_output: default_schedule_output(),
            geo_output: default_geo_output(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            rpc: RetryConfig::default(),
            geo: GeoConfig::default(),
            paths: PathConfig::default(),
        }
    }
}

// Default value functions
fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_geo_base_url() -> String {
    "http://ip-api.com".to_string()
}

fn default_geo_timeout_secs() -> u64 {
    10
}

fn default_requests_per_minute() -> u32 {
    45 // ip-api.com free tier
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_max_rate_limit_retries() -> u32 {
    3
}

fn default_schedule_output() -> PathBuf {
    PathBuf::from("data/schedule.json")
}

fn default_geo_output() -> PathBuf {
    PathBuf::from("data/leader_geo.json")
}

impl PipelineConfig {
    /// Load configuration from defaults plus environment overrides
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load from a TOML config file with environment overrides
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = ::toml::from_str(&contents)?;

        // Environment variables override file settings
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SOLANA_RPC_URL") {
            self.rpc_url = url;
        }
        if let Ok(url) = std::env::var("GEO_API_BASE_URL") {
            self.geo.base_url = url;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.max_attempts == 0 {
            anyhow::bail!("rpc.max_attempts must be > 0");
        }
        if self.geo.requests_per_minute == 0 {
            anyhow::bail!("geo.requests_per_minute must be > 0");
        }
        if self.rpc_url.trim().is_empty() {
            anyhow::bail!("rpc_url must not be empty");
        }
        Ok(())
    }
}
