use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Network {
    /// Chain id the marketplace is deployed to; everything else is reported
    /// as unsupported.
    #[serde(default = "default_target_chain_id")]
    pub target_chain_id: u64,
}

fn default_target_chain_id() -> u64 {
    1337 // Ganache
}

impl Default for Network {
    fn default() -> Self {
        Self {
            target_chain_id: default_target_chain_id(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Artifacts {
    /// Directory holding the `<Name>.json` deployment artifacts.
    #[serde(default = "default_artifacts_base_dir")]
    pub base_dir: String,
    #[serde(default = "default_contract_name")]
    pub contract_name: String,
}

fn default_artifacts_base_dir() -> String {
    "public/contracts".to_string()
}
fn default_contract_name() -> String {
    "NftMarket".to_string()
}

impl Default for Artifacts {
    fn default() -> Self {
        Self {
            base_dir: default_artifacts_base_dir(),
            contract_name: default_contract_name(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    /// Mark all query entries stale whenever a new snapshot is published.
    #[serde(default = "default_true")]
    pub revalidate_on_reconnect: bool,
    /// Keep entries alive after their last subscriber goes away.
    #[serde(default = "default_false")]
    pub persist_idle: bool,
}

fn default_false() -> bool {
    false
}
fn default_true() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            revalidate_on_reconnect: default_true(),
            persist_idle: default_false(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metadata {
    #[serde(default = "default_metadata_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_metadata_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_metadata_timeout_seconds() -> u64 {
    10
}
fn default_metadata_cache_capacity() -> usize {
    128
}

impl Metadata {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_metadata_timeout_seconds(),
            cache_capacity: default_metadata_cache_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Transactions {
    /// Receipt polling cadence while a transaction is pending.
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,
    /// Give up waiting for a receipt after this long.
    #[serde(default = "default_confirmation_timeout_seconds")]
    pub confirmation_timeout_seconds: u64,
}

fn default_confirmation_poll_ms() -> u64 {
    1000
}
fn default_confirmation_timeout_seconds() -> u64 {
    120
}

impl Transactions {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms)
    }

    pub fn confirmation_deadline(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_seconds)
    }
}

impl Default for Transactions {
    fn default() -> Self {
        Self {
            confirmation_poll_ms: default_confirmation_poll_ms(),
            confirmation_timeout_seconds: default_confirmation_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub artifacts: Artifacts,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub transactions: Transactions,
    #[serde(default)]
    pub log: LogSettings,
}

impl Settings {
    /// Loads `Config.toml` when present and applies `SDK_*` environment
    /// overrides. Every field has a default, so a missing file still yields
    /// a usable configuration.
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("Config.toml").required(false))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        if let Ok(raw) = env::var("SDK_TARGET_CHAIN_ID") {
            match raw.trim().parse::<u64>() {
                Ok(chain_id) => settings.network.target_chain_id = chain_id,
                Err(e) => eprintln!("Failed to parse SDK_TARGET_CHAIN_ID '{}': {}", raw, e),
            }
        }
        if let Ok(base_dir) = env::var("SDK_ARTIFACTS_BASE_DIR") {
            let trimmed = base_dir.trim();
            if !trimmed.is_empty() {
                settings.artifacts.base_dir = trimmed.to_string();
            }
        }
        if let Ok(name) = env::var("SDK_CONTRACT_NAME") {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                settings.artifacts.contract_name = trimmed.to_string();
            }
        }

        Ok(settings)
    }
}
