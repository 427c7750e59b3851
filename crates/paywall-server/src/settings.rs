//! Service configuration.
//!
//! Loaded from an optional `paywall.toml` next to the binary, then overridden by
//! `PAYWALL__<SECTION>__<KEY>` environment variables.

use config::{Config, Environment, File, FileFormat};
use paywall_gate::gate::GateConfig;
use paywall_providers::provider::ProviderSettings;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    pub payments: ProviderSettings,
    #[serde(default)]
    pub gate: GateSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateSettings {
    /// Lifetime of the invoice correlation, in seconds.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u32,
    /// How often expired grants are compacted.
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
    /// Grants are kept this many hours past their expiry before compaction.
    #[serde(default = "default_grant_retention_hours")]
    pub grant_retention_hours: u32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl_secs(),
            prune_interval_secs: default_prune_interval_secs(),
            grant_retention_hours: default_grant_retention_hours(),
        }
    }
}

impl GateSettings {
    pub fn gate_config(&self) -> GateConfig {
        GateConfig::builder()
            .pending_ttl_secs(self.pending_ttl_secs)
            .build()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite://paywall.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_pending_ttl_secs() -> u32 {
    900 // 15 minutes
}

fn default_prune_interval_secs() -> u64 {
    3600
}

fn default_grant_retention_hours() -> u32 {
    24
}

fn default_log_level() -> String {
    "info".to_string()
}

fn environment() -> Environment {
    Environment::with_prefix("PAYWALL")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load `paywall.toml` (if present) and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(File::with_name("paywall").required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Parse settings from TOML text alone.
    pub fn from_toml_str(toml: &str) -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
