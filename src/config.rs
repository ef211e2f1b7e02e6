//! `config.toml` loading
//!
//! ```toml
//! [application]
//! symbols = ["BTCUSDT", "ETHUSDT"]
//! refresh_interval_seconds = 5
//!
//! [volume_profile]
//! value_area_percentage = 70.0
//!
//! [logging]
//! level_filter = "info,depth_profiler=debug"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::Deserialize;
use thiserror::Error;

use crate::common::constants::{
    BINANCE_API_BASE_URL, DEFAULT_DEPTH_LIMIT, DEFAULT_REFRESH_INTERVAL_SECONDS, DEFAULT_SYMBOL,
    DEFAULT_TRADE_LIMIT, MAX_DEPTH_LIMIT, MAX_TRADE_LIMIT,
};
use crate::logging::{LogRotation, LoggingConfig};
use crate::volume_profile::{RefreshSettings, VolumeProfileConfig};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "DEPTH_PROFILER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// `[application]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub symbols: Vec<String>,
    pub base_url: String,
    pub depth_limit: u32,
    pub trade_limit: u32,
    /// 0 disables the periodic refresh
    pub refresh_interval_seconds: u64,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            symbols: vec![DEFAULT_SYMBOL.to_string()],
            base_url: BINANCE_API_BASE_URL.to_string(),
            depth_limit: DEFAULT_DEPTH_LIMIT,
            trade_limit: DEFAULT_TRADE_LIMIT,
            refresh_interval_seconds: DEFAULT_REFRESH_INTERVAL_SECONDS,
        }
    }
}

impl ApplicationConfig {
    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            depth_limit: self.depth_limit,
            trade_limit: self.trade_limit,
            refresh_interval: (self.refresh_interval_seconds > 0)
                .then(|| Duration::from_secs(self.refresh_interval_seconds)),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }
        if self.depth_limit == 0 || self.depth_limit > MAX_DEPTH_LIMIT {
            return Err(format!("depth_limit must be between 1 and {}", MAX_DEPTH_LIMIT));
        }
        if self.trade_limit == 0 || self.trade_limit > MAX_TRADE_LIMIT {
            return Err(format!("trade_limit must be between 1 and {}", MAX_TRADE_LIMIT));
        }
        if let Some(bad) = self.symbols.iter().find(|s| s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric())) {
            return Err(format!("invalid symbol '{}'", bad));
        }
        Ok(())
    }
}

/// `[logging]` section, every key optional
#[derive(Debug, Clone, Default, Deserialize)]
struct LoggingTomlConfig {
    log_dir: Option<String>,
    level_filter: Option<String>,
    rotation: Option<String>,
    console_timestamps: Option<bool>,
    file_json_format: Option<bool>,
    cleanup_days: Option<u32>,
}

impl From<LoggingTomlConfig> for LoggingConfig {
    fn from(toml: LoggingTomlConfig) -> Self {
        let defaults = LoggingConfig::default();
        Self {
            log_dir: toml.log_dir.unwrap_or(defaults.log_dir),
            level_filter: toml.level_filter.unwrap_or(defaults.level_filter),
            rotation: toml.rotation.as_deref().map(LogRotation::parse).unwrap_or(defaults.rotation),
            console_timestamps: toml.console_timestamps.unwrap_or(defaults.console_timestamps),
            file_json_format: toml.file_json_format.unwrap_or(defaults.file_json_format),
            cleanup_days: toml.cleanup_days.unwrap_or(defaults.cleanup_days),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    application: ApplicationConfig,
    #[serde(default)]
    volume_profile: VolumeProfileConfig,
    #[serde(default)]
    logging: LoggingTomlConfig,
}

/// Fully resolved application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub application: ApplicationConfig,
    pub volume_profile: VolumeProfileConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let toml_config: TomlConfig = toml::from_str(content)?;
        let config = Self::from_toml_config(toml_config);
        config.validate()?;
        Ok(config)
    }

    /// Path from `DEPTH_PROFILER_CONFIG`, falling back to `config.toml`
    pub fn resolve_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    fn from_toml_config(toml_config: TomlConfig) -> Self {
        let mut application = toml_config.application;
        let mut seen = FxHashSet::default();
        application.symbols = application
            .symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();
        if application.symbols.is_empty() {
            application.symbols = vec![DEFAULT_SYMBOL.to_string()];
        }

        Self {
            application,
            volume_profile: toml_config.volume_profile,
            logging: toml_config.logging.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.application
            .validate()
            .map_err(|e| ConfigError::Validation(format!("application: {}", e)))?;
        self.volume_profile
            .validate()
            .map_err(|e| ConfigError::Validation(format!("volume_profile: {}", e)))?;
        Ok(())
    }
}
