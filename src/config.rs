//! Application configuration.
//!
//! Precedence: explicit path > `DOCSYNC_CONFIG` > `./docsync.toml` > defaults,
//! then `DOCSYNC_*` environment overrides for individual knobs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::StoreError;

const MODULE_NAME: &str = "CONFIG";

pub const DEFAULT_STREAM: &str = "TRUSTEE_APPOINTMENTS_SYNC_STATE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub legacy: LegacyDbConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Target database for all business and runtime-state collections.
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { database: "cams".to_string() }
    }
}

/// Connection settings handed to the legacy source gateway.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyDbConfig {
    pub server: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for LegacyDbConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            database: "dxtr".to_string(),
            user: None,
            password: None,
            request_timeout_ms: 15_000,
        }
    }
}

impl std::fmt::Debug for LegacyDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyDbConfig")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Watermark stream name (the runtime-state `documentType`).
    pub stream: String,
    /// Watermark used when the stream has no runtime-state record yet.
    pub starting_tx_id: String,
    /// Maximum number of legacy rows pulled per run.
    pub page_size: usize,
    /// Maximum number of cases processed concurrently.
    pub max_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stream: DEFAULT_STREAM.to_string(),
            starting_tx_id: "0".to_string(),
            page_size: 1000,
            max_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), dir: None, config_file: None }
    }
}

impl AppConfig {
    /// # Errors
    /// `ServerConfig` when the TOML is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self, StoreError> {
        toml::from_str(s).map_err(|e| StoreError::server_config(MODULE_NAME, format!("invalid config: {e}")))
    }

    /// Loads configuration from the first existing candidate file, applies
    /// environment overrides and validates the result.
    ///
    /// # Errors
    /// `ServerConfig` when a file cannot be read or parsed, or validation fails.
    pub fn load(explicit: Option<&Path>) -> Result<Self, StoreError> {
        let mut cfg = Self::default();
        for path in candidate_paths(explicit) {
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|e| {
                StoreError::server_config(MODULE_NAME, format!("cannot read {}: {e}", path.display()))
            })?;
            cfg = Self::from_toml_str(&text)?;
            log::info!("loaded configuration from {}", path.display());
            break;
        }
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Applies `DOCSYNC_*` overrides obtained through `lookup`.
    ///
    /// # Errors
    /// `ServerConfig` when a numeric override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DOCSYNC_DATABASE") {
            self.store.database = v;
        }
        if let Some(v) = lookup("DOCSYNC_SYNC_STREAM") {
            self.sync.stream = v;
        }
        if let Some(v) = lookup("DOCSYNC_SYNC_STARTING_TX_ID") {
            self.sync.starting_tx_id = v;
        }
        if let Some(v) = lookup("DOCSYNC_SYNC_PAGE_SIZE") {
            self.sync.page_size = parse_num("DOCSYNC_SYNC_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("DOCSYNC_SYNC_CONCURRENCY") {
            self.sync.max_concurrency = parse_num("DOCSYNC_SYNC_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("DOCSYNC_LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    /// # Errors
    /// `ServerConfig` describing the first invalid setting.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.store.database.trim().is_empty() {
            return Err(StoreError::server_config(MODULE_NAME, "store.database is not configured"));
        }
        if self.sync.stream.trim().is_empty() {
            return Err(StoreError::server_config(MODULE_NAME, "sync.stream is not configured"));
        }
        if self.sync.starting_tx_id.parse::<i64>().is_err() {
            return Err(StoreError::server_config(
                MODULE_NAME,
                format!("sync.starting_tx_id is not numeric: {}", self.sync.starting_tx_id),
            ));
        }
        if self.sync.page_size == 0 || self.sync.max_concurrency == 0 {
            return Err(StoreError::server_config(
                MODULE_NAME,
                "sync.page_size and sync.max_concurrency must be positive",
            ));
        }
        Ok(())
    }
}

fn parse_num(key: &str, raw: &str) -> Result<usize, StoreError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| StoreError::server_config(MODULE_NAME, format!("{key}={raw}: {e}")))
}

fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("DOCSYNC_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("docsync.toml"));
    }
    paths
}
