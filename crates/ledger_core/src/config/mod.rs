use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "PROOF_LEDGER_CONFIG_PATH";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot location; `PROOF_LEDGER_STORE_PATH` still takes precedence.
    #[serde(default)]
    pub store_path: Option<String>,
    /// Append-only JSON-lines file that receives ledger notifications.
    #[serde(default)]
    pub event_log_path: Option<String>,
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Config {
    pub fn log_filter_or_default(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<LedgerError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub store_path: Option<String>,
    pub event_log_path: Option<String>,
    pub log_filter: Option<String>,
}

pub fn config_path() -> Result<PathBuf, LedgerError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| LedgerError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("proof_ledger")
            .join(CONFIG_FILE_NAME))
    } else {
        let home =
            std::env::var("HOME").map_err(|_| LedgerError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("proof_ledger")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

pub(crate) fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

pub fn load_config_from_path(path: &Path) -> Result<Config, LedgerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| LedgerError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        LedgerError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config(config))
}

fn normalize_config(config: Config) -> Config {
    Config {
        store_path: non_blank(config.store_path),
        event_log_path: non_blank(config.event_log_path),
        log_filter: non_blank(config.log_filter),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(store_path) = non_blank(overrides.store_path.clone()) {
        merged.store_path = Some(store_path);
    }
    if let Some(event_log_path) = non_blank(overrides.event_log_path.clone()) {
        merged.event_log_path = Some(event_log_path);
    }
    if let Some(log_filter) = non_blank(overrides.log_filter.clone()) {
        merged.log_filter = Some(log_filter);
    }
    merged
}
