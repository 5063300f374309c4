use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod types;

pub use types::*;

pub const DEFAULT_CONFIG_PATHS: &[&str] = &["floorsweep.toml", "config/floorsweep.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub fn load_config(path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let candidate_paths = match path {
        Some(p) => vec![p],
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<PathBuf>>(),
    };

    for candidate in candidate_paths {
        if let Some(config) = try_load_file(&candidate)? {
            return Ok(config);
        }
    }

    Ok(AppConfig::default())
}

fn try_load_file(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(config))
}

pub(crate) fn default_api_base() -> String {
    "https://api-goerli.reservoir.tools".to_string()
}

pub(crate) fn default_request_timeout_ms() -> u64 {
    10_000
}

pub(crate) fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

pub(crate) fn default_receipt_poll_ms() -> u64 {
    2_000
}

pub(crate) fn default_receipt_max_attempts() -> u32 {
    150
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    5_000
}

pub(crate) fn default_poll_max_attempts() -> u32 {
    120
}

pub(crate) fn default_logging_level() -> String {
    "info".to_string()
}
