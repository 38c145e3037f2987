//! Runtime configuration: defaults, optional TOML file, env overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state_cell::DEFAULT_STATE_BUFFER;

/// Quiet period required before a non-empty term is searched.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

pub const ENV_DEBOUNCE_MS: &str = "SOUND_SEARCH_DEBOUNCE_MS";
pub const ENV_STATE_BUFFER: &str = "SOUND_SEARCH_STATE_BUFFER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Configuration for the search view-model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Debounce window for non-empty terms, in milliseconds.
    pub debounce_ms: u64,
    /// How far a state subscriber may fall behind before values are skipped.
    pub state_buffer: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            state_buffer: DEFAULT_STATE_BUFFER,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Read `path` (or the default config file when it exists), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut cfg = match file {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Unparseable env values are ignored.
    fn apply_env(&mut self) {
        if let Ok(val) = dotenvy::var(ENV_DEBOUNCE_MS)
            && let Ok(ms) = val.parse::<u64>()
        {
            self.debounce_ms = ms;
        }

        if let Ok(val) = dotenvy::var(ENV_STATE_BUFFER)
            && let Ok(n) = val.parse::<usize>()
        {
            self.state_buffer = n;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "state_buffer",
                value: self.state_buffer.to_string(),
            });
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "sound-search", "sound-search")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
