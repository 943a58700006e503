use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_TOKENS, DEFAULT_REQUEST_RATE, TICK_RATE_MS};
use crate::control::ControlState;
use crate::error::{ConsoleError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling period in milliseconds
    pub tick_rate_ms: u64,
    /// Fixed RNG seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
    pub controls: ControlsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub request_rate: i64,
    pub batch_size: i64,
    pub max_tokens: i64,
    pub generating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file used while the terminal UI owns the screen
    pub file: PathBuf,
    /// Default filter when RUST_LOG is unset
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_ms: TICK_RATE_MS,
            seed: None,
            controls: ControlsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            request_rate: i64::from(DEFAULT_REQUEST_RATE),
            batch_size: i64::from(DEFAULT_BATCH_SIZE),
            max_tokens: i64::from(DEFAULT_MAX_TOKENS),
            generating: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("serving_console.log"),
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConsoleError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    /// Reads `path` if it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn initial_controls(&self) -> ControlState {
        let c = &self.controls;
        ControlState::new(c.request_rate, c.batch_size, c.max_tokens, c.generating)
    }
}

impl std::str::FromStr for Config {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
