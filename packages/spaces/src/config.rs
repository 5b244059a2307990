//! Process configuration.
//!
//! Loaded once at startup from a JSON file; every field has a default so a
//! missing or partial file still yields a runnable configuration.

use std::fs;
use std::path::{Path, PathBuf};

use placehub_core::DEFAULT_CELLS_PER_DEGREE;
use serde::Deserialize;

/// Errors loading the configuration file.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base directory for all on-disk state.
    pub base_dir: PathBuf,
    /// Keep all state in memory (tests, throwaway deployments).
    pub memfs: bool,
    /// Per-namespace subdirectories under `base_dir`.
    pub dirs: Dirs,
    /// Geospatial bucketing.
    pub map: MapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dirs {
    pub users: String,
    pub map: String,
    pub feedbacks: String,
    pub reports: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    /// Quantization cells per degree; 1024 gives ~100 m cells.
    pub cells_per_degree: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_dir: PathBuf::from("./data"),
            memfs: false,
            dirs: Dirs::default(),
            map: MapConfig::default(),
        }
    }
}

impl Default for Dirs {
    fn default() -> Self {
        Dirs {
            users: "kvs/user".to_string(),
            map: "kvs/map".to_string(),
            feedbacks: "kvs/feedbacks".to_string(),
            reports: "kvs/reports".to_string(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            cells_per_degree: DEFAULT_CELLS_PER_DEGREE,
        }
    }
}

impl Config {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// An in-memory configuration for tests.
    pub fn memfs() -> Config {
        Config {
            memfs: true,
            ..Config::default()
        }
    }
}
