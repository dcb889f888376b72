//! Configuration module for the gcsimt CLI.
//!
//! Settings come from `gcsimt.toml`; every section and field is optional
//! and command-line flags override what the file says.

use dirs::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use gcsim::{GcConfig, Strategy};

use crate::error::{CliError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "gcsimt.toml";

/// Application configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Collector settings.
    #[serde(default)]
    pub gc: GcSection,

    /// Event log settings.
    #[serde(default)]
    pub events: EventsConfig,

    /// Perf suite settings.
    #[serde(default)]
    pub perf: PerfConfig,
}

/// Collector settings, mapped onto [`GcConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GcSection {
    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Defaults to the capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,

    #[serde(default)]
    pub verbose: bool,
}

/// Event log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventsConfig {
    /// JSON lines file receiving every event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Add a wall-clock timestamp to each line.
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Also report events through the log output.
    #[serde(default)]
    pub log_events: bool,
}

/// Perf suite settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerfConfig {
    #[serde(default = "default_sizes")]
    pub sizes: Vec<usize>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_capacity() -> usize {
    gcsim::config::DEFAULT_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_sizes() -> Vec<usize> {
    vec![100, 1000]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("perf_results")
}

impl Default for GcSection {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            capacity: default_capacity(),
            threshold: None,
            verbose: false,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            timestamps: true,
            log_events: false,
        }
    }
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            sizes: default_sizes(),
            output_dir: default_output_dir(),
        }
    }
}

impl GcSection {
    /// Collector configuration described by this section
    pub fn to_gc_config(&self) -> GcConfig {
        let mut config = GcConfig::default()
            .with_strategy(self.strategy)
            .with_capacity(self.capacity);
        if let Some(threshold) = self.threshold {
            config = config.with_threshold(threshold);
        }
        config.verbose = self.verbose;
        config
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Searches for configuration in the following order:
    /// 1. Current directory
    /// 2. `~/.config/gcsimt`
    /// 3. System configuration directory
    ///
    /// Returns the default configuration if no config file is found.
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("Failed to parse configuration: {}", e)))?;

        config
            .gc
            .to_gc_config()
            .validate()
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize configuration: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    fn check_current_dir_config() -> Option<PathBuf> {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }

    fn check_home_config() -> Option<PathBuf> {
        home_dir()
            .map(|dir| dir.join(".config").join("gcsimt").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn check_system_config() -> Option<PathBuf> {
        config_dir()
            .map(|dir| dir.join("gcsimt").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn find_config_file() -> Option<PathBuf> {
        Self::check_current_dir_config()
            .or_else(Self::check_home_config)
            .or_else(Self::check_system_config)
    }
}
