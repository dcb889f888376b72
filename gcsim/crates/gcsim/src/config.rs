//! Configuration Module - Simulation Parameters
//!
//! Manages the parameters that shape a collector instance: which strategy
//! runs, how large the simulated heap is and when allocation pressure
//! forces a collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Collection strategy, selected once when the collector is constructed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Reachability from roots, reclaims cycles
    #[default]
    MarkSweep,
    /// Per-object counts with eager cascade on zero
    #[serde(alias = "rc", alias = "reference_counting")]
    RefCount,
    /// Orphan detection with reactive and batched cascade
    #[serde(alias = "orphan")]
    Cascade,
}

impl Strategy {
    /// All strategies, in comparison order
    pub const ALL: [Strategy; 3] = [Strategy::MarkSweep, Strategy::RefCount, Strategy::Cascade];

    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::MarkSweep => "mark_sweep",
            Strategy::RefCount => "ref_count",
            Strategy::Cascade => "cascade",
        }
    }

    /// Whether the strategy can reclaim unreachable cycles
    pub fn reclaims_cycles(&self) -> bool {
        matches!(self, Strategy::MarkSweep)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "mark_sweep" | "marksweep" | "ms" => Ok(Strategy::MarkSweep),
            "ref_count" | "refcount" | "reference_counting" | "rc" => Ok(Strategy::RefCount),
            "cascade" | "orphan" => Ok(Strategy::Cascade),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Main configuration for a collector instance
///
/// # Examples
///
/// ```rust
/// use gcsim::{GcConfig, Strategy};
///
/// let config = GcConfig {
///     strategy: Strategy::RefCount,
///     capacity: 4 * 1024,
///     ..Default::default()
/// };
/// assert!(config.validate().is_err()); // threshold still at the 1 MiB default
///
/// let config = GcConfig::default()
///     .with_strategy(Strategy::RefCount)
///     .with_capacity(4 * 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcConfig {
    /// Collection strategy
    ///
    /// Default: Mark-Sweep
    pub strategy: Strategy,

    /// Simulated heap capacity in bytes
    ///
    /// Hard limit; allocation fails with OOM beyond it.
    /// Default: 1MB
    pub capacity: usize,

    /// Allocation pressure threshold in bytes
    ///
    /// An allocation that would push used bytes past this value triggers one
    /// automatic collection first. Must be in `1..=capacity`.
    /// Default: capacity
    pub collection_threshold: usize,

    /// Enable verbose per-operation logging
    ///
    /// Default: false
    pub verbose: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            strategy: Strategy::MarkSweep,

            // Heap
            capacity: DEFAULT_CAPACITY,
            collection_threshold: DEFAULT_CAPACITY,

            // Debug
            verbose: false,
        }
    }
}

impl GcConfig {
    /// Select a strategy
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set capacity, keeping the threshold pinned to it
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self.collection_threshold = capacity;
        self
    }

    /// Set the allocation pressure threshold
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.collection_threshold = threshold;
        self
    }

    /// Validate configuration
    ///
    /// Checks if all values are in valid ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity(
                "capacity must be > 0".to_string(),
            ));
        }

        if self.collection_threshold == 0 || self.collection_threshold > self.capacity {
            return Err(ConfigError::InvalidThreshold(format!(
                "collection_threshold must be between 1 and capacity ({}), got {}",
                self.capacity, self.collection_threshold
            )));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - GCSIM_STRATEGY (`mark_sweep`, `ref_count`, `cascade`)
    /// - GCSIM_CAPACITY
    /// - GCSIM_THRESHOLD
    /// - GCSIM_VERBOSE
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GCSIM_STRATEGY") {
            if let Ok(strategy) = val.parse::<Strategy>() {
                config.strategy = strategy;
            }
        }

        if let Ok(val) = std::env::var("GCSIM_CAPACITY") {
            if let Ok(size) = val.parse::<usize>() {
                config = config.with_capacity(size);
            }
        }

        if let Ok(val) = std::env::var("GCSIM_THRESHOLD") {
            if let Ok(size) = val.parse::<usize>() {
                config.collection_threshold = size;
            }
        }

        if let Ok(val) = std::env::var("GCSIM_VERBOSE") {
            config.verbose = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),

    #[error("Invalid collection threshold: {0}")]
    InvalidThreshold(String),

    #[error("Unknown collection strategy: {0}")]
    UnknownStrategy(String),
}

// ============================================================================
// CONSTANTS
// ============================================================================

/// 1 Kilobyte
pub const KB: usize = 1024;

/// 1 Megabyte
pub const MB: usize = 1024 * KB;

/// Default simulated heap capacity
pub const DEFAULT_CAPACITY: usize = MB;
