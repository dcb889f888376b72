//! Command trait and common types for the gcsimt CLI.
//!
//! Every subcommand is a [`Command`]: built from its arguments and the
//! loaded configuration, then executed once.

use crate::config::Config;
use crate::error::Result;

/// Standard command trait that all gcsimt commands implement.
pub trait Command: Sized {
    /// The arguments type for this command.
    type Args;

    /// The output type returned by this command.
    type Output;

    /// Create a command instance, validating arguments against `config`.
    fn new(args: Self::Args, config: Config) -> Result<Self>;

    /// Execute the command.
    fn execute(&self) -> Result<Self::Output>;

    /// Get the command name.
    fn name() -> &'static str;
}

/// Command execution result with metadata.
#[derive(Debug, Clone)]
pub struct CommandResult<T> {
    /// The command output data.
    pub data: T,

    /// Number of items processed (scenarios, runs, files).
    pub items_processed: usize,

    /// Number of items with failures.
    pub items_failed: usize,

    /// Execution time in milliseconds.
    pub execution_time_ms: u64,

    /// Warning messages collected during execution.
    pub warnings: Vec<String>,
}

impl<T> CommandResult<T> {
    /// Create a new command result.
    pub fn success(data: T) -> Self {
        Self {
            data,
            items_processed: 0,
            items_failed: 0,
            execution_time_ms: 0,
            warnings: Vec::new(),
        }
    }

    /// Set the number of items processed.
    pub fn with_items_processed(mut self, count: usize) -> Self {
        self.items_processed = count;
        self
    }

    /// Set the number of items failed.
    pub fn with_items_failed(mut self, count: usize) -> Self {
        self.items_failed = count;
        self
    }

    /// Set the execution time.
    pub fn with_execution_time_ms(mut self, time_ms: u64) -> Self {
        self.execution_time_ms = time_ms;
        self
    }

    /// Add a warning message.
    pub fn with_warning(mut self, warning: String) -> Self {
        self.warnings.push(warning);
        self
    }

    /// Log collected warnings and a one-line summary.
    pub fn log_summary(&self, command: &str) {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
        tracing::info!(
            "{}: {} processed, {} with failures in {} ms",
            command,
            self.items_processed,
            self.items_failed,
            self.execution_time_ms
        );
    }
}
