//! Error handling module for the gcsimt CLI.
//!
//! Command handlers return [`CliError`]; `main` adds context with `anyhow`
//! before reporting.

use thiserror::Error;

/// Main error type for the gcsimt CLI application.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file missing, unreadable or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad command-line input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error reported by the simulator library.
    #[error("Simulation error: {0}")]
    Simulation(#[from] gcsim::GcError),

    /// Error when IO operations fail.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when JSON serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using CliError.
pub type Result<T> = std::result::Result<T, CliError>;
