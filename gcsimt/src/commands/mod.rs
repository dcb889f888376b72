//! Command modules for the gcsimt CLI.
//!
//! Each subcommand lives in its own file and follows the same pattern: an
//! `*Args` struct, a handler implementing [`traits::Command`] and a `run_*`
//! entry point used by `main`.

pub mod traits;
pub mod common;

pub mod run;
pub mod compare;
pub mod perf;
pub mod generate;

// Re-export command types and functions
pub use run::{RunArgs, run_run};
pub use compare::{CompareArgs, run_compare};
pub use perf::{PerfArgs, run_perf};
pub use generate::{GenerateArgs, run_generate};
