//! Common types and utilities for gcsimt commands.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use gcsim::{
    BoxedSink, FanoutSink, GcConfig, JsonLinesSink, LogSink, NullSink, Scenario,
    SimulationReport, Strategy,
};

use crate::config::{Config, EventsConfig};
use crate::error::{CliError, Result};

// ============================================================================
// Strategy and Configuration
// ============================================================================

/// Parse a collector name given on the command line.
pub fn parse_strategy(name: &str) -> Result<Strategy> {
    name.parse::<Strategy>()
        .map_err(|e| CliError::Validation(e.to_string()))
}

/// Effective collector configuration for one scenario.
///
/// Precedence, highest first: command-line flags, the scenario's own hints,
/// the configuration file.
pub fn effective_gc_config(
    config: &Config,
    scenario: &Scenario,
    collector: Option<Strategy>,
    capacity: Option<usize>,
) -> Result<GcConfig> {
    let mut gc = config.gc.to_gc_config();

    if let Some(strategy) = collector.or(scenario.collector) {
        gc = gc.with_strategy(strategy);
    }
    if let Some(capacity) = capacity.or(scenario.capacity) {
        gc = gc.with_capacity(capacity);
        // A configured threshold outlives the capacity change, capped by it.
        if let Some(threshold) = config.gc.threshold {
            gc = gc.with_threshold(threshold.min(capacity));
        }
    }

    gc.validate()
        .map_err(|e| CliError::Validation(format!("{}: {}", scenario.name, e)))?;
    Ok(gc)
}

// ============================================================================
// Scenario Input
// ============================================================================

/// Load one scenario file, or every scenario in a directory.
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    if !path.exists() {
        return Err(CliError::Validation(format!(
            "{} {}",
            error_messages::SCENARIO_NOT_FOUND,
            path.display()
        )));
    }

    let scenarios = if path.is_dir() {
        Scenario::load_dir(path)?
    } else {
        vec![Scenario::load(path)?]
    };
    Ok(scenarios)
}

// ============================================================================
// Event Sinks
// ============================================================================

/// Build the event sink for one run.
///
/// `log_file` overrides the configured file. An unusable file degrades to
/// no file logging with a warning.
pub fn event_sink(events: &EventsConfig, log_file: Option<&Path>, verbose: bool) -> BoxedSink {
    let mut fanout = FanoutSink::new();

    if let Some(path) = log_file.or(events.log_file.as_deref()) {
        fanout.push(JsonLinesSink::open_or_null(path, events.timestamps));
    }
    if events.log_events || verbose {
        fanout.push(Box::new(LogSink::new()));
    }

    if fanout.is_empty() {
        Box::new(NullSink)
    } else {
        Box::new(fanout)
    }
}

/// Event file for one scenario when several are run at once.
pub fn per_scenario_log(dir: &Path, scenario: &Scenario) -> PathBuf {
    dir.join(format!("{}.jsonl", scenario.name))
}

// ============================================================================
// Report Formatting
// ============================================================================

/// Side-by-side table of reports for the same scenario.
pub fn comparison_table(reports: &[SimulationReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>6} {:>8} {:>10} {:>10} {:>8} {:>8}",
        "Strategy", "Alive", "Used (B)", "Collected", "Freed (B)", "Leaked", "Failed"
    );
    let _ = writeln!(out, "{}", "-".repeat(68));
    for report in reports {
        let _ = writeln!(
            out,
            "{:<12} {:>6} {:>8} {:>10} {:>10} {:>8} {:>8}",
            report.strategy.as_str(),
            report.alive_objects,
            report.used_bytes,
            report.stats.objects_collected,
            report.stats.bytes_freed,
            report.leaked.len(),
            report.failures
        );
    }
    out
}

// ============================================================================
// Messages
// ============================================================================

/// Standard error message templates.
pub mod error_messages {
    pub const SCENARIO_NOT_FOUND: &str = "Scenario path does not exist:";

    pub const EMPTY_SIZES: &str = "At least one size is required";

    pub const ZERO_SIZE: &str = "Sizes must be greater than zero";
}

/// Standard output message templates.
pub mod output_messages {
    pub const WROTE_FILE: &str = "Wrote";

    pub const FAILED_STEP: &str = "failed";
}
