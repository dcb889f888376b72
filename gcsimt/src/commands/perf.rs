//! Perf command implementation.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use gcsim::{PerfSuite, Strategy};

use crate::commands::common::{self, error_messages, output_messages};
use crate::commands::traits::{Command, CommandResult};
use crate::config::Config;
use crate::error::{CliError, Result};

/// Arguments for the perf command.
#[derive(Debug, Clone, Default)]
pub struct PerfArgs {
    /// Object counts per workload (default: from config).
    pub sizes: Vec<usize>,
    /// Output directory (default: from config).
    pub output: Option<PathBuf>,
    pub collector: Option<String>,
}

/// Perf command handler.
pub struct PerfCommand {
    sizes: Vec<usize>,
    output_dir: PathBuf,
    strategies: Vec<Strategy>,
}

impl Command for PerfCommand {
    type Args = PerfArgs;
    type Output = CommandResult<PathBuf>;

    fn new(args: Self::Args, config: Config) -> Result<Self> {
        let sizes = if args.sizes.is_empty() {
            config.perf.sizes.clone()
        } else {
            args.sizes
        };
        if sizes.is_empty() {
            return Err(CliError::Validation(error_messages::EMPTY_SIZES.to_string()));
        }
        if sizes.contains(&0) {
            return Err(CliError::Validation(error_messages::ZERO_SIZE.to_string()));
        }

        let strategies = match args.collector.as_deref() {
            Some(name) => vec![common::parse_strategy(name)?],
            None => Strategy::ALL.to_vec(),
        };

        Ok(Self {
            sizes,
            output_dir: args.output.unwrap_or(config.perf.output_dir),
            strategies,
        })
    }

    fn execute(&self) -> Result<Self::Output> {
        let start_time = Instant::now();
        let report = PerfSuite::new()
            .with_sizes(self.sizes.clone())
            .with_strategies(self.strategies.clone())
            .run()?;

        let path = self.output_dir.join(format!(
            "perf_results_{}.json",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        report.save_json(&path)?;

        print!("{}", report.summary_table());
        println!();
        println!("{} {}", output_messages::WROTE_FILE, path.display());

        Ok(CommandResult::success(path)
            .with_items_processed(report.results.len())
            .with_execution_time_ms(start_time.elapsed().as_millis() as u64))
    }

    fn name() -> &'static str {
        "perf"
    }
}

/// Run the perf command.
pub fn run_perf(args: PerfArgs, config: Config) -> Result<()> {
    let command = PerfCommand::new(args, config)?;
    command.execute()?.log_summary(PerfCommand::name());
    Ok(())
}
