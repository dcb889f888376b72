//! Run command implementation.
//!
//! Runs one scenario file, or every scenario in a directory, under a single
//! collector and prints a report per scenario.

use std::path::PathBuf;
use std::time::Instant;

use gcsim::{Collector, GarbageCollector, Scenario, SimulationReport, Simulator, Strategy};

use crate::commands::common::{self, output_messages};
use crate::commands::traits::{Command, CommandResult};
use crate::config::Config;
use crate::error::Result;

/// Arguments for the run command.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub scenario: PathBuf,
    pub collector: Option<String>,
    pub capacity: Option<usize>,
    /// Event log file, or a directory when running a scenario directory.
    pub events: Option<PathBuf>,
    pub json: bool,
    pub dump: bool,
    pub verbose: bool,
}

/// Run command handler.
pub struct RunCommand {
    args: RunArgs,
    config: Config,
    collector: Option<Strategy>,
}

impl RunCommand {
    fn run_one(&self, scenario: &Scenario, batch: bool) -> Result<SimulationReport> {
        let gc_config =
            common::effective_gc_config(&self.config, scenario, self.collector, self.args.capacity)?;

        let log_file = self.args.events.as_ref().map(|path| {
            if batch {
                common::per_scenario_log(path, scenario)
            } else {
                path.clone()
            }
        });
        let sink = common::event_sink(&self.config.events, log_file.as_deref(), self.args.verbose);

        let mut simulator = Simulator::new(GarbageCollector::new(gc_config, sink)?);
        let report = simulator.run(scenario);

        if self.args.dump {
            println!("{}", simulator.collector().heap().snapshot());
        }
        simulator.collector_mut().close_events()?;
        Ok(report)
    }

    fn print_report(&self, report: &SimulationReport) {
        println!("{}", report);
        for record in report.failed_steps() {
            if let gcsim::StepOutcome::Failed { error } = &record.outcome {
                println!(
                    "  step {} ({}) {}: {}",
                    record.step,
                    record.operation,
                    output_messages::FAILED_STEP,
                    error
                );
            }
        }
        println!();
    }
}

impl Command for RunCommand {
    type Args = RunArgs;
    type Output = CommandResult<Vec<SimulationReport>>;

    fn new(args: Self::Args, config: Config) -> Result<Self> {
        let collector = args
            .collector
            .as_deref()
            .map(common::parse_strategy)
            .transpose()?;
        Ok(Self {
            args,
            config,
            collector,
        })
    }

    fn execute(&self) -> Result<Self::Output> {
        let start_time = Instant::now();
        let scenarios = common::load_scenarios(&self.args.scenario)?;
        let batch = self.args.scenario.is_dir();

        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in &scenarios {
            tracing::info!("running scenario '{}'", scenario.name);
            reports.push(self.run_one(scenario, batch)?);
        }

        if self.args.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            for report in &reports {
                self.print_report(report);
            }
        }

        let failed = reports.iter().filter(|report| report.failures > 0).count();
        let mut result = CommandResult::success(Vec::new())
            .with_items_processed(reports.len())
            .with_items_failed(failed)
            .with_execution_time_ms(start_time.elapsed().as_millis() as u64);
        for report in reports.iter().filter(|report| report.failures > 0) {
            result = result.with_warning(format!(
                "scenario '{}': {} operations failed",
                report.scenario, report.failures
            ));
        }
        result.data = reports;
        Ok(result)
    }

    fn name() -> &'static str {
        "run"
    }
}

/// Run the run command.
pub fn run_run(args: RunArgs, config: Config) -> Result<()> {
    let command = RunCommand::new(args, config)?;
    command.execute()?.log_summary(RunCommand::name());
    Ok(())
}
