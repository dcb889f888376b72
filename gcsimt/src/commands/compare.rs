//! Compare command implementation.
//!
//! Runs one scenario under every collector and prints the results side by
//! side.

use std::path::PathBuf;
use std::time::Instant;

use gcsim::{simulator, BoxedSink, NullSink, SimulationReport};

use crate::commands::common;
use crate::commands::traits::{Command, CommandResult};
use crate::config::Config;
use crate::error::{CliError, Result};

/// Arguments for the compare command.
#[derive(Debug, Clone, Default)]
pub struct CompareArgs {
    pub scenario: PathBuf,
    pub capacity: Option<usize>,
    pub json: bool,
    pub verbose: bool,
}

/// Compare command handler.
pub struct CompareCommand {
    args: CompareArgs,
    config: Config,
}

impl Command for CompareCommand {
    type Args = CompareArgs;
    type Output = CommandResult<Vec<SimulationReport>>;

    fn new(args: Self::Args, config: Config) -> Result<Self> {
        if args.scenario.is_dir() {
            return Err(CliError::Validation(format!(
                "compare takes a single scenario file, got directory {}",
                args.scenario.display()
            )));
        }
        Ok(Self { args, config })
    }

    fn execute(&self) -> Result<Self::Output> {
        let start_time = Instant::now();
        let mut scenarios = common::load_scenarios(&self.args.scenario)?;
        let mut scenario = scenarios.remove(0);

        let base = common::effective_gc_config(&self.config, &scenario, None, self.args.capacity)?;
        // Already folded into `base`; the runner would reapply it and reset
        // the threshold.
        scenario.capacity = None;

        let events = &self.config.events;
        let verbose = self.args.verbose;
        let reports = simulator::compare_with(&scenario, &base, |strategy| -> BoxedSink {
            if events.log_file.is_some() || events.log_events || verbose {
                tracing::debug!("event sink enabled for {}", strategy);
                common::event_sink(events, None, verbose)
            } else {
                Box::new(NullSink)
            }
        })?;

        if self.args.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            println!("Scenario: {}", scenario.name);
            if !scenario.description.is_empty() {
                println!("{}", scenario.description);
            }
            println!();
            print!("{}", common::comparison_table(&reports));
        }

        let failed = reports.iter().filter(|report| report.failures > 0).count();
        Ok(CommandResult::success(reports)
            .with_items_processed(1)
            .with_items_failed(failed)
            .with_execution_time_ms(start_time.elapsed().as_millis() as u64))
    }

    fn name() -> &'static str {
        "compare"
    }
}

/// Run the compare command.
pub fn run_compare(args: CompareArgs, config: Config) -> Result<()> {
    let command = CompareCommand::new(args, config)?;
    command.execute()?.log_summary(CompareCommand::name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcsim::scenario::generate;
    use gcsim::Strategy;
    use tempfile::TempDir;

    #[test]
    fn test_compare_runs_every_strategy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cycle.json");
        generate::cycle_leak(1).save(&path).unwrap();

        let args = CompareArgs {
            scenario: path,
            ..Default::default()
        };
        let result = CompareCommand::new(args, Config::default())
            .unwrap()
            .execute()
            .unwrap();

        let strategies: Vec<Strategy> = result.data.iter().map(|r| r.strategy).collect();
        assert_eq!(strategies, Strategy::ALL.to_vec());

        let mark_sweep = &result.data[0];
        assert_eq!(mark_sweep.alive_objects, 0);
        assert!(mark_sweep.leaked.is_empty());
        for report in &result.data[1..] {
            assert_eq!(report.leaked.len(), 2);
        }
    }

    #[test]
    fn test_capacity_flag_overrides_scenario_hint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hinted.json");
        let mut scenario = generate::linear_chain(4);
        scenario.capacity = Some(64);
        scenario.save(&path).unwrap();

        let args = CompareArgs {
            scenario: path,
            capacity: Some(4096),
            ..Default::default()
        };
        let result = CompareCommand::new(args, Config::default())
            .unwrap()
            .execute()
            .unwrap();

        assert!(result.data.iter().all(|r| r.failures == 0));
        assert!(result.data.iter().all(|r| r.used_bytes + r.free_bytes == 4096));
    }

    #[test]
    fn test_configured_threshold_applies_to_every_strategy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.json");
        let mut scenario = generate::linear_chain(10);
        scenario.capacity = Some(640);
        scenario.save(&path).unwrap();

        let mut config = Config::default();
        config.gc.threshold = Some(200);
        let args = CompareArgs {
            scenario: path,
            ..Default::default()
        };
        let result = CompareCommand::new(args, config).unwrap().execute().unwrap();

        for report in &result.data {
            assert_eq!(report.failures, 0);
            assert!(report.stats.collections_run > 2, "{}", report.strategy);
        }
    }

    #[test]
    fn test_directory_rejected() {
        let dir = TempDir::new().unwrap();
        let args = CompareArgs {
            scenario: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(CompareCommand::new(args, Config::default()).is_err());
    }
}
