//! gcsimt - command-line driver for the gcsim garbage-collection simulator.
//!
//! Parses arguments with clap, sets up tracing output, loads `gcsimt.toml`
//! and dispatches to the subcommand handlers.

mod commands;
mod config;
mod error;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    run_compare, run_generate, run_perf, run_run, CompareArgs, GenerateArgs, PerfArgs, RunArgs,
};
use config::Config;

/// gcsimt - compare garbage-collection strategies on scripted object graphs
///
/// Scenarios are JSON files listing allocations, reference changes, root
/// changes, collections and leak scans. Each one can be run under
/// mark-sweep, reference counting or cascade deletion.
#[derive(Parser, Debug)]
#[command(name = "gcsimt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Garbage-collection strategy simulator", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, env = "GCSIMT_VERBOSE")]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "GCSIMT_CONFIG")]
    config: Option<PathBuf>,

    /// Disable color output
    #[arg(long, global = true, env = "GCSIMT_NO_COLOR", value_parser = clap::builder::BoolishValueParser::new())]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the gcsimt CLI.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run scenarios under one collector
    ///
    /// Accepts a scenario file or a directory of `.json` scenarios and
    /// prints a report for each.
    Run(RunCommand),

    /// Run one scenario under every collector
    Compare(CompareCommand),

    /// Run the performance suite
    ///
    /// Times linear, cyclic and tree workloads at each size and writes the
    /// results as JSON.
    Perf(PerfCommand),

    /// Write a generated scenario
    Generate(GenerateCommand),
}

/// Arguments for the run subcommand.
#[derive(Parser, Debug)]
struct RunCommand {
    /// Scenario file or directory
    scenario: PathBuf,

    /// Collector to use (mark-sweep, ref-count, cascade)
    #[arg(short = 'C', long)]
    collector: Option<String>,

    /// Heap capacity in bytes
    #[arg(long)]
    capacity: Option<usize>,

    /// Write events as JSON lines (a directory when running a directory)
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    /// Print the final heap
    #[arg(long)]
    dump: bool,
}

/// Arguments for the compare subcommand.
#[derive(Parser, Debug)]
struct CompareCommand {
    /// Scenario file
    scenario: PathBuf,

    /// Heap capacity in bytes
    #[arg(long)]
    capacity: Option<usize>,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the perf subcommand.
#[derive(Parser, Debug)]
struct PerfCommand {
    /// Object counts, comma separated (default: from config)
    #[arg(short, long, value_delimiter = ',')]
    sizes: Vec<usize>,

    /// Output directory (default: from config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only measure this collector
    #[arg(short = 'C', long)]
    collector: Option<String>,
}

/// Arguments for the generate subcommand.
#[derive(Parser, Debug)]
struct GenerateCommand {
    /// Generator (basic, cascade_chain, cycle_leak, linear_chain,
    /// cyclic_graph, cascade_tree, random)
    kind: String,

    /// Main dimension: objects, chain depth, cycle count or operations
    #[arg(short, long, default_value_t = 10)]
    size: usize,

    /// Seed for the random generator
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(short, long)]
    force: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.no_color)?;

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    execute_command(cli.command, cli.verbose, config)
}

/// Initialize the logging system.
///
/// Records from the simulator library, which logs through `log`, are
/// forwarded into the same subscriber.
fn init_logging(verbose: bool, no_color: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = fmt::layer()
        .with_ansi(!no_color)
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(config_path: Option<&Path>) -> error::Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

/// Execute the selected command.
fn execute_command(command: Commands, verbose: bool, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => {
            let run_args = RunArgs {
                scenario: args.scenario,
                collector: args.collector,
                capacity: args.capacity,
                events: args.events,
                json: args.json,
                dump: args.dump,
                verbose,
            };
            run_run(run_args, config).context("run failed")
        }
        Commands::Compare(args) => {
            let compare_args = CompareArgs {
                scenario: args.scenario,
                capacity: args.capacity,
                json: args.json,
                verbose,
            };
            run_compare(compare_args, config).context("compare failed")
        }
        Commands::Perf(args) => {
            let perf_args = PerfArgs {
                sizes: args.sizes,
                output: args.output,
                collector: args.collector,
            };
            run_perf(perf_args, config).context("perf failed")
        }
        Commands::Generate(args) => {
            let generate_args = GenerateArgs {
                kind: args.kind,
                size: args.size,
                seed: args.seed,
                output: args.output,
                force: args.force,
            };
            run_generate(generate_args, config).context("generate failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["gcsimt", "run", "scenario.json"]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.scenario, PathBuf::from("scenario.json"));
            assert!(args.collector.is_none());
            assert!(!args.json);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_with_options() {
        let cli = Cli::parse_from([
            "gcsimt", "run", "s.json", "-C", "rc", "--capacity", "4096", "--events", "e.jsonl",
            "--dump",
        ]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.collector, Some("rc".to_string()));
            assert_eq!(args.capacity, Some(4096));
            assert_eq!(args.events, Some(PathBuf::from("e.jsonl")));
            assert!(args.dump);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_compare_json() {
        let cli = Cli::parse_from(["gcsimt", "compare", "s.json", "--json"]);
        if let Commands::Compare(args) = cli.command {
            assert!(args.json);
        } else {
            panic!("Expected Compare command");
        }
    }

    #[test]
    fn test_cli_parse_perf_sizes() {
        let cli = Cli::parse_from(["gcsimt", "perf", "--sizes", "10,100,1000"]);
        if let Commands::Perf(args) = cli.command {
            assert_eq!(args.sizes, vec![10, 100, 1000]);
            assert!(args.output.is_none());
        } else {
            panic!("Expected Perf command");
        }
    }

    #[test]
    fn test_cli_parse_perf_defaults() {
        let cli = Cli::parse_from(["gcsimt", "perf"]);
        if let Commands::Perf(args) = cli.command {
            assert!(args.sizes.is_empty());
        } else {
            panic!("Expected Perf command");
        }
    }

    #[test]
    fn test_cli_parse_generate() {
        let cli = Cli::parse_from(["gcsimt", "generate", "random", "--size", "50", "--seed", "7"]);
        if let Commands::Generate(args) = cli.command {
            assert_eq!(args.kind, "random");
            assert_eq!(args.size, 50);
            assert_eq!(args.seed, 7);
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::parse_from([
            "gcsimt",
            "--verbose",
            "--no-color",
            "--config",
            "/path/to/gcsimt.toml",
            "compare",
            "s.json",
        ]);
        assert!(cli.verbose);
        assert!(cli.no_color);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/gcsimt.toml")));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["gcsimt"]).is_err());
    }
}
