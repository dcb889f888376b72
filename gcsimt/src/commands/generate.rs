//! Generate command implementation.
//!
//! Writes a generated scenario as JSON, to a file or to stdout.

use std::path::PathBuf;

use gcsim::scenario::Generator;
use gcsim::Scenario;

use crate::commands::common::output_messages;
use crate::commands::traits::{Command, CommandResult};
use crate::config::Config;
use crate::error::{CliError, Result};

/// Arguments for the generate command.
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub kind: String,
    pub size: usize,
    pub seed: u64,
    /// Output file (default: stdout).
    pub output: Option<PathBuf>,
    pub force: bool,
}

impl Default for GenerateArgs {
    fn default() -> Self {
        Self {
            kind: Generator::Basic.as_str().to_string(),
            size: 10,
            seed: 42,
            output: None,
            force: false,
        }
    }
}

/// Generate command handler.
pub struct GenerateCommand {
    args: GenerateArgs,
    generator: Generator,
}

impl Command for GenerateCommand {
    type Args = GenerateArgs;
    type Output = CommandResult<Scenario>;

    fn new(args: Self::Args, _config: Config) -> Result<Self> {
        let generator = args.kind.parse::<Generator>()?;
        if args.size == 0 {
            return Err(CliError::Validation("size must be greater than zero".to_string()));
        }
        if let Some(output) = &args.output {
            if output.exists() && !args.force {
                return Err(CliError::Validation(format!(
                    "{} already exists (use --force to overwrite)",
                    output.display()
                )));
            }
        }
        Ok(Self { args, generator })
    }

    fn execute(&self) -> Result<Self::Output> {
        let scenario = self.generator.generate(self.args.size, self.args.seed);
        tracing::debug!(
            "generated '{}' with {} operations",
            scenario.name,
            scenario.operations.len()
        );

        match &self.args.output {
            Some(path) => {
                scenario.save(path)?;
                println!("{} {}", output_messages::WROTE_FILE, path.display());
            }
            None => println!("{}", scenario.to_json_pretty()?),
        }

        Ok(CommandResult::success(scenario).with_items_processed(1))
    }

    fn name() -> &'static str {
        "generate"
    }
}

/// Run the generate command.
pub fn run_generate(args: GenerateArgs, config: Config) -> Result<()> {
    let command = GenerateCommand::new(args, config)?;
    command.execute()?.log_summary(GenerateCommand::name());
    Ok(())
}
