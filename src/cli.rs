//! CLI command handlers

use crate::config::TaskConfig;
use crate::dataset::load_split;
use crate::error::Result;
use crate::eval::run_test;
use crate::io::load_checkpoint;
use crate::model::Transformer;
use crate::train::Trainer;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Train small transformers on permutation-group word problems.
#[derive(Parser)]
#[command(name = "permutar", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Train a model from a YAML config.
    Train {
        /// Path to the configuration file.
        config: PathBuf,
    },
    /// Evaluate the checkpointed model over the test split.
    Test {
        /// Path to the configuration file.
        config: PathBuf,
    },
}

/// Execute a parsed CLI invocation.
pub fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train { config } => {
            let config = TaskConfig::from_yaml_file(config)?;
            println!("Loading data from {}...", config.data_dir);
            let split = load_split(&config.data_dir)?;

            let mut trainer = Trainer::new(&config)?;
            println!("Training...");
            trainer.train(&split)?;
            Ok(())
        }
        Command::Test { config } => {
            let config = TaskConfig::from_yaml_file(config)?;
            println!("Loading data from {}...", config.data_dir);
            let split = load_split(&config.data_dir)?;

            let mut model = Transformer::new(&config);
            match load_checkpoint(&config.model_dir, &config.model_name)? {
                Some(checkpoint) => model.load_parameters(&checkpoint)?,
                None => eprintln!(
                    "Warning: no checkpoint for '{}', testing an untrained model",
                    config.model_name
                ),
            }

            println!("Testing...");
            run_test(&config, &model, &split.test_words, &split.test_perms)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_train() {
        let cli = Cli::try_parse_from(["permutar", "train", "config.yaml"]).unwrap();
        assert!(matches!(cli.command, Command::Train { .. }));
    }

    #[test]
    fn test_parse_test() {
        let cli = Cli::try_parse_from(["permutar", "test", "config.yaml"]).unwrap();
        assert!(matches!(cli.command, Command::Test { .. }));
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["permutar"]).is_err());
    }
}
