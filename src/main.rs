//! Permutar CLI
//!
//! # Usage
//!
//! ```bash
//! # Train from config
//! permutar train config.yaml
//!
//! # Evaluate the checkpointed model on the test split
//! permutar test config.yaml
//! ```

use clap::Parser;
use permutar::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
