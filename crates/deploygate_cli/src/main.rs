//! deploygate CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Deployment denied / scenario failure
//! - 4: Configuration error

use std::process::ExitCode;

use clap::Parser;
use deploygate_policy::PolicyError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const DENIED: u8 = 3;
    pub const CONFIGURATION_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "deploygate=debug"
    } else if cli.quiet {
        "deploygate=error"
    } else {
        "deploygate=info"
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in [default_level, "warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::execute(args),
        Commands::TestAll(args) => commands::test_all::execute(args),
        Commands::Benchmark(args) => commands::benchmark::execute(args),
    };

    match result {
        Ok(true) => ExitCode::from(ExitCodes::SUCCESS),
        Ok(false) => ExitCode::from(ExitCodes::DENIED),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let policy_error = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<PolicyError>());

    match policy_error {
        Some(err) if err.is_configuration_error() => ExitCodes::CONFIGURATION_ERROR,
        Some(PolicyError::InvalidInput(_)) => ExitCodes::INVALID_ARGS,
        Some(PolicyError::Io(_)) => ExitCodes::INVALID_ARGS,
        _ => ExitCodes::GENERAL_ERROR,
    }
}
