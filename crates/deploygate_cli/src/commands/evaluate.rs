//! Evaluate command - Decide a single deployment request.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use deploygate_policy::InputContext;

use super::{load_evaluator, OutputFormat, DEFAULT_POLICY};

#[derive(Args)]
pub struct EvaluateArgs {
    /// Policy document (JSON or YAML)
    #[arg(short, long, env = "DEPLOYGATE_POLICY", default_value = DEFAULT_POLICY)]
    policy: PathBuf,

    /// Deployment request (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Returns `Ok(false)` when the deployment is denied.
pub fn execute(args: EvaluateArgs) -> Result<bool> {
    let evaluator = load_evaluator(&args.policy)?;

    info!("Evaluating deployment request: {:?}", args.input);
    let input = InputContext::from_file(&args.input)
        .with_context(|| format!("Failed to load input {}", args.input.display()))?;

    let decision = evaluator.evaluate(&input)?;

    match args.format {
        OutputFormat::Json => println!("{}", decision.to_json()?),
        OutputFormat::Text => print!("{}", decision.report()),
    }

    Ok(decision.allowed)
}
