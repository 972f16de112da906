//! CLI command definitions.
//!
//! This module defines the command structure for the deploygate CLI and the
//! file loading shared by its subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use deploygate_policy::{InputContext, PolicyDocument, PolicyEvaluator};

pub mod benchmark;
pub mod evaluate;
pub mod test_all;

/// Default policy document location.
pub const DEFAULT_POLICY: &str = "policies/policy.json";

/// Default scenario directory.
pub const DEFAULT_INPUTS: &str = "test-inputs";

/// deploygate - deployment gating policy evaluator
#[derive(Parser)]
#[command(name = "deploygate")]
#[command(version, about = "deploygate - deployment gating policy evaluator")]
#[command(long_about = r#"
deploygate decides whether a proposed deployment is permitted by the rules
configured for its target environment, and lists every reason when it is not.

COMMANDS:
  evaluate   → Evaluate one deployment request
  test-all   → Evaluate every scenario in a directory
  benchmark  → Measure evaluation latency per scenario

EXIT CODES:
  0 - Success (deployment allowed / all scenarios allowed)
  1 - General error
  2 - Invalid arguments or input
  3 - Deployment denied / scenario failure
  4 - Configuration error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate one deployment request against the policy
    Evaluate(evaluate::EvaluateArgs),

    /// Evaluate every scenario in a directory
    #[command(name = "test-all")]
    TestAll(test_all::TestAllArgs),

    /// Benchmark evaluation over every scenario in a directory
    Benchmark(benchmark::BenchmarkArgs),
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// A named deployment request loaded from disk.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub input: InputContext,
}

/// Load a policy document and build an evaluator over it.
pub fn load_evaluator(path: &Path) -> Result<PolicyEvaluator> {
    info!("Loading policy from: {:?}", path);
    let document = PolicyDocument::from_file(path)
        .with_context(|| format!("Failed to load policy {}", path.display()))?;

    let environments: Vec<_> = document.environments().collect();
    info!("Policy declares environments: {}", environments.join(", "));

    Ok(PolicyEvaluator::new(document)?)
}

/// Load every `*.json` scenario in a directory, sorted by name.
///
/// Files that fail to parse are reported and skipped.
pub fn load_scenarios(dir: &Path) -> Result<Vec<Scenario>> {
    if !dir.is_dir() {
        anyhow::bail!("Scenario directory not found: {}", dir.display());
    }

    let pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join("*.json");
    let pattern = pattern.to_string_lossy();
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid scenario pattern {}", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();
    paths.sort();

    let mut scenarios = Vec::new();
    for path in paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        match InputContext::from_file(&path) {
            Ok(input) => scenarios.push(Scenario { name, input }),
            Err(e) => warn!("⚠️  Failed to load {}: {}", path.display(), e),
        }
    }

    info!("Loaded {} scenarios from {:?}", scenarios.len(), dir);
    Ok(scenarios)
}
