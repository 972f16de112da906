//! Test-all command - Evaluate every scenario in a directory.
//!
//! A scenario passes when its deployment is allowed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use deploygate_policy::{Decision, PolicyEvaluator};

use super::{
    load_evaluator, load_scenarios, OutputFormat, Scenario, DEFAULT_INPUTS, DEFAULT_POLICY,
};

#[derive(Args)]
pub struct TestAllArgs {
    /// Policy document (JSON or YAML)
    #[arg(short, long, env = "DEPLOYGATE_POLICY", default_value = DEFAULT_POLICY)]
    policy: PathBuf,

    /// Directory of scenario inputs (*.json)
    #[arg(long, default_value = DEFAULT_INPUTS)]
    inputs: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Outcome of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScenarioResult {
    pub fn success(&self) -> bool {
        self.decision.as_ref().is_some_and(|d| d.allowed)
    }
}

/// Summary statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestSummary {
    pub total: usize,
    pub allowed: usize,
    pub denied: usize,
    pub errored: usize,
}

impl TestSummary {
    pub fn from_results(results: &[ScenarioResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match &result.decision {
                Some(d) if d.allowed => summary.allowed += 1,
                Some(_) => summary.denied += 1,
                None => summary.errored += 1,
            }
        }
        summary
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.allowed as f64 / self.total as f64 * 100.0
    }

    pub fn passed(&self) -> bool {
        self.total > 0 && self.allowed == self.total
    }
}

#[derive(Serialize)]
struct TestReport<'a> {
    results: &'a [ScenarioResult],
    summary: &'a TestSummary,
}

/// Evaluate every scenario, recording evaluation errors per scenario.
pub fn run_scenarios(evaluator: &PolicyEvaluator, scenarios: &[Scenario]) -> Vec<ScenarioResult> {
    scenarios
        .iter()
        .map(|scenario| match evaluator.evaluate(&scenario.input) {
            Ok(decision) => ScenarioResult {
                name: scenario.name.clone(),
                decision: Some(decision),
                error: None,
            },
            Err(e) => ScenarioResult {
                name: scenario.name.clone(),
                decision: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

/// Returns `Ok(false)` when any scenario is denied or errors.
pub fn execute(args: TestAllArgs) -> Result<bool> {
    let evaluator = load_evaluator(&args.policy)?;
    let scenarios = load_scenarios(&args.inputs)?;

    if scenarios.is_empty() {
        anyhow::bail!("No test scenarios found in {}", args.inputs.display());
    }

    info!("Running {} test scenarios", scenarios.len());
    let results = run_scenarios(&evaluator, &scenarios);
    let summary = TestSummary::from_results(&results);

    match args.format {
        OutputFormat::Json => {
            let report = TestReport {
                results: &results,
                summary: &summary,
            };
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize results")?;
            println!("{}", json);
        }
        OutputFormat::Text => print_text_report(&results, &summary),
    }

    Ok(summary.passed())
}

fn print_text_report(results: &[ScenarioResult], summary: &TestSummary) {
    println!("🧪 Deployment Policy Scenarios");
    println!("{}", "=".repeat(50));

    for result in results {
        println!("\n🔍 Testing: {}", result.name);
        match (&result.decision, &result.error) {
            (Some(decision), _) if decision.allowed => println!("✅ ALLOWED"),
            (Some(decision), _) => {
                println!("❌ DENIED");
                println!("   Violations ({}):", decision.violations.len());
                for (i, violation) in decision.violations.iter().enumerate() {
                    println!("   {}. {}", i + 1, violation);
                }
            }
            (None, error) => {
                println!("💥 ERROR: {}", error.as_deref().unwrap_or("unknown error"))
            }
        }
    }

    println!("\n{}", "=".repeat(50));
    println!("Total Scenarios: {}", summary.total);
    println!("✅ Allowed: {}", summary.allowed);
    println!("❌ Denied: {}", summary.denied);
    if summary.errored > 0 {
        println!("💥 Errored: {}", summary.errored);
    }
    println!("Success Rate: {:.1}%", summary.success_rate());

    let failed: Vec<_> = results.iter().filter(|r| !r.success()).collect();
    if !failed.is_empty() {
        println!("\n❌ Failed Scenarios:");
        for result in failed {
            println!("   • {}", result.name);
        }
    }
}
