//! Benchmark command - Measure evaluation latency per scenario.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use deploygate_policy::PolicyEvaluator;

use super::{load_evaluator, load_scenarios, Scenario, DEFAULT_INPUTS, DEFAULT_POLICY};

const WARMUP_ITERATIONS: usize = 10;

#[derive(Args)]
pub struct BenchmarkArgs {
    /// Policy document (JSON or YAML)
    #[arg(short, long, env = "DEPLOYGATE_POLICY", default_value = DEFAULT_POLICY)]
    policy: PathBuf,

    /// Directory of scenario inputs (*.json)
    #[arg(long, default_value = DEFAULT_INPUTS)]
    inputs: PathBuf,

    /// Timed iterations per scenario
    #[arg(
        short = 'n',
        long,
        default_value_t = 100,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    iterations: u64,

    /// Where to write the JSON results
    #[arg(short, long, default_value = "benchmark-results.json")]
    output: PathBuf,
}

/// Timing statistics for one scenario, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkStats {
    pub iterations: usize,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub std_dev_ms: f64,
    pub throughput_per_sec: f64,
}

impl BenchmarkStats {
    /// Compute statistics from samples; `None` when there are none.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let avg = samples.iter().sum::<f64>() / n;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Sample standard deviation
        let std_dev = if samples.len() > 1 {
            let variance = samples.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        } else {
            0.0
        };

        Some(Self {
            iterations: samples.len(),
            avg_ms: avg,
            min_ms: min,
            max_ms: max,
            std_dev_ms: std_dev,
            throughput_per_sec: if avg > 0.0 { 1000.0 / avg } else { 0.0 },
        })
    }
}

/// Benchmark outcome for one scenario.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BenchmarkOutcome {
    Measured(BenchmarkStats),
    Failed { error: String },
}

/// Time `iterations` evaluations of one scenario after a warm-up.
pub fn benchmark_scenario(
    evaluator: &PolicyEvaluator,
    scenario: &Scenario,
    iterations: u64,
) -> BenchmarkOutcome {
    for _ in 0..WARMUP_ITERATIONS {
        let _ = evaluator.evaluate(&scenario.input);
    }

    let mut samples = Vec::with_capacity(iterations as usize);
    let mut last_error = None;

    for i in 0..iterations {
        let start = Instant::now();
        match evaluator.evaluate(&scenario.input) {
            Ok(_) => samples.push(start.elapsed().as_secs_f64() * 1000.0),
            Err(e) => {
                warn!("Iteration {} of {} failed: {}", i + 1, scenario.name, e);
                last_error = Some(e.to_string());
            }
        }
    }

    match BenchmarkStats::from_samples(&samples) {
        Some(stats) => BenchmarkOutcome::Measured(stats),
        None => BenchmarkOutcome::Failed {
            error: last_error.unwrap_or_else(|| "No successful iterations".to_string()),
        },
    }
}

pub fn execute(args: BenchmarkArgs) -> Result<bool> {
    let evaluator = load_evaluator(&args.policy)?;
    let scenarios = load_scenarios(&args.inputs)?;

    if scenarios.is_empty() {
        anyhow::bail!("No test scenarios found in {}", args.inputs.display());
    }

    println!("🚀 Benchmarking with {} iterations per scenario", args.iterations);
    println!("{}", "=".repeat(60));

    let mut results = BTreeMap::new();
    for scenario in &scenarios {
        info!("Benchmarking: {}", scenario.name);
        let outcome = benchmark_scenario(&evaluator, scenario, args.iterations);

        match &outcome {
            BenchmarkOutcome::Measured(stats) => {
                println!("\n⏱️  {}", scenario.name);
                println!("   📊 Average: {:.3}ms", stats.avg_ms);
                println!("   📊 Min: {:.3}ms", stats.min_ms);
                println!("   📊 Max: {:.3}ms", stats.max_ms);
                println!("   📊 Std Dev: {:.3}ms", stats.std_dev_ms);
                println!("   📊 Throughput: {:.1} evaluations/sec", stats.throughput_per_sec);
            }
            BenchmarkOutcome::Failed { error } => {
                println!("\n⏱️  {}", scenario.name);
                println!("   ❌ No successful iterations: {}", error);
            }
        }

        results.insert(scenario.name.clone(), outcome);
    }

    let measured: Vec<(&String, &BenchmarkStats)> = results
        .iter()
        .filter_map(|(name, outcome)| match outcome {
            BenchmarkOutcome::Measured(stats) => Some((name, stats)),
            BenchmarkOutcome::Failed { .. } => None,
        })
        .collect();

    print_report(&measured);

    let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("\n💾 Results saved to {}", args.output.display());

    Ok(!measured.is_empty())
}

fn print_report(measured: &[(&String, &BenchmarkStats)]) {
    println!("\n{}", "=".repeat(60));
    println!("📊 BENCHMARK REPORT");
    println!("{}", "=".repeat(60));

    if measured.is_empty() {
        println!("❌ No successful benchmarks to report");
        return;
    }

    let averages: Vec<f64> = measured.iter().map(|(_, s)| s.avg_ms).collect();
    let overall_avg = averages.iter().sum::<f64>() / averages.len() as f64;
    let best = averages.iter().copied().fold(f64::INFINITY, f64::min);
    let worst = averages.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    println!("Overall Performance:");
    println!("   📊 Average across all scenarios: {:.3}ms", overall_avg);
    println!("   📊 Best performance: {:.3}ms", best);
    println!("   📊 Worst performance: {:.3}ms", worst);

    let mut ranked = measured.to_vec();
    ranked.sort_by(|a, b| a.1.avg_ms.total_cmp(&b.1.avg_ms));

    println!("\n🏆 Performance Ranking (by average time):");
    for (i, (name, stats)) in ranked.iter().enumerate() {
        println!(
            "   {}. {}: {:.3}ms ({:.1}/sec)",
            i + 1,
            name,
            stats.avg_ms,
            stats.throughput_per_sec
        );
    }

    println!("\n💡 Recommendations:");
    if overall_avg > 10.0 {
        println!("   ⚠️  Average evaluation time is above 10ms - consider optimization");
    } else if overall_avg > 5.0 {
        println!("   ⚠️  Average evaluation time is above 5ms - monitor performance");
    } else {
        println!("   ✅ Performance is within acceptable limits");
    }

    if worst > overall_avg * 3.0 {
        println!("   ⚠️  High variance in performance - investigate outliers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploygate_policy::{InputContext, PolicyDocument, RuleSet};

    #[test]
    fn test_stats_from_samples() {
        let stats = BenchmarkStats::from_samples(&[1.0, 2.0, 3.0]).unwrap();

        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.avg_ms, 2.0);
        assert_eq!(stats.min_ms, 1.0);
        assert_eq!(stats.max_ms, 3.0);
        assert_eq!(stats.std_dev_ms, 1.0);
        assert_eq!(stats.throughput_per_sec, 500.0);

        assert!(BenchmarkStats::from_samples(&[]).is_none());
        assert_eq!(BenchmarkStats::from_samples(&[4.0]).unwrap().std_dev_ms, 0.0);
    }

    #[test]
    fn test_benchmark_scenario() {
        let document = PolicyDocument::new().with_environment("prod", RuleSet::production());
        let evaluator = PolicyEvaluator::new(document).unwrap();

        let ok = Scenario {
            name: "prod".to_string(),
            input: InputContext::new("prod"),
        };
        let missing = Scenario {
            name: "qa".to_string(),
            input: InputContext::new("qa"),
        };

        match benchmark_scenario(&evaluator, &ok, 5) {
            BenchmarkOutcome::Measured(stats) => assert_eq!(stats.iterations, 5),
            BenchmarkOutcome::Failed { error } => panic!("unexpected failure: {}", error),
        }

        assert!(matches!(
            benchmark_scenario(&evaluator, &missing, 5),
            BenchmarkOutcome::Failed { .. }
        ));
    }
}
