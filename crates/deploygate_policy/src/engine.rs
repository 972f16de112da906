//! Policy evaluation engine.
//!
//! Runs every rule category against a resolved rule set and folds the
//! results into a single [`Decision`]. Evaluation is pure: the same rule
//! set and input always give the same decision, and the only clock read
//! is the `now_utc` carried by the input.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checks::{run_check, CheckContext, RuleCategory, Violation};
use crate::document::PolicyDocument;
use crate::error::PolicyResult;
use crate::input::InputContext;
use crate::rules::RuleSet;

/// Allow/deny verdict for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub environment: String,
    /// `true` iff `violations` is empty
    pub allowed: bool,
    /// Violations in category order
    pub violations: Vec<Violation>,
}

impl Decision {
    /// An allowing decision.
    pub fn allow(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            allowed: true,
            violations: Vec::new(),
        }
    }

    /// Build a decision from collected violations, dropping duplicates.
    pub fn from_violations(environment: impl Into<String>, violations: Vec<Violation>) -> Self {
        let mut unique: Vec<Violation> = Vec::with_capacity(violations.len());
        for violation in violations {
            if !unique.contains(&violation) {
                unique.push(violation);
            }
        }

        Self {
            environment: environment.into(),
            allowed: unique.is_empty(),
            violations: unique,
        }
    }

    /// Violations raised by one category.
    pub fn by_category(&self, category: RuleCategory) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.kind == category)
            .collect()
    }

    /// Categories with at least one violation, in category order.
    pub fn categories(&self) -> Vec<RuleCategory> {
        let mut categories: Vec<_> = self.violations.iter().map(|v| v.kind).collect();
        categories.dedup();
        categories
    }

    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }

    /// Serialize the decision as pretty JSON.
    pub fn to_json(&self) -> PolicyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Generate a human-readable report.
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!("Environment: {}\n", self.environment));
        report.push_str(&format!(
            "Decision: {}\n",
            if self.allowed { "✅ ALLOWED" } else { "❌ DENIED" }
        ));

        if !self.violations.is_empty() {
            report.push_str(&format!("\nViolations ({}):\n", self.violations.len()));
            for (i, violation) in self.violations.iter().enumerate() {
                report.push_str(&format!("  {}. {}\n", i + 1, violation.message));
            }
        }

        report
    }
}

/// Evaluate an input against an already resolved rule set.
pub fn evaluate_rules(rules: &RuleSet, environment: &str, input: &InputContext) -> Decision {
    let ctx = CheckContext::new(environment, rules, input);

    let violations: Vec<Violation> = RuleCategory::ALL
        .iter()
        .flat_map(|category| {
            let found = run_check(*category, &ctx);
            debug!("Check {} raised {} violation(s)", category, found.len());
            found
        })
        .collect();

    Decision::from_violations(environment, violations)
}

/// Evaluates deployment requests against a policy document.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    document: PolicyDocument,
}

impl PolicyEvaluator {
    /// Create an evaluator over a validated document.
    pub fn new(document: PolicyDocument) -> PolicyResult<Self> {
        document.validate()?;
        Ok(Self { document })
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    /// Resolve the input's environment and evaluate it.
    ///
    /// Fails without evaluating anything when the environment is unknown
    /// or the input is malformed.
    pub fn evaluate(&self, input: &InputContext) -> PolicyResult<Decision> {
        input.validate()?;
        let rules = self.document.resolve(&input.environment)?;

        let decision = evaluate_rules(rules, &input.environment, input);
        info!(
            "Deployment to {}: {} ({} violation(s))",
            decision.environment,
            if decision.allowed { "ALLOWED" } else { "DENIED" },
            decision.violations.len()
        );

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;

    #[test]
    fn test_permissive_rules_allow() {
        let decision = evaluate_rules(&RuleSet::permissive(), "dev", &InputContext::new("dev"));
        assert!(decision.allowed);
        assert!(decision.violations.is_empty());
        assert_eq!(decision, Decision::allow("dev"));
    }

    #[test]
    fn test_duplicates_dropped() {
        let v = Violation::new(RuleCategory::ChangeControl, "components_unchanged", "prod", "x");
        let decision = Decision::from_violations("prod", vec![v.clone(), v]);

        assert!(!decision.allowed);
        assert_eq!(decision.violations.len(), 1);
    }

    #[test]
    fn test_category_order_is_stable() {
        let rules = RuleSet::new()
            .with_max_deployments_per_day(1)
            .with_tests_required()
            .with_rollback_instructions_required();
        let mut input = InputContext::new("prod");
        input.deployments_today = 2;

        let decision = evaluate_rules(&rules, "prod", &input);
        assert_eq!(
            decision.categories(),
            vec![
                RuleCategory::ControlledTestedSegregated,
                RuleCategory::RollbackProcedures,
                RuleCategory::RateLimiting,
            ]
        );
        assert_eq!(decision.by_category(RuleCategory::RateLimiting).len(), 1);
    }

    #[test]
    fn test_evaluator_rejects_unknown_environment() {
        let document = PolicyDocument::new().with_environment("prod", RuleSet::production());
        let evaluator = PolicyEvaluator::new(document).unwrap();

        let err = evaluator.evaluate(&InputContext::new("staging")).unwrap_err();
        assert!(matches!(err, PolicyError::UnknownEnvironment(_)));
    }

    #[test]
    fn test_evaluator_rejects_invalid_document() {
        let document =
            PolicyDocument::new().with_environment("prod", RuleSet::new().with_ticket("(["));
        assert!(PolicyEvaluator::new(document).is_err());
    }

    #[test]
    fn test_report() {
        let rules = RuleSet::new().with_min_reviewers(2);
        let input = InputContext::new("prod").with_approvers(["u1"]);
        let report = evaluate_rules(&rules, "prod", &input).report();

        assert!(report.contains("❌ DENIED"));
        assert!(report.contains(
            "1. controlled_tested_segregated[prod]: at least 2 approvers required (got 1)"
        ));
    }
}
