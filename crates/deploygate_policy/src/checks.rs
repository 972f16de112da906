//! The eight rule categories and their checks.
//!
//! Every check is a pure function of the rule set and the input. A
//! requirement that is unset never fires, and each sub-check contributes at
//! most one [`Violation`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::input::{InputContext, RefType};
use crate::predicates::{any_window_matches, branch_allowed, valid_ticket};
use crate::rules::RuleSet;

/// Compliance concern a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    ControlledTestedSegregated,
    ProductionSeparation,
    DocumentedChanges,
    DeploymentWindows,
    ApprovalsSignoff,
    ChangeControl,
    RollbackProcedures,
    RateLimiting,
}

impl RuleCategory {
    /// Every category, in reporting order.
    pub const ALL: [RuleCategory; 8] = [
        RuleCategory::ControlledTestedSegregated,
        RuleCategory::ProductionSeparation,
        RuleCategory::DocumentedChanges,
        RuleCategory::DeploymentWindows,
        RuleCategory::ApprovalsSignoff,
        RuleCategory::ChangeControl,
        RuleCategory::RollbackProcedures,
        RuleCategory::RateLimiting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::ControlledTestedSegregated => "controlled_tested_segregated",
            RuleCategory::ProductionSeparation => "production_separation",
            RuleCategory::DocumentedChanges => "documented_changes",
            RuleCategory::DeploymentWindows => "deployment_windows",
            RuleCategory::ApprovalsSignoff => "approvals_signoff",
            RuleCategory::ChangeControl => "change_control",
            RuleCategory::RollbackProcedures => "rollback_procedures",
            RuleCategory::RateLimiting => "rate_limiting",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    pub kind: RuleCategory,
    /// Sub-check that fired, e.g. `min_reviewers`
    pub rule: String,
    pub environment: String,
    /// `<category>[<environment>]: <detail>`
    pub message: String,
}

impl Violation {
    pub fn new(
        kind: RuleCategory,
        rule: impl Into<String>,
        environment: &str,
        detail: impl fmt::Display,
    ) -> Self {
        Self {
            kind,
            rule: rule.into(),
            environment: environment.to_string(),
            message: format!("{}[{}]: {}", kind, environment, detail),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Everything a check may look at.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub environment: &'a str,
    pub rules: &'a RuleSet,
    pub input: &'a InputContext,
}

impl<'a> CheckContext<'a> {
    pub fn new(environment: &'a str, rules: &'a RuleSet, input: &'a InputContext) -> Self {
        Self {
            environment,
            rules,
            input,
        }
    }

    fn violation(&self, kind: RuleCategory, rule: &str, detail: impl fmt::Display) -> Violation {
        Violation::new(kind, rule, self.environment, detail)
    }
}

/// Run the checks of one category.
pub fn run_check(category: RuleCategory, ctx: &CheckContext<'_>) -> Vec<Violation> {
    match category {
        RuleCategory::ControlledTestedSegregated => controlled_tested_segregated(ctx),
        RuleCategory::ProductionSeparation => production_separation(ctx),
        RuleCategory::DocumentedChanges => documented_changes(ctx),
        RuleCategory::DeploymentWindows => deployment_windows(ctx),
        RuleCategory::ApprovalsSignoff => approvals_signoff(ctx),
        RuleCategory::ChangeControl => change_control(ctx),
        RuleCategory::RollbackProcedures => rollback_procedures(ctx),
        RuleCategory::RateLimiting => rate_limiting(ctx),
    }
}

/// Tested, signed, controlled and reviewed releases from allowed branches.
pub fn controlled_tested_segregated(ctx: &CheckContext<'_>) -> Vec<Violation> {
    let kind = RuleCategory::ControlledTestedSegregated;
    let (rules, input) = (ctx.rules, ctx.input);
    let mut violations = Vec::new();

    if rules.tests_required && !input.tests_passed() {
        violations.push(ctx.violation(kind, "tests_passed", "tests required but not passed"));
    }

    if rules.artifact_signed_required && !input.artifact_signed {
        violations.push(ctx.violation(kind, "artifact_signed", "artifact must be signed"));
    }

    if rules.release_controlled_required && !input.release_controlled {
        violations.push(ctx.violation(kind, "release_controlled", "release must be controlled"));
    }

    if let Some(min) = rules.reviewer_minimum() {
        let got = input.approver_count();
        if got < min as usize {
            violations.push(ctx.violation(
                kind,
                "min_reviewers",
                format!("at least {} approvers required (got {})", min, got),
            ));
        }
    }

    if let Some(allowed) = &rules.allowed_branches {
        if input.ref_type == RefType::Branch && !branch_allowed(allowed, &input.git_ref) {
            violations.push(ctx.violation(
                kind,
                "allowed_branches",
                format!(
                    "ref '{}' is not an allowed branch (allowed: [{}])",
                    input.git_ref,
                    allowed.join(", ")
                ),
            ));
        }
    }

    violations
}

/// Production must not run on shared infrastructure.
pub fn production_separation(ctx: &CheckContext<'_>) -> Vec<Violation> {
    if ctx.rules.forbids_shared_infra() && ctx.input.shared_infra {
        return vec![ctx.violation(
            RuleCategory::ProductionSeparation,
            "shared_infra_except_core",
            "production cannot run on shared infra (except core)",
        )];
    }
    Vec::new()
}

/// Changes must be recorded and carry a valid ticket.
pub fn documented_changes(ctx: &CheckContext<'_>) -> Vec<Violation> {
    let kind = RuleCategory::DocumentedChanges;
    let (rules, input) = (ctx.rules, ctx.input);
    let mut violations = Vec::new();

    if rules.change_recorded_required && !input.change_recorded {
        violations.push(ctx.violation(kind, "change_recorded", "change must be recorded"));
    }

    if rules.require_ticket && !valid_ticket(&input.ticket_id, &rules.ticket_pattern) {
        violations.push(ctx.violation(
            kind,
            "require_ticket",
            format!(
                "ticket id '{}' invalid/missing (pattern '{}')",
                input.ticket_id, rules.ticket_pattern
            ),
        ));
    }

    violations
}

/// Agreed date, elapsed wait timer and approved time windows.
pub fn deployment_windows(ctx: &CheckContext<'_>) -> Vec<Violation> {
    let kind = RuleCategory::DeploymentWindows;
    let (rules, input) = (ctx.rules, ctx.input);
    let mut violations = Vec::new();

    if rules.deployment_date_must_be_agreed && !input.deployment_date_agreed {
        violations.push(ctx.violation(
            kind,
            "deployment_date_agreed",
            "deployment date not agreed",
        ));
    }

    if let Some(wait) = rules.wait_timer() {
        if input.wait_elapsed_seconds < wait {
            violations.push(ctx.violation(
                kind,
                "wait_timer_seconds",
                format!(
                    "wait timer not elapsed ({} < {})",
                    input.wait_elapsed_seconds, wait
                ),
            ));
        }
    }

    if let Some(windows) = &rules.approved_windows_utc {
        let listed = windows.join(", ");
        match input.now_utc {
            // An empty window list closes every slot.
            _ if windows.is_empty() => violations.push(ctx.violation(
                kind,
                "approved_windows_utc",
                "no approved deployment windows configured",
            )),
            Some(now) if any_window_matches(now, windows) => {}
            Some(now) => violations.push(ctx.violation(
                kind,
                "approved_windows_utc",
                format!(
                    "{} is outside approved windows [{}]",
                    now.format("%H:%M"),
                    listed
                ),
            )),
            None => violations.push(ctx.violation(
                kind,
                "approved_windows_utc",
                format!("no deployment time supplied for approved windows [{}]", listed),
            )),
        }
    }

    violations
}

/// Sign-off, with the emergency path as the only bypass.
pub fn approvals_signoff(ctx: &CheckContext<'_>) -> Vec<Violation> {
    let kind = RuleCategory::ApprovalsSignoff;
    let (rules, input) = (ctx.rules, ctx.input);

    if input.is_emergency {
        if rules.forbids_retrospective_signoff() {
            return vec![ctx.violation(
                kind,
                "retrospective_signoff",
                "emergency path requires retrospective_signoff enabled",
            )];
        }
    } else if rules.sign_off_required && !input.signed_off {
        return vec![ctx.violation(kind, "signed_off", "missing required sign-off")];
    }

    Vec::new()
}

/// Components may not change once signed off.
pub fn change_control(ctx: &CheckContext<'_>) -> Vec<Violation> {
    if ctx.rules.components_must_stay_unchanged && ctx.input.components_changed_after_signoff {
        return vec![ctx.violation(
            RuleCategory::ChangeControl,
            "components_unchanged",
            "components changed after signoff; require new signoff",
        )];
    }
    Vec::new()
}

pub fn rollback_procedures(ctx: &CheckContext<'_>) -> Vec<Violation> {
    if ctx.rules.rollback_instructions_required && !ctx.input.rollback_instructions_present {
        return vec![ctx.violation(
            RuleCategory::RollbackProcedures,
            "rollback_instructions_present",
            "rollback instructions must be present",
        )];
    }
    Vec::new()
}

pub fn rate_limiting(ctx: &CheckContext<'_>) -> Vec<Violation> {
    match ctx.rules.daily_deployment_limit() {
        Some(max) if ctx.input.deployments_today > max => vec![ctx.violation(
            RuleCategory::RateLimiting,
            "max_deployments_per_day",
            format!(
                "max deployments per day exceeded ({} > {})",
                ctx.input.deployments_today, max
            ),
        )],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 18, hour, 0, 0).unwrap()
    }

    fn run(category: RuleCategory, rules: &RuleSet, input: &InputContext) -> Vec<Violation> {
        run_check(category, &CheckContext::new("prod", rules, input))
    }

    #[test]
    fn test_category_names() {
        assert_eq!(
            RuleCategory::ControlledTestedSegregated.to_string(),
            "controlled_tested_segregated"
        );
        assert_eq!(
            serde_json::to_string(&RuleCategory::RateLimiting).unwrap(),
            "\"rate_limiting\""
        );
    }

    #[test]
    fn test_controlled_sub_checks_fire_together() {
        let rules = RuleSet::new()
            .with_tests_required()
            .with_artifact_signed_required()
            .with_release_controlled_required()
            .with_min_reviewers(2)
            .with_allowed_branches(["main"]);
        let input = InputContext::new("prod")
            .with_branch("feature/x")
            .with_approvers(["u1"]);

        let violations = run(RuleCategory::ControlledTestedSegregated, &rules, &input);
        let ids: Vec<_> = violations.iter().map(|v| v.rule.as_str()).collect();

        assert_eq!(
            ids,
            vec![
                "tests_passed",
                "artifact_signed",
                "release_controlled",
                "min_reviewers",
                "allowed_branches"
            ]
        );
        assert!(violations[3].message.contains("at least 2 approvers required (got 1)"));
        assert!(violations[0].message.starts_with("controlled_tested_segregated[prod]: "));
    }

    #[test]
    fn test_branch_restriction_ignores_tags() {
        let rules = RuleSet::new().with_allowed_branches(["main"]);
        let input = InputContext::new("prod").with_ref(RefType::Tag, "refs/tags/v1.0.0");
        assert!(run(RuleCategory::ControlledTestedSegregated, &rules, &input).is_empty());
    }

    #[test]
    fn test_empty_branch_list_blocks_every_branch() {
        let rules = RuleSet::new().with_allowed_branches(Vec::<String>::new());
        let input = InputContext::new("prod").with_branch("main");
        assert_eq!(run(RuleCategory::ControlledTestedSegregated, &rules, &input).len(), 1);
    }

    #[test]
    fn test_branch_restriction_skips_missing_ref_type() {
        let rules = RuleSet::new().with_allowed_branches(["main"]);
        let input =
            InputContext::from_json(r#"{"env": "prod", "ref": "refs/tags/v1.0.0"}"#).unwrap();

        assert_eq!(input.ref_type, RefType::Other);
        assert!(run(RuleCategory::ControlledTestedSegregated, &rules, &input).is_empty());

        let branch = InputContext::from_json(
            r#"{"env": "prod", "ref_type": "branch", "ref": "refs/heads/dev"}"#,
        )
        .unwrap();
        assert_eq!(run(RuleCategory::ControlledTestedSegregated, &rules, &branch).len(), 1);
    }

    #[test]
    fn test_production_separation_is_tri_state() {
        let mut input = InputContext::new("prod");
        input.shared_infra = true;

        let unset = RuleSet::new();
        let allowed = RuleSet::new().with_shared_infra_allowed(true);
        let forbidden = RuleSet::new().with_shared_infra_allowed(false);

        assert!(run(RuleCategory::ProductionSeparation, &unset, &input).is_empty());
        assert!(run(RuleCategory::ProductionSeparation, &allowed, &input).is_empty());
        assert_eq!(run(RuleCategory::ProductionSeparation, &forbidden, &input).len(), 1);
    }

    #[test]
    fn test_documented_changes() {
        let rules = RuleSet::new()
            .with_change_recorded_required()
            .with_ticket("^CHG-[0-9]+$");
        let input = InputContext::new("prod").with_ticket("INVALID-123");

        let violations = run(RuleCategory::DocumentedChanges, &rules, &input);
        assert_eq!(violations.len(), 2);
        assert!(violations[1].message.contains("INVALID-123"));
        assert!(violations[1].message.contains("^CHG-[0-9]+$"));
    }

    #[test]
    fn test_wait_timer() {
        let rules = RuleSet::new().with_wait_timer(600);
        let mut input = InputContext::new("prod");
        input.wait_elapsed_seconds = 300;

        let violations = run(RuleCategory::DeploymentWindows, &rules, &input);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("(300 < 600)"));

        input.wait_elapsed_seconds = 600;
        assert!(run(RuleCategory::DeploymentWindows, &rules, &input).is_empty());
    }

    #[test]
    fn test_approved_windows() {
        let rules = RuleSet::new().with_approved_windows(["09:00-17:00"]);
        let inside = InputContext::new("prod").with_now(at(16));
        let outside = InputContext::new("prod").with_now(at(18));
        let missing = InputContext::new("prod");

        assert!(run(RuleCategory::DeploymentWindows, &rules, &inside).is_empty());

        let violations = run(RuleCategory::DeploymentWindows, &rules, &outside);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("18:00 is outside approved windows [09:00-17:00]"));

        assert_eq!(run(RuleCategory::DeploymentWindows, &rules, &missing).len(), 1);
    }

    #[test]
    fn test_empty_window_list_blocks_every_time() {
        let rules = RuleSet::new().with_approved_windows(Vec::<String>::new());
        let timed = InputContext::new("prod").with_now(at(12));
        let untimed = InputContext::new("prod");

        for input in [&timed, &untimed] {
            let violations = run(RuleCategory::DeploymentWindows, &rules, input);
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].rule, "approved_windows_utc");
            assert!(violations[0].message.ends_with("no approved deployment windows configured"));
        }
    }

    #[test]
    fn test_unrestricted_windows_ignore_time() {
        let input = InputContext::new("prod");
        assert!(run(RuleCategory::DeploymentWindows, &RuleSet::new(), &input).is_empty());
    }

    #[test]
    fn test_signoff_and_emergency() {
        let requires = RuleSet::new().with_sign_off_required();
        let normal = InputContext::new("prod");
        let emergency = InputContext::new("prod").emergency();

        assert_eq!(run(RuleCategory::ApprovalsSignoff, &requires, &normal).len(), 1);
        assert!(run(RuleCategory::ApprovalsSignoff, &requires, &emergency).is_empty());

        let closed = requires.clone().with_retrospective_signoff(false);
        let mut signed_emergency = emergency.clone();
        signed_emergency.signed_off = true;
        assert_eq!(run(RuleCategory::ApprovalsSignoff, &closed, &emergency).len(), 1);
        assert_eq!(run(RuleCategory::ApprovalsSignoff, &closed, &signed_emergency).len(), 1);
    }

    #[test]
    fn test_change_control_and_rollback() {
        let rules = RuleSet::new()
            .with_components_unchanged()
            .with_rollback_instructions_required();
        let mut input = InputContext::new("prod");
        input.components_changed_after_signoff = true;

        assert_eq!(run(RuleCategory::ChangeControl, &rules, &input).len(), 1);
        assert_eq!(run(RuleCategory::RollbackProcedures, &rules, &input).len(), 1);

        input.components_changed_after_signoff = false;
        input.rollback_instructions_present = true;
        assert!(run(RuleCategory::ChangeControl, &rules, &input).is_empty());
        assert!(run(RuleCategory::RollbackProcedures, &rules, &input).is_empty());
    }

    #[test]
    fn test_rate_limiting() {
        let rules = RuleSet::new().with_max_deployments_per_day(3);
        let mut input = InputContext::new("prod");
        input.deployments_today = 3;
        assert!(run(RuleCategory::RateLimiting, &rules, &input).is_empty());

        input.deployments_today = 4;
        let violations = run(RuleCategory::RateLimiting, &rules, &input);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("(4 > 3)"));

        assert!(run(RuleCategory::RateLimiting, &RuleSet::new(), &input).is_empty());
    }
}
