//! Per-environment rule sets.
//!
//! A [`RuleSet`] is the bundle of compliance requirements bound to one
//! deployment environment. Every requirement is optional: an unset
//! requirement never produces a violation.

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};
use crate::predicates::{compile_ticket_pattern, TimeWindow};

/// Compliance requirements for one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    /// Tests must have passed
    #[serde(default, rename = "tests_passed")]
    pub tests_required: bool,
    /// Artifact must be signed
    #[serde(default, rename = "artifact_signed")]
    pub artifact_signed_required: bool,
    /// Release must go through a controlled pipeline
    #[serde(default, rename = "release_controlled")]
    pub release_controlled_required: bool,
    /// Enforce `min_reviewers`
    #[serde(default)]
    pub require_reviewers: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reviewers: Option<u32>,
    /// Branch short-names that may be deployed; `None` is unrestricted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_branches: Option<Vec<String>>,
    /// Explicit `false` forbids shared infrastructure
    #[serde(
        default,
        rename = "shared_infra_except_core",
        skip_serializing_if = "Option::is_none"
    )]
    pub shared_infra_allowed: Option<bool>,
    #[serde(default, rename = "change_recorded")]
    pub change_recorded_required: bool,
    #[serde(default)]
    pub require_ticket: bool,
    /// Regex for ticket ids; empty accepts any non-empty ticket
    #[serde(default)]
    pub ticket_pattern: String,
    #[serde(default, rename = "deployment_date_agreed")]
    pub deployment_date_must_be_agreed: bool,
    /// Minimum wait before deploying; 0 disables
    #[serde(default)]
    pub wait_timer_seconds: u64,
    /// `HH:MM-HH:MM` UTC windows; `None` is unrestricted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_windows_utc: Option<Vec<String>>,
    #[serde(default, rename = "signed_off")]
    pub sign_off_required: bool,
    /// Explicit `false` blocks the emergency path
    #[serde(
        default,
        rename = "retrospective_signoff",
        skip_serializing_if = "Option::is_none"
    )]
    pub retrospective_signoff_allowed: Option<bool>,
    #[serde(default, rename = "components_unchanged")]
    pub components_must_stay_unchanged: bool,
    #[serde(default, rename = "rollback_instructions_present")]
    pub rollback_instructions_required: bool,
    /// 0 is unlimited
    #[serde(default)]
    pub max_deployments_per_day: u32,
}

impl RuleSet {
    /// Create a rule set with every requirement disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for [`RuleSet::new`] that reads better at call sites.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// A strict preset for production environments.
    pub fn production() -> Self {
        Self {
            tests_required: true,
            artifact_signed_required: true,
            release_controlled_required: true,
            require_reviewers: true,
            min_reviewers: Some(2),
            allowed_branches: Some(vec!["main".to_string()]),
            shared_infra_allowed: Some(false),
            change_recorded_required: true,
            require_ticket: true,
            ticket_pattern: "^CHG-[0-9]+$".to_string(),
            deployment_date_must_be_agreed: true,
            wait_timer_seconds: 0,
            approved_windows_utc: None,
            sign_off_required: true,
            retrospective_signoff_allowed: Some(true),
            components_must_stay_unchanged: true,
            rollback_instructions_required: true,
            max_deployments_per_day: 5,
        }
    }

    /// Minimum approver count, when reviewer enforcement is on.
    pub fn reviewer_minimum(&self) -> Option<u32> {
        if self.require_reviewers {
            Some(self.min_reviewers.unwrap_or(0))
        } else {
            None
        }
    }

    /// Required wait in seconds, when a wait timer is configured.
    pub fn wait_timer(&self) -> Option<u64> {
        (self.wait_timer_seconds > 0).then_some(self.wait_timer_seconds)
    }

    /// Daily deployment cap, when one is configured.
    pub fn daily_deployment_limit(&self) -> Option<u32> {
        (self.max_deployments_per_day > 0).then_some(self.max_deployments_per_day)
    }

    /// Whether shared infrastructure has been explicitly forbidden.
    pub fn forbids_shared_infra(&self) -> bool {
        self.shared_infra_allowed == Some(false)
    }

    /// Whether the emergency path has been explicitly closed.
    pub fn forbids_retrospective_signoff(&self) -> bool {
        self.retrospective_signoff_allowed == Some(false)
    }

    /// Check the shape of the rule set.
    pub fn validate(&self, environment: &str) -> PolicyResult<()> {
        if !self.ticket_pattern.is_empty() {
            compile_ticket_pattern(&self.ticket_pattern).map_err(|e| {
                PolicyError::invalid_rule(
                    environment,
                    "ticket_pattern",
                    format!("invalid regex: {}", e),
                )
            })?;
        }

        if let Some(branches) = &self.allowed_branches {
            if branches.iter().any(|b| b.trim().is_empty()) {
                return Err(PolicyError::invalid_rule(
                    environment,
                    "allowed_branches",
                    "branch names must not be empty",
                ));
            }
        }

        if let Some(windows) = &self.approved_windows_utc {
            for window in windows {
                window.parse::<TimeWindow>().map_err(|e| {
                    PolicyError::invalid_rule(environment, "approved_windows_utc", e)
                })?;
            }
        }

        Ok(())
    }

    pub fn with_tests_required(mut self) -> Self {
        self.tests_required = true;
        self
    }

    pub fn with_artifact_signed_required(mut self) -> Self {
        self.artifact_signed_required = true;
        self
    }

    pub fn with_release_controlled_required(mut self) -> Self {
        self.release_controlled_required = true;
        self
    }

    pub fn with_min_reviewers(mut self, min: u32) -> Self {
        self.require_reviewers = true;
        self.min_reviewers = Some(min);
        self
    }

    pub fn with_allowed_branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_branches = Some(branches.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_shared_infra_allowed(mut self, allowed: bool) -> Self {
        self.shared_infra_allowed = Some(allowed);
        self
    }

    pub fn with_change_recorded_required(mut self) -> Self {
        self.change_recorded_required = true;
        self
    }

    pub fn with_ticket(mut self, pattern: impl Into<String>) -> Self {
        self.require_ticket = true;
        self.ticket_pattern = pattern.into();
        self
    }

    pub fn with_deployment_date_agreed(mut self) -> Self {
        self.deployment_date_must_be_agreed = true;
        self
    }

    pub fn with_wait_timer(mut self, seconds: u64) -> Self {
        self.wait_timer_seconds = seconds;
        self
    }

    pub fn with_approved_windows<I, S>(mut self, windows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approved_windows_utc = Some(windows.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sign_off_required(mut self) -> Self {
        self.sign_off_required = true;
        self
    }

    pub fn with_retrospective_signoff(mut self, allowed: bool) -> Self {
        self.retrospective_signoff_allowed = Some(allowed);
        self
    }

    pub fn with_components_unchanged(mut self) -> Self {
        self.components_must_stay_unchanged = true;
        self
    }

    pub fn with_rollback_instructions_required(mut self) -> Self {
        self.rollback_instructions_required = true;
        self
    }

    pub fn with_max_deployments_per_day(mut self, max: u32) -> Self {
        self.max_deployments_per_day = max;
        self
    }
}
