//! Deployment request snapshot.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// Kind of git reference being deployed.
///
/// An absent or unrecognised `ref_type` is `Other`, which branch
/// restrictions never apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    Branch,
    Tag,
    #[default]
    #[serde(other)]
    Other,
}

/// Results of pre-deployment checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checks {
    #[serde(default)]
    pub tests: bool,
}

/// Facts about one proposed deployment.
///
/// All facts arrive already resolved; nothing here is recomputed while
/// the request is evaluated. Absent flags read as `false` and absent
/// counters as `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputContext {
    /// Target environment
    #[serde(rename = "env")]
    pub environment: String,
    #[serde(default)]
    pub ref_type: RefType,
    /// Full reference, e.g. `refs/heads/main`
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub artifact_signed: bool,
    #[serde(default)]
    pub release_controlled: bool,
    #[serde(default)]
    pub approvers: Vec<String>,
    #[serde(default)]
    pub checks: Checks,
    #[serde(default)]
    pub shared_infra: bool,
    #[serde(default)]
    pub change_recorded: bool,
    #[serde(default)]
    pub ticket_id: String,
    #[serde(default)]
    pub deployment_date_agreed: bool,
    #[serde(default)]
    pub wait_elapsed_seconds: u64,
    /// Evaluation instant for window checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_emergency: bool,
    #[serde(default)]
    pub signed_off: bool,
    #[serde(default)]
    pub components_changed_after_signoff: bool,
    #[serde(default)]
    pub rollback_instructions_present: bool,
    #[serde(default)]
    pub deployments_today: u32,
}

impl InputContext {
    /// Create an input for an environment with every fact unset.
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            ..Default::default()
        }
    }

    /// Parse an input from JSON.
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        serde_json::from_str(json).map_err(|e| PolicyError::InvalidInput(e.to_string()))
    }

    /// Load an input from a JSON file.
    pub fn from_file(path: &Path) -> PolicyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Check boundary constraints the type system does not cover.
    pub fn validate(&self) -> PolicyResult<()> {
        if self.environment.trim().is_empty() {
            return Err(PolicyError::InvalidInput(
                "environment must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tests_passed(&self) -> bool {
        self.checks.tests
    }

    pub fn approver_count(&self) -> usize {
        self.approvers.len()
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.ref_type = RefType::Branch;
        self.git_ref = format!("{}{}", crate::predicates::BRANCH_REF_PREFIX, branch);
        self
    }

    pub fn with_ref(mut self, ref_type: RefType, git_ref: impl Into<String>) -> Self {
        self.ref_type = ref_type;
        self.git_ref = git_ref.into();
        self
    }

    pub fn with_tests_passed(mut self, passed: bool) -> Self {
        self.checks.tests = passed;
        self
    }

    pub fn with_approvers<I, S>(mut self, approvers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approvers = approvers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket_id = ticket.into();
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now_utc = Some(now);
        self
    }

    pub fn emergency(mut self) -> Self {
        self.is_emergency = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_sparse_json() {
        let input = InputContext::from_json(r#"{"env": "dev"}"#).unwrap();

        assert_eq!(input.environment, "dev");
        assert_eq!(input.ref_type, RefType::Other);
        assert!(!input.tests_passed());
        assert_eq!(input.approver_count(), 0);
        assert!(input.now_utc.is_none());
        assert_eq!(input.deployments_today, 0);
    }

    #[test]
    fn test_full_json() {
        let json = r#"{
            "env": "prod",
            "ref_type": "branch",
            "ref": "refs/heads/main",
            "approvers": ["alice", "bob"],
            "checks": {"tests": true},
            "ticket_id": "CHG-1",
            "now_utc": "2025-01-18T16:00:00Z",
            "deployments_today": 3,
            "_test_name": "ignored"
        }"#;
        let input = InputContext::from_json(json).unwrap();

        assert_eq!(input.git_ref, "refs/heads/main");
        assert_eq!(input.approver_count(), 2);
        assert!(input.tests_passed());
        assert!(input.now_utc.is_some());
        assert_eq!(input.deployments_today, 3);
    }

    #[test]
    fn test_unknown_ref_type() {
        let input = InputContext::from_json(r#"{"env": "dev", "ref_type": "commit"}"#).unwrap();
        assert_eq!(input.ref_type, RefType::Other);
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert!(matches!(
            InputContext::from_json(r#"{"env": "dev", "deployments_today": -1}"#),
            Err(PolicyError::InvalidInput(_))
        ));
        assert!(InputContext::from_json(r#"{"ref": "refs/heads/main"}"#).is_err());
        assert!(InputContext::new("  ").validate().is_err());
    }
}
