//! Policy documents and environment resolution.
//!
//! A policy document maps environment names to rule sets:
//!
//! ```json
//! {"policy": {"environments": {"prod": {"rules": {"tests_passed": true}}}}}
//! ```
//!
//! Resolution is the only place where missing configuration is an error.
//! A deployment into an undeclared environment is never allowed by default.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PolicyError, PolicyResult};
use crate::rules::RuleSet;

/// Rules bound to one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentPolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub rules: RuleSet,
}

/// Body of a policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBody {
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentPolicy>,
}

/// A complete, immutable policy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub policy: PolicyBody,
}

impl PolicyDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an environment.
    pub fn with_environment(mut self, name: impl Into<String>, rules: RuleSet) -> Self {
        self.policy.environments.insert(
            name.into(),
            EnvironmentPolicy {
                description: String::new(),
                rules,
            },
        );
        self
    }

    /// Parse and validate a document from JSON.
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        let document: Self = serde_json::from_str(json)
            .map_err(|e| PolicyError::InvalidConfiguration(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    /// Parse and validate a document from YAML.
    pub fn from_yaml(yaml: &str) -> PolicyResult<Self> {
        let document: Self = serde_yaml::from_str(yaml)?;
        document.validate()?;
        Ok(document)
    }

    /// Load a document, choosing the format from the file extension.
    pub fn from_file(path: &Path) -> PolicyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!("Loading policy document from {}", path.display());

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            other => Err(PolicyError::InvalidConfiguration(format!(
                "unsupported policy file extension {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Serialize the document to YAML.
    pub fn to_yaml(&self) -> PolicyResult<String> {
        serde_yaml::to_string(self).map_err(PolicyError::from)
    }

    /// Validate every environment's rule set.
    pub fn validate(&self) -> PolicyResult<()> {
        for (name, env) in &self.policy.environments {
            env.rules.validate(name)?;
        }
        Ok(())
    }

    /// Declared environment names, sorted.
    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.policy.environments.keys().map(String::as_str)
    }

    /// Look up the rule set for an environment.
    pub fn resolve(&self, environment: &str) -> PolicyResult<&RuleSet> {
        self.policy
            .environments
            .get(environment)
            .map(|env| &env.rules)
            .ok_or_else(|| PolicyError::UnknownEnvironment(environment.to_string()))
    }
}

/// Look up the rule set for `environment` in `document`.
pub fn resolve<'a>(environment: &str, document: &'a PolicyDocument) -> PolicyResult<&'a RuleSet> {
    document.resolve(environment)
}
