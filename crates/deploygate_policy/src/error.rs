//! Error types for the policy engine.

use thiserror::Error;

/// Result type alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors that can occur while loading or resolving policy configuration.
///
/// A failed rule check is never an error; it is reported as a
/// [`Violation`](crate::checks::Violation) inside the decision.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("Invalid rule '{field}' for environment {environment}: {message}")]
    InvalidRule {
        environment: String,
        field: String,
        message: String,
    },

    #[error("Invalid policy configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid deployment input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PolicyError {
    /// Whether this error belongs to the configuration family
    /// (missing environment or a malformed rule set).
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PolicyError::UnknownEnvironment(_)
                | PolicyError::InvalidRule { .. }
                | PolicyError::InvalidConfiguration(_)
                | PolicyError::Yaml(_)
        )
    }

    pub(crate) fn invalid_rule(
        environment: &str,
        field: &str,
        message: impl Into<String>,
    ) -> Self {
        PolicyError::InvalidRule {
            environment: environment.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}
