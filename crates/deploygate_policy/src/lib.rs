//! # deploygate_policy
//!
//! Deployment gating policy engine.
//!
//! This crate provides:
//! - **Rule Sets**: Per-environment compliance requirements loaded from JSON or YAML
//! - **Rule Checks**: Eight independent rule categories, each a pure function
//! - **Decisions**: Aggregation of all violations into an allow/deny verdict
//! - **Resolution**: Environment lookup that fails closed on unknown environments
//!
//! ## Example
//!
//! ```rust,ignore
//! use deploygate_policy::{InputContext, PolicyDocument, PolicyEvaluator};
//! use std::path::Path;
//!
//! let document = PolicyDocument::from_file(Path::new("policies/policy.json"))?;
//! let evaluator = PolicyEvaluator::new(document)?;
//!
//! let input = InputContext::from_file(Path::new("test-inputs/prod.json"))?;
//! let decision = evaluator.evaluate(&input)?;
//!
//! if decision.allowed {
//!     println!("✅ Deployment allowed");
//! } else {
//!     println!("{}", decision.report());
//! }
//! ```

pub mod checks;
pub mod document;
pub mod engine;
pub mod error;
pub mod input;
pub mod predicates;
pub mod rules;

pub use checks::{run_check, CheckContext, RuleCategory, Violation};
pub use document::{resolve, EnvironmentPolicy, PolicyBody, PolicyDocument};
pub use engine::{evaluate_rules, Decision, PolicyEvaluator};
pub use error::{PolicyError, PolicyResult};
pub use input::{Checks, InputContext, RefType};
pub use predicates::{
    any_window_matches, branch_allowed, in_window, valid_ticket, TimeWindow, BRANCH_REF_PREFIX,
};
pub use rules::RuleSet;
