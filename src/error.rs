//! Error types for the intake wizard.
//!
//! Per-field validation results are not errors: they are values carried in
//! [`ValidationOutcome`](crate::validation::ValidationOutcome). The types here
//! cover misconfigured catalogs, illegal transitions, failed completion
//! callbacks and failed enrichment lookups.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Problems with a wizard definition or catalog file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Wizard {0} not found in catalog")]
    UnknownWizard(String),

    #[error("Wizard {wizard} has no steps")]
    NoSteps { wizard: String },

    #[error("Wizard {wizard} defines step {step} more than once")]
    DuplicateStep { wizard: String, step: String },

    #[error("Group {group} attaches to unknown step {step}")]
    DanglingStep { group: String, step: String },

    #[error("Step {step} requires {path}, which no field on that step provides")]
    DanglingRequiredField { step: String, path: String },

    #[error("Group {group} is defined twice with different contents")]
    ConflictingGroup { group: String },

    #[error("Field {field} uses unregistered rule {rule}")]
    UnknownRule { field: String, rule: String },
}

/// Illegal or rejected wizard transitions.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },

    #[error("Step {step_id} has {error_count} invalid field(s)")]
    ValidationFailed { step_id: String, error_count: usize },

    #[error("Wizard is already {phase}")]
    Terminal { phase: String },

    #[error("Step index {index} is out of range (wizard has {count} steps)")]
    UnknownStep { index: usize, count: usize },

    #[error("Submission failed: {0}")]
    Completion(#[from] CompletionError),
}

/// Failure reported by the host's completion callback. Always retryable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Submission service unavailable: {0}")]
    Unavailable(String),
}

/// Suggestion lookup failures. Never blocks the wizard.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnrichmentError {
    #[error("Suggestion lookup failed: {reason}")]
    LookupFailed { reason: String },

    #[error("Suggestion lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
