//! Validation: per-field rules evaluated over a step's resolved fields.
//!
//! Every constraint travels with its [`FieldSpec`](crate::schema::FieldSpec),
//! so conditional fields added by the catalog are validated without any
//! separate registration.

pub mod gate;
pub mod rules;

pub use gate::{ErrorKind, ValidationGate, ValidationOutcome, WarningKind};
pub use rules::{CustomRule, RuleRegistry};
