//! Field schema: which fields each wizard step shows for a taxonomy key.
//!
//! Conditional fields are table-driven: a [`ConditionalFieldGroup`] carries
//! its own predicates over the [`TaxonomyKey`], and
//! [`WizardDefinition::resolve_fields`] evaluates them once per step.

pub mod builtin;
pub mod catalog;
pub mod definition;
pub mod field;
pub mod taxonomy;

pub use catalog::FieldSchemaCatalog;
pub use definition::{
    ConditionalFieldGroup, EnrichmentTrigger, ResolvedFields, StepDefinition, WizardDefinition,
};
pub use field::{Constraint, FieldKind, FieldSpec};
pub use taxonomy::{TaxonomyKey, TaxonomyPredicate};
