//! Intake Wizard: reusable core for multi-step, taxonomy-driven intake forms.

pub mod config;
pub mod draft;
pub mod enrichment;
pub mod error;
pub mod schema;
pub mod validation;
pub mod wizard;
