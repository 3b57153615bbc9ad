//! Draft document: the single answer set accumulated across wizard steps.
//!
//! A `Draft` is an immutable value. Every write goes through
//! [`Draft::apply`], which returns a new draft that shares all untouched
//! sections with its predecessor. Navigating between steps therefore never
//! loses answers, and two fields can never alias the same storage.

pub mod path;
pub mod store;
pub mod value;

pub use path::FieldPath;
pub use store::{Draft, DraftUpdate, Section};
pub use value::FieldValue;
