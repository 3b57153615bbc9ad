//! Wizard: one session walking a user through a definition's steps.

pub mod host;
pub mod machine;
pub mod state;

pub use host::WizardHost;
pub use machine::{Advanced, Retreat, WizardStateMachine, WizardStatus};
pub use state::{WizardAction, WizardPhase, WizardState};
