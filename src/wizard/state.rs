//! Wizard state table: which phase the session is in and what it carries.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::draft::{Draft, FieldPath};
use crate::validation::{ErrorKind, WarningKind};

/// The phases of a wizard session.
///
/// `Editing(i)` moves between steps; the last step can go to `Submitting`,
/// which either finishes in `Completed` or falls back to `Editing` on a
/// failed submission. `Cancelled` is reachable from any editing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WizardPhase {
    Editing { step: usize },
    Submitting,
    Completed,
    Cancelled,
}

impl WizardPhase {
    /// Check if a transition from `self` to `target` is valid for a wizard
    /// with `step_count` steps.
    pub fn can_transition_to(&self, target: WizardPhase, step_count: usize) -> bool {
        use WizardPhase::*;
        let last = step_count.saturating_sub(1);
        match (*self, target) {
            (Editing { step: from }, Editing { step: to }) => {
                from != to && from < step_count && to < step_count
            }
            (Editing { step }, Submitting) => step == last,
            (Editing { .. }, Cancelled) => true,
            (Submitting, Completed) => true,
            (Submitting, Editing { step }) => step == last,
            _ => false,
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn step(&self) -> Option<usize> {
        match self {
            Self::Editing { step } => Some(*step),
            _ => None,
        }
    }
}

impl Default for WizardPhase {
    fn default() -> Self {
        Self::Editing { step: 0 }
    }
}

impl std::fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Editing { step } => write!(f, "editing step {step}"),
            Self::Submitting => write!(f, "submitting"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Transition requests, named for error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Next,
    Previous,
    GoTo(usize),
    Complete,
    Cancel,
    Edit,
    Resume,
}

impl std::fmt::Display for WizardAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Next => write!(f, "advance"),
            Self::Previous => write!(f, "go back"),
            Self::GoTo(i) => write!(f, "jump to step {i}"),
            Self::Complete => write!(f, "complete"),
            Self::Cancel => write!(f, "cancel"),
            Self::Edit => write!(f, "edit"),
            Self::Resume => write!(f, "resume"),
        }
    }
}

/// Session data owned by the state machine.
///
/// Serializable so a host can snapshot an in-progress session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WizardState {
    pub current_step_index: usize,
    pub draft: Draft,
    /// Blocking errors from the last validation of the current step.
    pub validation_errors: BTreeMap<FieldPath, ErrorKind>,
    /// Advisory warnings from the last validation of the current step.
    pub warnings: BTreeMap<FieldPath, WarningKind>,
    /// Steps the user has entered at least once.
    pub visited: BTreeSet<usize>,
    /// Message from the last failed submission, cleared on the next attempt.
    pub completion_failure: Option<String>,
}

impl WizardState {
    pub fn new(draft: Draft, step: usize) -> Self {
        Self {
            current_step_index: step,
            draft,
            visited: BTreeSet::from([step]),
            ..Self::default()
        }
    }

    /// Drop feedback that belongs to the step being left.
    pub fn clear_feedback(&mut self) {
        self.validation_errors.clear();
        self.warnings.clear();
    }

    pub fn enter_step(&mut self, step: usize) {
        self.current_step_index = step;
        self.visited.insert(step);
        self.clear_feedback();
    }
}
