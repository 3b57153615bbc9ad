//! ValidationGate: decides whether a step's resolved fields are satisfied.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::draft::{Draft, FieldPath, FieldValue};
use crate::error::CatalogError;
use crate::schema::{Constraint, FieldKind, FieldSpec, WizardDefinition};

use super::rules::{RuleRegistry, parse_date};

/// Why a field blocks advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Missing,
    FormatInvalid,
    OutOfRange,
    CustomRuleFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Missing => "required",
            Self::FormatInvalid => "invalid format",
            Self::OutOfRange => "out of range",
            Self::CustomRuleFailed => "not accepted",
        };
        write!(f, "{s}")
    }
}

/// Advisory feedback that never blocks a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    EmptyRecommended,
    BelowRecommendedItems,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EmptyRecommended => "recommended",
            Self::BelowRecommendedItems => "add a few more",
        };
        write!(f, "{s}")
    }
}

/// Result of checking one step. The step may be left when `errors` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub errors: BTreeMap<FieldPath, ErrorKind>,
    pub warnings: BTreeMap<FieldPath, WarningKind>,
}

impl ValidationOutcome {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Pure, side-effect-free field checker.
#[derive(Debug, Clone)]
pub struct ValidationGate {
    rules: Arc<RuleRegistry>,
    email: Regex,
    phone: Regex,
}

impl Default for ValidationGate {
    fn default() -> Self {
        Self::new(RuleRegistry::builtin())
    }
}

impl ValidationGate {
    pub fn new(rules: RuleRegistry) -> Self {
        Self {
            rules: Arc::new(rules),
            email: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"),
            phone: Regex::new(r"^\+?[0-9 ()\-]{7,20}$").expect("static phone pattern"),
        }
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Check every resolved field of a step against the draft.
    pub fn can_advance(&self, step_id: &str, fields: &[FieldSpec], draft: &Draft) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        for spec in fields {
            let (error, warning) = self.check_field(spec, draft);
            if let Some(kind) = error {
                outcome.errors.insert(spec.path.clone(), kind);
            }
            if let Some(kind) = warning {
                outcome.warnings.insert(spec.path.clone(), kind);
            }
        }
        debug!(
            step_id,
            errors = outcome.errors.len(),
            warnings = outcome.warnings.len(),
            "Validated step"
        );
        outcome
    }

    /// Check a single field. Returns the first blocking error and any warning.
    pub fn check_field(&self, spec: &FieldSpec, draft: &Draft) -> (Option<ErrorKind>, Option<WarningKind>) {
        let Some(value) = draft.get(&spec.path).filter(|v| !v.is_empty()) else {
            if spec.is_required() {
                return (Some(ErrorKind::Missing), None);
            }
            let soft = spec.constraints.iter().any(Constraint::is_soft);
            return (None, soft.then_some(WarningKind::EmptyRecommended));
        };

        if let Some(kind) = self.check_kind(&spec.kind, value) {
            return (Some(kind), None);
        }

        let mut warning = None;
        for constraint in &spec.constraints {
            match self.check_constraint(spec, constraint, value, draft) {
                Check::Pass => {}
                Check::Fail(kind) => return (Some(kind), warning),
                Check::Warn(kind) => warning = Some(kind),
            }
        }
        (None, warning)
    }

    /// Fail if any field in the definition names a rule this gate lacks.
    pub fn ensure_rules(&self, definition: &WizardDefinition) -> Result<(), CatalogError> {
        for spec in definition.all_fields() {
            if let Some(rule) = spec.custom_rules().find(|r| !self.rules.contains(r)) {
                return Err(CatalogError::UnknownRule {
                    field: spec.path.to_string(),
                    rule: rule.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_kind(&self, kind: &FieldKind, value: &FieldValue) -> Option<ErrorKind> {
        let ok = match kind {
            FieldKind::Text | FieldKind::LongText => value.as_str().is_some(),
            FieldKind::Email => value.as_str().is_some_and(|s| self.is_email(s)),
            FieldKind::Phone => value.as_str().is_some_and(|s| self.is_phone(s)),
            FieldKind::Number => value.as_f64().is_some(),
            FieldKind::Boolean => value.as_bool().is_some(),
            FieldKind::Date => value.as_str().and_then(parse_date).is_some(),
            FieldKind::Select { options } => value
                .as_str()
                .is_some_and(|s| options.is_empty() || options.iter().any(|o| o == s)),
            FieldKind::MultiSelect { options, .. } => value.as_list().is_some_and(|items| {
                options.is_empty() || items.iter().all(|item| options.contains(item))
            }),
        };
        (!ok).then_some(ErrorKind::FormatInvalid)
    }

    fn check_constraint(
        &self,
        spec: &FieldSpec,
        constraint: &Constraint,
        value: &FieldValue,
        draft: &Draft,
    ) -> Check {
        match constraint {
            Constraint::Required | Constraint::Recommended => Check::Pass,
            Constraint::Email => Check::fail_unless(
                value.as_str().is_some_and(|s| self.is_email(s)),
                ErrorKind::FormatInvalid,
            ),
            Constraint::Phone => Check::fail_unless(
                value.as_str().is_some_and(|s| self.is_phone(s)),
                ErrorKind::FormatInvalid,
            ),
            Constraint::NumberRange { min, max } => match value.as_f64() {
                None => Check::Fail(ErrorKind::FormatInvalid),
                Some(n) => Check::fail_unless(
                    min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m),
                    ErrorKind::OutOfRange,
                ),
            },
            Constraint::MinLength { min } => match value.as_str() {
                None => Check::Fail(ErrorKind::FormatInvalid),
                Some(s) => Check::fail_unless(s.trim().chars().count() >= *min, ErrorKind::OutOfRange),
            },
            Constraint::MaxLength { max } => match value.as_str() {
                None => Check::Fail(ErrorKind::FormatInvalid),
                Some(s) => Check::fail_unless(s.trim().chars().count() <= *max, ErrorKind::OutOfRange),
            },
            Constraint::MinItems { min } => match value.as_list() {
                None => Check::Fail(ErrorKind::FormatInvalid),
                Some(items) => Check::fail_unless(items.len() >= *min, ErrorKind::OutOfRange),
            },
            Constraint::RecommendedItems { min } => match value.as_list() {
                Some(items) if items.len() < *min => Check::Warn(WarningKind::BelowRecommendedItems),
                _ => Check::Pass,
            },
            Constraint::OneOf { options } => Check::fail_unless(
                value.as_str().is_some_and(|s| options.iter().any(|o| o == s)),
                ErrorKind::FormatInvalid,
            ),
            Constraint::Custom { name } => match self.rules.get(name) {
                Some(rule) => Check::fail_unless(rule(value, draft), ErrorKind::CustomRuleFailed),
                None => {
                    warn!(field = %spec.path, rule = %name, "Unregistered custom rule");
                    Check::Fail(ErrorKind::CustomRuleFailed)
                }
            },
        }
    }

    fn is_email(&self, s: &str) -> bool {
        self.email.is_match(s.trim())
    }

    fn is_phone(&self, s: &str) -> bool {
        let s = s.trim();
        let digits = s.bytes().filter(u8::is_ascii_digit).count();
        self.phone.is_match(s) && (7..=15).contains(&digits)
    }
}

enum Check {
    Pass,
    Fail(ErrorKind),
    Warn(WarningKind),
}

impl Check {
    fn fail_unless(ok: bool, kind: ErrorKind) -> Self {
        if ok { Self::Pass } else { Self::Fail(kind) }
    }
}
