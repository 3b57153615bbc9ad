//! Field specifications: what a field is and which rules it carries.

use serde::{Deserialize, Serialize};

use crate::draft::{FieldPath, FieldValue};

use super::taxonomy::TaxonomyPredicate;

/// Input shape of a field. Some kinds imply a format check (`Email`,
/// `Phone`, `Number`, `Date`, `Select`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    LongText,
    Email,
    Phone,
    Number,
    Boolean,
    /// ISO-8601 calendar date (`YYYY-MM-DD`).
    Date,
    Select {
        options: Vec<String>,
    },
    /// Checklist stored as a list of strings. `unique` marks the list as a
    /// set, which makes adding an existing item a no-op.
    MultiSelect {
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        unique: bool,
    },
}

impl FieldKind {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::MultiSelect { unique: true, .. })
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::MultiSelect { .. })
    }

    /// Turn raw text input into a value of this kind. Returns `None` when the
    /// input cannot be represented (e.g. `"abc"` for a number).
    pub fn parse_input(&self, raw: &str) -> Option<FieldValue> {
        let raw = raw.trim();
        match self {
            Self::Number => {
                if let Ok(n) = raw.parse::<i64>() {
                    return Some(FieldValue::from(n));
                }
                raw.parse::<f64>().ok().and_then(FieldValue::from_f64)
            }
            Self::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(FieldValue::Bool(true)),
                "false" | "no" | "n" | "0" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            Self::MultiSelect { .. } => Some(FieldValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            _ => Some(FieldValue::from(raw)),
        }
    }
}

/// A rule attached to a field.
///
/// Hard rules block `Next`/`Complete`. `Recommended` and `RecommendedItems`
/// are soft: they only produce warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Constraint {
    Required,
    Recommended,
    Email,
    Phone,
    NumberRange {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    MinLength {
        min: usize,
    },
    MaxLength {
        max: usize,
    },
    MinItems {
        min: usize,
    },
    RecommendedItems {
        min: usize,
    },
    OneOf {
        options: Vec<String>,
    },
    /// Named rule looked up in the [`RuleRegistry`](crate::validation::RuleRegistry).
    Custom {
        name: String,
    },
}

impl Constraint {
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Recommended | Self::RecommendedItems { .. })
    }
}

/// One field as rendered on a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub path: FieldPath,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    /// The field becomes required when the session key matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_when: Option<TaxonomyPredicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl FieldSpec {
    pub fn new(section: &str, field: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            path: FieldPath::new(section, field),
            label: label.to_string(),
            kind,
            constraints: Vec::new(),
            required_when: None,
            help: None,
        }
    }

    pub fn text(section: &str, field: &str, label: &str) -> Self {
        Self::new(section, field, label, FieldKind::Text)
    }

    pub fn long_text(section: &str, field: &str, label: &str) -> Self {
        Self::new(section, field, label, FieldKind::LongText)
    }

    pub fn number(section: &str, field: &str, label: &str) -> Self {
        Self::new(section, field, label, FieldKind::Number)
    }

    pub fn select(section: &str, field: &str, label: &str, options: &[&str]) -> Self {
        Self::new(
            section,
            field,
            label,
            FieldKind::Select {
                options: options.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    pub fn checklist(section: &str, field: &str, label: &str, options: &[&str]) -> Self {
        Self::new(
            section,
            field,
            label,
            FieldKind::MultiSelect {
                options: options.iter().map(|s| s.to_string()).collect(),
                unique: true,
            },
        )
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn required(self) -> Self {
        self.with(Constraint::Required)
    }

    pub fn recommended(self) -> Self {
        self.with(Constraint::Recommended)
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.with(Constraint::NumberRange {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn rule(self, name: &str) -> Self {
        self.with(Constraint::Custom {
            name: name.to_string(),
        })
    }

    pub fn required_when(mut self, predicate: TaxonomyPredicate) -> Self {
        self.required_when = Some(predicate);
        self
    }

    pub fn help(mut self, text: &str) -> Self {
        self.help = Some(text.to_string());
        self
    }

    pub fn is_required(&self) -> bool {
        self.constraints.contains(&Constraint::Required)
    }

    /// Names of the custom rules this field references.
    pub fn custom_rules(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Custom { name } => Some(name.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_input() {
        let kind = FieldKind::Number;
        assert_eq!(kind.parse_input("12"), Some(FieldValue::from(12)));
        assert_eq!(kind.parse_input("2.5").unwrap().as_f64(), Some(2.5));
        assert_eq!(kind.parse_input("twelve"), None);
    }

    #[test]
    fn parse_boolean_input() {
        assert_eq!(FieldKind::Boolean.parse_input("Yes"), Some(FieldValue::Bool(true)));
        assert_eq!(FieldKind::Boolean.parse_input("0"), Some(FieldValue::Bool(false)));
        assert_eq!(FieldKind::Boolean.parse_input("maybe"), None);
    }

    #[test]
    fn parse_checklist_input() {
        let kind = FieldKind::MultiSelect {
            options: vec![],
            unique: true,
        };
        let value = kind.parse_input("EMIS, ICE,, SystmOne").unwrap();
        assert_eq!(value.as_list().unwrap().len(), 3);
        assert!(kind.is_set());
        assert!(kind.is_list());
    }

    #[test]
    fn builder_collects_constraints() {
        let spec = FieldSpec::number("experience", "years_experience", "Years")
            .required()
            .range(0.0, 60.0)
            .rule("whole_number");
        assert!(spec.is_required());
        assert_eq!(spec.constraints.len(), 3);
        assert_eq!(spec.custom_rules().collect::<Vec<_>>(), vec!["whole_number"]);
    }

    #[test]
    fn field_spec_json_shape() {
        let json = r#"{
            "path": "experience.nhs_systems",
            "label": "NHS systems used",
            "kind": { "type": "multi_select", "options": ["EMIS", "ICE"], "unique": true },
            "constraints": [ { "rule": "recommended_items", "min": 1 } ]
        }"#;
        let spec: FieldSpec = serde_json::from_str(json).unwrap();
        assert!(spec.kind.is_set());
        assert_eq!(spec.constraints, vec![Constraint::RecommendedItems { min: 1 }]);
        assert!(spec.constraints[0].is_soft());
        assert!(spec.required_when.is_none());
    }
}
