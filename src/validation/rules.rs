//! Named custom validation rules.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::draft::{Draft, FieldValue};

/// A pure predicate over a field value and the surrounding draft.
pub type CustomRule = Arc<dyn Fn(&FieldValue, &Draft) -> bool + Send + Sync>;

/// Custom rules referenced by `Constraint::Custom { name }`.
#[derive(Clone)]
pub struct RuleRegistry {
    rules: HashMap<String, CustomRule>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RuleRegistry").field("rules", &names).finish()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleRegistry {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Registry with the rules used by the built-in wizards, with
    /// `future_date` measured from today's UTC date.
    pub fn builtin() -> Self {
        Self::builtin_as_of(Utc::now().date_naive())
    }

    /// Built-in rules with `future_date` measured from `today`. The date is
    /// fixed for the life of the registry, so a gate built from it gives the
    /// same answer for the same draft.
    pub fn builtin_as_of(today: NaiveDate) -> Self {
        let mut registry = Self::empty();
        registry.register("gmc_number", |value, _| {
            value
                .as_str()
                .map(str::trim)
                .is_some_and(|s| s.len() == 7 && s.bytes().all(|b| b.is_ascii_digit()))
        });
        registry.register("iso_date", |value, _| value.as_str().and_then(parse_date).is_some());
        registry.register("future_date", move |value, _| {
            value
                .as_str()
                .and_then(parse_date)
                .is_some_and(|date| date > today)
        });
        registry.register("accepted", |value, _| value.as_bool() == Some(true));
        registry.register("non_blank_list", |value, _| {
            value
                .as_list()
                .is_some_and(|items| items.iter().all(|item| !item.trim().is_empty()))
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, rule: F)
    where
        F: Fn(&FieldValue, &Draft) -> bool + Send + Sync + 'static,
    {
        self.rules.insert(name.to_string(), Arc::new(rule));
    }

    pub fn get(&self, name: &str) -> Option<&CustomRule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }
}

/// Parse an ISO-8601 calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &str, value: FieldValue) -> bool {
        let registry = RuleRegistry::builtin();
        let rule = registry.get(name).unwrap();
        rule(&value, &Draft::new())
    }

    #[test]
    fn gmc_number_requires_seven_digits() {
        assert!(check("gmc_number", "7123456".into()));
        assert!(check("gmc_number", " 7123456 ".into()));
        assert!(!check("gmc_number", "712345".into()));
        assert!(!check("gmc_number", "71234A6".into()));
        assert!(!check("gmc_number", FieldValue::from(7123456)));
    }

    #[test]
    fn date_rules() {
        assert!(check("iso_date", "2024-02-29".into()));
        assert!(!check("iso_date", "2023-02-29".into()));
        assert!(!check("iso_date", "29/02/2024".into()));
        assert!(check("future_date", "2999-01-01".into()));
        assert!(!check("future_date", "2000-01-01".into()));
    }

    #[test]
    fn future_date_is_measured_from_the_registry_date() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let registry = RuleRegistry::builtin_as_of(today);
        let rule = registry.get("future_date").unwrap();
        let draft = Draft::new();

        assert!(rule(&"2025-03-02".into(), &draft));
        assert!(!rule(&"2025-03-01".into(), &draft));
        assert!(!rule(&"2025-02-28".into(), &draft));

        let later = RuleRegistry::builtin_as_of(NaiveDate::from_ymd_opt(2025, 3, 5).unwrap());
        assert!(!later.get("future_date").unwrap()(&"2025-03-02".into(), &draft));
    }

    #[test]
    fn accepted_and_non_blank_list() {
        assert!(check("accepted", true.into()));
        assert!(!check("accepted", false.into()));
        assert!(check("non_blank_list", vec!["passport".to_string()].into()));
        assert!(!check("non_blank_list", vec!["passport".to_string(), " ".to_string()].into()));
    }

    #[test]
    fn custom_rules_can_read_the_draft() {
        use crate::draft::FieldPath;

        let mut registry = RuleRegistry::empty();
        registry.register("matches_email", |value, draft| {
            draft.get(&FieldPath::new("personal", "email")) == Some(value)
        });
        let draft = Draft::new().set(FieldPath::new("personal", "email"), "a@nhs.net");
        let rule = registry.get("matches_email").unwrap();
        assert!(rule(&"a@nhs.net".into(), &draft));
        assert!(!rule(&"b@nhs.net".into(), &draft));
        assert!(!registry.contains("gmc_number"));
    }
}
