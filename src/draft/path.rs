//! Field addressing.

use serde::{Deserialize, Serialize};

/// Location of a field within a draft, as a `(section, field)` pair.
///
/// Serialized as the dotted string `"section.field"` so it can be used as a
/// JSON object key. The section name never contains a `.`; the field name may.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    pub section: String,
    pub field: String,
}

impl FieldPath {
    /// A dotted `section` is split at its first `.` and the rest moves onto
    /// the field, so `new("links.orcid", "url")` is `links` / `orcid.url`,
    /// the same path `"links.orcid.url"` parses to.
    pub fn new(section: impl Into<String>, field: impl Into<String>) -> Self {
        let mut section = section.into();
        let mut field = field.into();
        if let Some(dot) = section.find('.') {
            field = format!("{}.{field}", &section[dot + 1..]);
            section.truncate(dot);
        }
        Self { section, field }
    }

    /// Parse dotted notation (`experience.specialty`).
    pub fn parse(raw: &str) -> Option<Self> {
        let (section, field) = raw.trim().split_once('.')?;
        let (section, field) = (section.trim(), field.trim());
        if section.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self::new(section, field))
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section, self.field)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid field path '{value}', expected section.field"))
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn parse_and_display_agree() {
        let path = FieldPath::parse("experience.first_uk_exposure").unwrap();
        assert_eq!(path.section, "experience");
        assert_eq!(path.field, "first_uk_exposure");
        assert_eq!(path.to_string(), "experience.first_uk_exposure");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(FieldPath::parse("experience").is_none());
        assert!(FieldPath::parse(".field").is_none());
        assert!(FieldPath::parse("section.").is_none());
        assert!(FieldPath::parse("").is_none());
    }

    #[test]
    fn field_may_contain_dots() {
        let path = FieldPath::parse("links.orcid.url").unwrap();
        assert_eq!(path.section, "links");
        assert_eq!(path.field, "orcid.url");
    }

    #[test]
    fn dotted_section_is_stored_as_it_parses() {
        let path = FieldPath::new("links.orcid", "url");
        assert_eq!(path.section, "links");
        assert_eq!(path.field, "orcid.url");
        assert_eq!(FieldPath::parse(&path.to_string()), Some(path.clone()));

        let mut map = BTreeMap::new();
        map.insert(path.clone(), "FormatInvalid");
        let json = serde_json::to_string(&map).unwrap();
        let parsed: BTreeMap<FieldPath, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.get(&path).map(String::as_str), Some("FormatInvalid"));
    }

    #[test]
    fn usable_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(FieldPath::new("personal", "email"), 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"personal.email":1}"#);

        let parsed: BTreeMap<FieldPath, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.get(&FieldPath::new("personal", "email")), Some(&1));
    }

    #[test]
    fn deserialize_rejects_undotted_string() {
        let err = serde_json::from_str::<FieldPath>("\"nodot\"");
        assert!(err.is_err());
    }
}
