//! Field values stored in a draft.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single answer.
///
/// Limited to the shapes that round-trip losslessly through JSON: booleans,
/// numbers, strings, lists of strings and nested objects. Numbers keep their
/// JSON representation, so `5` stays `5` and never becomes `5.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<String>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Build a numeric value from a float. Returns `None` for NaN/infinity.
    pub fn from_f64(n: f64) -> Option<Self> {
        serde_json::Number::from_f64(n).map(Self::Number)
    }

    /// Whether the value counts as "not answered".
    ///
    /// Blank text, empty lists and empty objects are empty; booleans and
    /// numbers never are.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bool(_) | Self::Number(_) => false,
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Object(map) => map.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric view. Text that parses as a number is accepted, since most
    /// inputs arrive as strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Flat string form used for enrichment queries and terminal output.
    pub fn display(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(", "),
            Self::Object(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}
