//! Taxonomy keys and the predicates that select conditional field groups.

use serde::{Deserialize, Serialize};

/// Applicant category selecting which conditional fields a session shows.
///
/// Fixed for the lifetime of one wizard session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxonomyKey {
    pub pathway_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

impl TaxonomyKey {
    pub fn new(pathway_id: impl Into<String>, template_id: Option<&str>) -> Self {
        Self {
            pathway_id: pathway_id.into(),
            template_id: template_id.map(String::from),
        }
    }

    /// Key with a pathway and no template.
    pub fn pathway(pathway_id: impl Into<String>) -> Self {
        Self::new(pathway_id, None)
    }

    pub fn template(&self) -> Option<&str> {
        self.template_id.as_deref()
    }
}

impl std::fmt::Display for TaxonomyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.template_id {
            Some(template) => write!(f, "{}/{}", self.pathway_id, template),
            None => write!(f, "{}", self.pathway_id),
        }
    }
}

/// Declarative condition over a [`TaxonomyKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaxonomyPredicate {
    Always,
    PathwayIs(String),
    PathwayIn(Vec<String>),
    TemplateIs(String),
    TemplateIn(Vec<String>),
    /// Any template is selected.
    HasTemplate,
    All(Vec<TaxonomyPredicate>),
    AnyOf(Vec<TaxonomyPredicate>),
    Not(Box<TaxonomyPredicate>),
}

impl TaxonomyPredicate {
    pub fn pathway(id: &str) -> Self {
        Self::PathwayIs(id.to_string())
    }

    pub fn pathways(ids: &[&str]) -> Self {
        Self::PathwayIn(ids.iter().map(|s| s.to_string()).collect())
    }

    pub fn template(id: &str) -> Self {
        Self::TemplateIs(id.to_string())
    }

    pub fn and(self, other: TaxonomyPredicate) -> Self {
        match self {
            Self::All(mut parts) => {
                parts.push(other);
                Self::All(parts)
            }
            first => Self::All(vec![first, other]),
        }
    }

    pub fn matches(&self, key: &TaxonomyKey) -> bool {
        match self {
            Self::Always => true,
            Self::PathwayIs(id) => key.pathway_id == *id,
            Self::PathwayIn(ids) => ids.iter().any(|id| key.pathway_id == *id),
            Self::TemplateIs(id) => key.template() == Some(id.as_str()),
            Self::TemplateIn(ids) => key
                .template()
                .is_some_and(|t| ids.iter().any(|id| id == t)),
            Self::HasTemplate => key.template_id.is_some(),
            Self::All(parts) => parts.iter().all(|p| p.matches(key)),
            Self::AnyOf(parts) => parts.iter().any(|p| p.matches(key)),
            Self::Not(inner) => !inner.matches(key),
        }
    }
}
