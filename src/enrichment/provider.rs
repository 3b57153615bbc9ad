//! Suggestion providers: the injected lookup behind enrichment.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::draft::{Draft, FieldPath};
use crate::error::EnrichmentError;

/// Values of the trigger fields at the moment a lookup was requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestionQuery {
    pub values: Vec<String>,
}

impl SuggestionQuery {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a query from the draft. `None` if any trigger field is empty.
    pub fn from_draft(fields: &[FieldPath], draft: &Draft) -> Option<Self> {
        let values = fields
            .iter()
            .map(|path| {
                draft
                    .get(path)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.display().trim().to_string())
            })
            .collect::<Option<Vec<_>>>()?;
        if values.is_empty() {
            return None;
        }
        Some(Self { values })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}

impl std::fmt::Display for SuggestionQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.values.join(" / "))
    }
}

/// Source of suggestions for a query (keyword search, taxonomy service, ...).
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    fn name(&self) -> &str {
        "suggestions"
    }

    async fn suggest(&self, query: &SuggestionQuery) -> Result<Vec<String>, EnrichmentError>;
}

/// Boxed future returned by closure-backed providers.
pub type LookupFuture = BoxFuture<'static, Result<Vec<String>, EnrichmentError>>;

/// Adapts a closure into a [`SuggestionProvider`].
pub struct FnProvider<F> {
    lookup: F,
}

impl<F> FnProvider<F>
where
    F: Fn(SuggestionQuery) -> LookupFuture + Send + Sync,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl<F> SuggestionProvider for FnProvider<F>
where
    F: Fn(SuggestionQuery) -> LookupFuture + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    async fn suggest(&self, query: &SuggestionQuery) -> Result<Vec<String>, EnrichmentError> {
        (self.lookup)(query.clone()).await
    }
}
