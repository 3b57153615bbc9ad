//! Enrichment: optional, advisory suggestions fed by draft fields.
//!
//! Lookups never block the wizard: a failed or missing lookup only leaves
//! the suggestion list empty.

pub mod keywords;
pub mod provider;
pub mod service;

pub use keywords::StaticKeywordProvider;
pub use provider::{FnProvider, LookupFuture, SuggestionProvider, SuggestionQuery};
pub use service::{EnrichmentService, SuggestionState, SuggestionStatus};
