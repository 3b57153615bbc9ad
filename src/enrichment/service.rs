//! EnrichmentService: debounced, last-request-wins suggestion lookups.
//!
//! Every change to the trigger tuple takes a new sequence number. A lookup
//! starts only after the debounce window passes without a newer change, and
//! its result is published only if its sequence number is still the latest.
//! Superseded lookups are aborted where possible; any result that still
//! arrives late is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WizardConfig;
use crate::draft::{Draft, FieldPath};
use crate::error::EnrichmentError;
use crate::schema::WizardDefinition;

use super::provider::{SuggestionProvider, SuggestionQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Latest published suggestions. An empty result list is always valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionState {
    pub query: Option<SuggestionQuery>,
    pub results: Vec<String>,
    pub status: SuggestionStatus,
    /// Sequence number of the request this state belongs to.
    pub seq: u64,
}

impl Default for SuggestionState {
    fn default() -> Self {
        Self {
            query: None,
            results: Vec::new(),
            status: SuggestionStatus::Idle,
            seq: 0,
        }
    }
}

/// State shared with spawned lookup tasks.
struct Shared {
    latest: AtomicU64,
    state: watch::Sender<SuggestionState>,
    max_suggestions: usize,
}

impl Shared {
    fn is_current(&self, seq: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == seq
    }

    /// Mark `seq` as loading. Returns false if it has been superseded.
    fn begin(&self, seq: u64, query: &SuggestionQuery) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(seq) {
                return false;
            }
            state.query = Some(query.clone());
            state.status = SuggestionStatus::Loading;
            state.seq = seq;
            true
        })
    }

    /// Publish the outcome of `seq`. Returns false if the result was stale.
    fn finish(&self, seq: u64, result: &Result<Vec<String>, EnrichmentError>) -> bool {
        let max = self.max_suggestions;
        let accepted = self.state.send_if_modified(|state| {
            if !self.is_current(seq) || state.seq != seq {
                return false;
            }
            match result {
                Ok(items) => {
                    state.results = normalize(items, max);
                    state.status = SuggestionStatus::Ready;
                }
                Err(_) => {
                    state.results.clear();
                    state.status = SuggestionStatus::Failed;
                }
            }
            true
        });

        if !accepted {
            debug!(seq, "Dropped stale suggestion result");
        } else if let Err(e) = result {
            warn!(seq, error = %e, "Suggestion lookup failed");
        }
        accepted
    }

    fn reset(&self, seq: u64) {
        self.state.send_replace(SuggestionState {
            seq,
            ..SuggestionState::default()
        });
    }
}

/// Trim, drop blanks, de-duplicate case-insensitively and cap.
fn normalize(items: &[String], max: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(max)
        .map(String::from)
        .collect()
}

/// Debounced suggestion lookups keyed off a tuple of draft fields.
pub struct EnrichmentService {
    trigger: Vec<FieldPath>,
    provider: Arc<dyn SuggestionProvider>,
    debounce: Duration,
    lookup_timeout: Duration,
    shared: Arc<Shared>,
    pending: Mutex<Option<JoinHandle<()>>>,
    last_query: Mutex<Option<SuggestionQuery>>,
}

impl EnrichmentService {
    pub fn new(
        trigger: Vec<FieldPath>,
        provider: Arc<dyn SuggestionProvider>,
        config: &WizardConfig,
    ) -> Self {
        let (state, _rx) = watch::channel(SuggestionState::default());
        Self {
            trigger,
            provider,
            debounce: config.debounce,
            lookup_timeout: config.lookup_timeout,
            shared: Arc::new(Shared {
                latest: AtomicU64::new(0),
                state,
                max_suggestions: config.max_suggestions,
            }),
            pending: Mutex::new(None),
            last_query: Mutex::new(None),
        }
    }

    /// Service for a wizard that declares an enrichment trigger.
    pub fn for_wizard(
        definition: &WizardDefinition,
        provider: Arc<dyn SuggestionProvider>,
        config: &WizardConfig,
    ) -> Option<Self> {
        let trigger = definition.enrichment.as_ref()?;
        info!(
            wizard = %definition.id,
            provider = provider.name(),
            fields = trigger.fields.len(),
            "Enrichment enabled"
        );
        Some(Self::new(trigger.fields.clone(), provider, config))
    }

    pub fn trigger_fields(&self) -> &[FieldPath] {
        &self.trigger
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.shared.state.subscribe()
    }

    pub fn snapshot(&self) -> SuggestionState {
        self.shared.state.borrow().clone()
    }

    /// React to a draft change. Schedules a lookup only when the trigger
    /// tuple actually changed; an incomplete tuple resets to `Idle`.
    pub fn on_draft_changed(&self, draft: &Draft) {
        let query = SuggestionQuery::from_draft(&self.trigger, draft);
        {
            let mut last = self.last_query.lock().unwrap_or_else(|e| e.into_inner());
            if *last == query {
                return;
            }
            *last = query.clone();
        }
        match query {
            Some(query) => {
                self.schedule(query);
            }
            None => self.cancel(),
        }
    }

    /// Start a debounced lookup, superseding any earlier one. Returns the
    /// request's sequence number.
    pub fn schedule(&self, query: SuggestionQuery) -> u64 {
        let seq = self.next_seq();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(seq, "No async runtime; suggestion lookup skipped");
            return seq;
        };

        let shared = Arc::clone(&self.shared);
        let provider = Arc::clone(&self.provider);
        let debounce = self.debounce;
        let lookup_timeout = self.lookup_timeout;

        debug!(seq, query = %query, "Suggestion lookup scheduled");
        let handle = runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            if !shared.begin(seq, &query) {
                return;
            }
            let result = match tokio::time::timeout(lookup_timeout, provider.suggest(&query)).await {
                Ok(result) => result,
                Err(_) => Err(EnrichmentError::Timeout(lookup_timeout)),
            };
            shared.finish(seq, &result);
        });

        self.replace_pending(Some(handle));
        seq
    }

    /// Mark a lookup as started without scheduling it, for hosts that run
    /// lookups themselves. Pair with [`resolve`](Self::resolve).
    pub fn begin_request(&self, query: SuggestionQuery) -> u64 {
        let seq = self.next_seq();
        self.replace_pending(None);
        self.shared.begin(seq, &query);
        seq
    }

    /// Deliver the result of request `seq`. Returns false if a newer request
    /// exists and the result was dropped.
    pub fn resolve(&self, seq: u64, result: Result<Vec<String>, EnrichmentError>) -> bool {
        self.shared.finish(seq, &result)
    }

    /// Abort any pending lookup and clear suggestions.
    pub fn cancel(&self) {
        let seq = self.next_seq();
        self.replace_pending(None);
        self.shared.reset(seq);
    }

    fn next_seq(&self) -> u64 {
        self.shared.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn replace_pending(&self, handle: Option<JoinHandle<()>>) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = std::mem::replace(&mut *pending, handle) {
            previous.abort();
        }
    }
}

impl Drop for EnrichmentService {
    fn drop(&mut self) {
        if let Some(handle) = self
            .pending
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}
