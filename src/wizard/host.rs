//! WizardHost: the caller-side collaborator a wizard hands control back to.

use async_trait::async_trait;

use crate::draft::Draft;
use crate::error::CompletionError;

/// Receives the outcome of a wizard session.
///
/// `on_complete` is the only route to persistence; the wizard never stores
/// a draft itself. A failed completion leaves the session on its final step
/// with the draft intact, so the same call can be retried.
#[async_trait]
pub trait WizardHost: Send + Sync {
    /// Persist or submit the finished draft.
    async fn on_complete(&self, draft: &Draft) -> Result<(), CompletionError>;

    /// The user cancelled. Persisting the draft is up to the host.
    fn on_cancel(&self, _draft: &Draft) {}

    /// The user went back from the first step.
    fn on_exit(&self) {}
}
