//! WizardStateMachine: step navigation, validation gating and submission.
//!
//! All edits and transitions are synchronous except `complete`, which awaits
//! the host's completion callback. The draft is only replaced through
//! [`Draft::apply`], so earlier answers survive every transition.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::draft::{Draft, DraftUpdate, FieldPath, FieldValue};
use crate::enrichment::{EnrichmentService, SuggestionState};
use crate::error::{CatalogError, TransitionError};
use crate::schema::{FieldSpec, ResolvedFields, StepDefinition, TaxonomyKey, WizardDefinition};
use crate::validation::{ErrorKind, ValidationGate, ValidationOutcome, WarningKind};

use super::host::WizardHost;
use super::state::{WizardAction, WizardPhase, WizardState};

/// Result of a successful `next`.
#[derive(Debug, Clone, PartialEq)]
pub struct Advanced {
    pub step: usize,
    /// Advisory warnings left on the step that was just passed.
    pub warnings: BTreeMap<FieldPath, WarningKind>,
}

/// Result of `previous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retreat {
    Step(usize),
    /// Back from the first step; the host's `on_exit` was called.
    Exited,
}

/// Serializable snapshot for rendering a progress indicator and the
/// current step.
#[derive(Debug, Clone, Serialize)]
pub struct WizardStatus {
    pub wizard_id: String,
    pub title: String,
    pub key: TaxonomyKey,
    pub phase: WizardPhase,
    pub step_index: usize,
    pub step_count: usize,
    pub step_id: String,
    pub step_title: String,
    pub progress_percent: u8,
    pub fields: Vec<FieldSpec>,
    pub groups: Vec<String>,
    pub errors: BTreeMap<FieldPath, ErrorKind>,
    pub warnings: BTreeMap<FieldPath, WarningKind>,
    pub completion_failure: Option<String>,
    pub visited: BTreeSet<usize>,
}

/// One wizard session for one taxonomy key.
pub struct WizardStateMachine {
    definition: Arc<WizardDefinition>,
    key: TaxonomyKey,
    gate: ValidationGate,
    host: Arc<dyn WizardHost>,
    enrichment: Option<Arc<EnrichmentService>>,
    phase: WizardPhase,
    state: WizardState,
    resolved: ResolvedFields,
}

impl WizardStateMachine {
    /// Start a session on the first step with an empty draft and the
    /// built-in rule set.
    pub fn new(
        definition: Arc<WizardDefinition>,
        key: TaxonomyKey,
        host: Arc<dyn WizardHost>,
    ) -> Result<Self, CatalogError> {
        Self::with_gate(definition, key, host, ValidationGate::default())
    }

    /// Start a session with a custom validation gate.
    ///
    /// Fails if the wizard has no steps or names a rule the gate lacks.
    pub fn with_gate(
        definition: Arc<WizardDefinition>,
        key: TaxonomyKey,
        host: Arc<dyn WizardHost>,
        gate: ValidationGate,
    ) -> Result<Self, CatalogError> {
        let Some(first) = definition.steps.first() else {
            return Err(CatalogError::NoSteps {
                wizard: definition.id.clone(),
            });
        };
        gate.ensure_rules(&definition)?;

        let resolved = definition.resolve_fields(&key, &first.id);
        info!(
            wizard = %definition.id,
            pathway = %key.pathway_id,
            template = key.template().unwrap_or("-"),
            steps = definition.step_count(),
            "Wizard session started"
        );

        Ok(Self {
            definition,
            key,
            gate,
            host,
            enrichment: None,
            phase: WizardPhase::default(),
            state: WizardState::new(Draft::new(), 0),
            resolved,
        })
    }

    /// Continue from a saved draft. `step` is clamped to the last step.
    ///
    /// Only an editing session can be resumed; a completed or cancelled one
    /// stays finished. Steps before `step` are not checked here, `complete`
    /// re-validates every step before submitting.
    pub fn resume(mut self, seed: Draft, step: usize) -> Result<Self, TransitionError> {
        self.editing_step(WizardAction::Resume)?;
        let step = step.min(self.definition.step_count() - 1);
        info!(wizard = %self.definition.id, step, fields = seed.len(), "Resuming wizard session");
        self.state = WizardState::new(seed, step);
        self.phase = WizardPhase::Editing { step };
        self.resolve_current();
        self.notify_enrichment();
        Ok(self)
    }

    /// Attach a suggestion service. Suggestions start from the current draft.
    pub fn with_enrichment(mut self, service: Arc<EnrichmentService>) -> Self {
        self.enrichment = Some(service);
        self.notify_enrichment();
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn definition(&self) -> &WizardDefinition {
        &self.definition
    }

    pub fn key(&self) -> &TaxonomyKey {
        &self.key
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn draft(&self) -> &Draft {
        &self.state.draft
    }

    pub fn current_step_index(&self) -> usize {
        self.state.current_step_index
    }

    pub fn current_step(&self) -> &StepDefinition {
        &self.definition.steps[self.state.current_step_index]
    }

    pub fn step_count(&self) -> usize {
        self.definition.step_count()
    }

    /// Fields of the current step, including active conditional groups.
    pub fn resolved_fields(&self) -> &ResolvedFields {
        &self.resolved
    }

    pub fn enrichment(&self) -> Option<&Arc<EnrichmentService>> {
        self.enrichment.as_ref()
    }

    pub fn suggestions(&self) -> Option<SuggestionState> {
        self.enrichment.as_ref().map(|e| e.snapshot())
    }

    pub fn field_error(&self, path: &FieldPath) -> Option<ErrorKind> {
        self.state.validation_errors.get(path).copied()
    }

    pub fn field_warning(&self, path: &FieldPath) -> Option<WarningKind> {
        self.state.warnings.get(path).copied()
    }

    pub fn completion_failure(&self) -> Option<&str> {
        self.state.completion_failure.as_deref()
    }

    pub fn into_draft(self) -> Draft {
        self.state.draft
    }

    // ── Editing ─────────────────────────────────────────────────────

    /// Apply one draft update. Errors on the touched fields are cleared
    /// until the next validation.
    pub fn update(&mut self, update: DraftUpdate) -> Result<(), TransitionError> {
        self.editing_step(WizardAction::Edit)?;
        for path in update.touched_paths() {
            self.state.validation_errors.remove(&path);
        }
        self.state.draft = self.state.draft.apply(update);
        self.notify_enrichment();
        Ok(())
    }

    pub fn set_field(&mut self, path: FieldPath, value: impl Into<FieldValue>) -> Result<(), TransitionError> {
        self.update(DraftUpdate::Set {
            path,
            value: value.into(),
        })
    }

    pub fn clear_field(&mut self, path: FieldPath) -> Result<(), TransitionError> {
        self.update(DraftUpdate::Clear(path))
    }

    pub fn merge(&mut self, partial: Draft) -> Result<(), TransitionError> {
        self.update(DraftUpdate::Merge(partial))
    }

    /// Append to a list field. Fields declared as sets ignore duplicates.
    pub fn add_item(&mut self, path: FieldPath, item: impl Into<String>) -> Result<(), TransitionError> {
        let unique = self
            .definition
            .field_spec(&path)
            .is_some_and(|spec| spec.kind.is_set());
        self.update(DraftUpdate::AddToArray {
            path,
            item: item.into(),
            unique,
        })
    }

    pub fn remove_item(&mut self, path: FieldPath, index: usize) -> Result<(), TransitionError> {
        self.update(DraftUpdate::RemoveFromArray { path, index })
    }

    /// Add a suggestion to the wizard's enrichment target field.
    pub fn accept_suggestion(&mut self, item: impl Into<String>) -> Result<(), TransitionError> {
        let Some(trigger) = self.definition.enrichment.as_ref() else {
            debug!(wizard = %self.definition.id, "Suggestion accepted without an enrichment target");
            return Ok(());
        };
        let target = trigger.target.clone();
        self.add_item(target, item)
    }

    // ── Validation ──────────────────────────────────────────────────

    /// Check the current step without moving, recording the feedback for
    /// inline display.
    pub fn validate_current(&mut self) -> ValidationOutcome {
        let outcome = self
            .gate
            .can_advance(&self.resolved.step_id, &self.resolved.fields, &self.state.draft);
        self.state.validation_errors = outcome.errors.clone();
        self.state.warnings = outcome.warnings.clone();
        outcome
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Advance one step if the current step validates.
    pub fn next(&mut self) -> Result<Advanced, TransitionError> {
        let step = self.editing_step(WizardAction::Next)?;
        if step + 1 >= self.step_count() {
            return Err(self.invalid(WizardAction::Next));
        }
        let outcome = self.require_valid(step)?;
        self.enter(step + 1);
        Ok(Advanced {
            step: step + 1,
            warnings: outcome.warnings,
        })
    }

    /// Go back one step. From the first step this hands control to the
    /// host instead.
    pub fn previous(&mut self) -> Result<Retreat, TransitionError> {
        let step = self.editing_step(WizardAction::Previous)?;
        if step == 0 {
            info!(wizard = %self.definition.id, "Exited from first step");
            self.host.on_exit();
            return Ok(Retreat::Exited);
        }
        self.enter(step - 1);
        Ok(Retreat::Step(step - 1))
    }

    /// Jump to a step. Backward jumps are always allowed; forward jumps
    /// advance one step at a time and stop at the first step that fails
    /// validation.
    pub fn go_to_step(&mut self, index: usize) -> Result<usize, TransitionError> {
        let step = self.editing_step(WizardAction::GoTo(index))?;
        let count = self.step_count();
        if index >= count {
            return Err(TransitionError::UnknownStep { index, count });
        }
        if index <= step {
            if index != step {
                self.enter(index);
            }
            return Ok(index);
        }
        while self.state.current_step_index < index {
            self.next()?;
        }
        Ok(index)
    }

    /// Validate every step and hand the draft to the host.
    ///
    /// If an earlier step no longer validates (a resumed draft, say) the
    /// session moves back to it and nothing is submitted. On a host failure
    /// the session returns to the final step with the draft untouched and
    /// the failure recorded; calling `complete` again retries. Dropping the
    /// returned future mid-submission also returns to the final step.
    pub async fn complete(&mut self) -> Result<Draft, TransitionError> {
        let step = self.editing_step(WizardAction::Complete)?;
        if step + 1 != self.step_count() {
            return Err(self.invalid(WizardAction::Complete));
        }
        self.require_valid(step)?;
        if let Some(earlier) = self.first_invalid_step() {
            debug!(wizard = %self.definition.id, step = earlier, "Completion blocked by an earlier step");
            self.enter(earlier);
            self.require_valid(earlier)?;
        }

        self.transition(WizardPhase::Submitting);
        self.state.completion_failure = None;

        let host = Arc::clone(&self.host);
        let result = {
            let guard = SubmitGuard {
                phase: &mut self.phase,
                step,
            };
            let result = host.on_complete(&self.state.draft).await;
            guard.settle(if result.is_ok() {
                WizardPhase::Completed
            } else {
                WizardPhase::Editing { step }
            });
            result
        };

        match result {
            Ok(()) => {
                if let Some(enrichment) = &self.enrichment {
                    enrichment.cancel();
                }
                info!(
                    wizard = %self.definition.id,
                    fields = self.state.draft.len(),
                    "Wizard completed"
                );
                Ok(self.state.draft.clone())
            }
            Err(e) => {
                warn!(wizard = %self.definition.id, error = %e, "Completion failed, draft retained");
                self.state.completion_failure = Some(e.to_string());
                Err(TransitionError::Completion(e))
            }
        }
    }

    /// Leave without submitting. Returns the draft so the caller can keep it.
    pub fn cancel(&mut self) -> Result<Draft, TransitionError> {
        self.editing_step(WizardAction::Cancel)?;
        self.transition(WizardPhase::Cancelled);
        if let Some(enrichment) = &self.enrichment {
            enrichment.cancel();
        }
        self.host.on_cancel(&self.state.draft);
        info!(wizard = %self.definition.id, "Wizard cancelled");
        Ok(self.state.draft.clone())
    }

    pub fn status(&self) -> WizardStatus {
        let step = self.current_step();
        let count = self.step_count();
        let progress_percent = match self.phase {
            WizardPhase::Completed => 100,
            _ => (self.state.current_step_index * 100 / count) as u8,
        };
        WizardStatus {
            wizard_id: self.definition.id.clone(),
            title: self.definition.title.clone(),
            key: self.key.clone(),
            phase: self.phase,
            step_index: self.state.current_step_index,
            step_count: count,
            step_id: step.id.clone(),
            step_title: step.title.clone(),
            progress_percent,
            fields: self.resolved.fields.clone(),
            groups: self.resolved.groups.clone(),
            errors: self.state.validation_errors.clone(),
            warnings: self.state.warnings.clone(),
            completion_failure: self.state.completion_failure.clone(),
            visited: self.state.visited.clone(),
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn editing_step(&self, action: WizardAction) -> Result<usize, TransitionError> {
        match self.phase {
            WizardPhase::Editing { step } => Ok(step),
            phase if phase.is_terminal() => Err(TransitionError::Terminal {
                phase: phase.to_string(),
            }),
            _ => Err(self.invalid(action)),
        }
    }

    fn invalid(&self, action: WizardAction) -> TransitionError {
        TransitionError::InvalidTransition {
            from: self.phase.to_string(),
            action: action.to_string(),
        }
    }

    fn require_valid(&mut self, step: usize) -> Result<ValidationOutcome, TransitionError> {
        let outcome = self.validate_current();
        if outcome.passed() {
            return Ok(outcome);
        }
        debug!(
            wizard = %self.definition.id,
            step_id = %self.resolved.step_id,
            step,
            errors = outcome.errors.len(),
            "Advance blocked by validation"
        );
        Err(TransitionError::ValidationFailed {
            step_id: self.resolved.step_id.clone(),
            error_count: outcome.errors.len(),
        })
    }

    /// Index of the first step whose fields do not validate against the
    /// current draft.
    fn first_invalid_step(&self) -> Option<usize> {
        self.definition.steps.iter().position(|step| {
            let resolved = self.definition.resolve_fields(&self.key, &step.id);
            !self
                .gate
                .can_advance(&step.id, &resolved.fields, &self.state.draft)
                .passed()
        })
    }

    fn enter(&mut self, step: usize) {
        let from = self.state.current_step_index;
        self.transition(WizardPhase::Editing { step });
        self.state.enter_step(step);
        self.resolve_current();
        info!(
            wizard = %self.definition.id,
            from,
            to = step,
            step_id = %self.resolved.step_id,
            groups = self.resolved.groups.len(),
            "Step changed"
        );
    }

    fn transition(&mut self, target: WizardPhase) {
        debug_assert!(
            self.phase.can_transition_to(target, self.step_count()),
            "illegal transition {} -> {}",
            self.phase,
            target
        );
        self.phase = target;
    }

    fn resolve_current(&mut self) {
        let step_id = &self.definition.steps[self.state.current_step_index].id;
        self.resolved = self.definition.resolve_fields(&self.key, step_id);
    }

    fn notify_enrichment(&self) {
        if let Some(enrichment) = &self.enrichment {
            enrichment.on_draft_changed(&self.state.draft);
        }
    }
}

/// Holds the session in `Submitting` while the host runs. If the future is
/// dropped before `settle`, the session goes back to editing the last step.
struct SubmitGuard<'a> {
    phase: &'a mut WizardPhase,
    step: usize,
}

impl SubmitGuard<'_> {
    fn settle(self, outcome: WizardPhase) {
        *self.phase = outcome;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if *self.phase == WizardPhase::Submitting {
            warn!(step = self.step, "Submission abandoned before the host answered");
            *self.phase = WizardPhase::Editing { step: self.step };
        }
    }
}

impl std::fmt::Debug for WizardStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardStateMachine")
            .field("wizard", &self.definition.id)
            .field("key", &self.key)
            .field("phase", &self.phase)
            .field("step", &self.state.current_step_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::CompletionError;
    use crate::schema::builtin;

    #[derive(Default)]
    struct RecordingHost {
        completed: Mutex<Vec<Draft>>,
        cancelled: AtomicUsize,
        exited: AtomicUsize,
        fail_next: Mutex<Option<CompletionError>>,
    }

    #[async_trait]
    impl WizardHost for RecordingHost {
        async fn on_complete(&self, draft: &Draft) -> Result<(), CompletionError> {
            if let Some(e) = self.fail_next.lock().unwrap().take() {
                return Err(e);
            }
            self.completed.lock().unwrap().push(draft.clone());
            Ok(())
        }

        fn on_cancel(&self, _draft: &Draft) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }

        fn on_exit(&self) {
            self.exited.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn mentor(host: Arc<RecordingHost>) -> WizardStateMachine {
        WizardStateMachine::new(
            Arc::new(builtin::mentor_onboarding()),
            TaxonomyKey::pathway("uk-graduate"),
            host,
        )
        .unwrap()
    }

    fn fill_profile(wizard: &mut WizardStateMachine) {
        wizard.set_field(p("personal.full_name"), "Dr Priya Nair").unwrap();
        wizard.set_field(p("personal.email"), "priya@example.org").unwrap();
        wizard.set_field(p("personal.gmc_number"), "7012345").unwrap();
    }

    fn fill_expertise(wizard: &mut WizardStateMachine) {
        wizard.add_item(p("expertise.specialties"), "Cardiology").unwrap();
        wizard
            .set_field(
                p("expertise.bio"),
                "Cardiology registrar who has mentored IMGs through PLAB and ST3 interviews.",
            )
            .unwrap();
    }

    fn fill_availability(wizard: &mut WizardStateMachine) {
        wizard.set_field(p("availability.session_rate"), 60).unwrap();
        wizard.set_field(p("availability.slots_per_month"), 4).unwrap();
    }

    fn answered_mentor() -> Draft {
        let mut wizard = mentor(Arc::default());
        fill_profile(&mut wizard);
        fill_expertise(&mut wizard);
        fill_availability(&mut wizard);
        wizard.into_draft()
    }

    #[test]
    fn next_is_blocked_until_required_fields_are_valid() {
        let mut wizard = mentor(Arc::default());

        let err = wizard.next().unwrap_err();
        assert!(matches!(err, TransitionError::ValidationFailed { error_count: 3, .. }));
        assert_eq!(wizard.field_error(&p("personal.email")), Some(ErrorKind::Missing));
        assert_eq!(wizard.current_step_index(), 0);

        wizard.set_field(p("personal.email"), "not-an-email").unwrap();
        assert_eq!(wizard.field_error(&p("personal.email")), None, "editing clears the stale error");
        assert!(wizard.next().is_err());
        assert_eq!(wizard.field_error(&p("personal.email")), Some(ErrorKind::FormatInvalid));

        fill_profile(&mut wizard);
        let advanced = wizard.next().unwrap();
        assert_eq!(advanced.step, 1);
        assert_eq!(wizard.current_step().id, "expertise");
        assert!(wizard.state().validation_errors.is_empty());
    }

    #[test]
    fn previous_keeps_answers_and_exits_from_first_step() {
        let host = Arc::new(RecordingHost::default());
        let mut wizard = mentor(host.clone());
        fill_profile(&mut wizard);
        wizard.next().unwrap();
        wizard.set_field(p("expertise.bio"), "half-written").unwrap();

        assert_eq!(wizard.previous().unwrap(), Retreat::Step(0));
        assert_eq!(wizard.draft().get(&p("expertise.bio")), Some(&FieldValue::from("half-written")));
        assert_eq!(wizard.draft().get(&p("personal.gmc_number")), Some(&FieldValue::from("7012345")));

        assert_eq!(wizard.previous().unwrap(), Retreat::Exited);
        assert_eq!(host.exited.load(Ordering::SeqCst), 1);
        assert_eq!(wizard.phase(), WizardPhase::Editing { step: 0 });
    }

    #[test]
    fn next_from_last_step_is_invalid() {
        let mut wizard = mentor(Arc::default()).resume(Draft::new(), 2).unwrap();
        let err = wizard.next().unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn resume_clamps_step_and_keeps_seed() {
        let seed = Draft::new().set(p("personal.full_name"), "Dr Okafor");
        let wizard = mentor(Arc::default()).resume(seed, 99).unwrap();
        assert_eq!(wizard.current_step_index(), 2);
        assert_eq!(wizard.phase(), WizardPhase::Editing { step: 2 });
        assert_eq!(wizard.resolved_fields().step_id, "availability");
        assert_eq!(wizard.draft().get(&p("personal.full_name")), Some(&FieldValue::from("Dr Okafor")));
    }

    #[test]
    fn go_to_step_backward_is_free_forward_is_gated() {
        let mut wizard = mentor(Arc::default());
        fill_profile(&mut wizard);

        // Step 1 is empty, so the jump stops there.
        let err = wizard.go_to_step(2).unwrap_err();
        assert!(matches!(err, TransitionError::ValidationFailed { ref step_id, .. } if step_id == "expertise"));
        assert_eq!(wizard.current_step_index(), 1);

        fill_expertise(&mut wizard);
        assert_eq!(wizard.go_to_step(2).unwrap(), 2);
        assert_eq!(wizard.go_to_step(0).unwrap(), 0);
        assert_eq!(wizard.state().visited, BTreeSet::from([0, 1, 2]));

        assert!(matches!(
            wizard.go_to_step(7),
            Err(TransitionError::UnknownStep { index: 7, count: 3 })
        ));
    }

    #[test]
    fn set_typed_fields_ignore_duplicate_adds() {
        let mut wizard = mentor(Arc::default());
        wizard.add_item(p("expertise.specialties"), "Cardiology").unwrap();
        wizard.add_item(p("expertise.specialties"), "Cardiology").unwrap();
        wizard.remove_item(p("expertise.specialties"), 5).unwrap();
        assert_eq!(
            wizard.draft().get(&p("expertise.specialties")).and_then(FieldValue::as_list),
            Some(&["Cardiology".to_string()][..])
        );
    }

    #[test]
    fn conditional_group_fields_are_validated() {
        let mut wizard = WizardStateMachine::new(
            Arc::new(builtin::mentor_onboarding()),
            TaxonomyKey::pathway("consultant"),
            Arc::new(RecordingHost::default()),
        )
        .unwrap();
        fill_profile(&mut wizard);
        wizard.next().unwrap();
        assert!(wizard.resolved_fields().has_group("consultant-panel"));

        fill_expertise(&mut wizard);
        assert!(wizard.next().is_err());
        assert_eq!(wizard.field_error(&p("expertise.cct_year")), Some(ErrorKind::Missing));

        wizard.set_field(p("expertise.cct_year"), 2015).unwrap();
        assert_eq!(wizard.next().unwrap().step, 2);
    }

    #[tokio::test]
    async fn complete_hands_full_draft_to_host_once() {
        let host = Arc::new(RecordingHost::default());
        let mut wizard = mentor(host.clone());
        fill_profile(&mut wizard);
        wizard.next().unwrap();
        fill_expertise(&mut wizard);
        wizard.next().unwrap();
        fill_availability(&mut wizard);

        let draft = wizard.complete().await.unwrap();
        assert_eq!(wizard.phase(), WizardPhase::Completed);
        assert_eq!(wizard.status().progress_percent, 100);

        let completed = host.completed.lock().unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0], draft);
        assert_eq!(draft.len(), 7);
    }

    #[tokio::test]
    async fn complete_only_from_last_step() {
        let mut wizard = mentor(Arc::default());
        fill_profile(&mut wizard);
        let err = wizard.complete().await.unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(wizard.phase(), WizardPhase::Editing { step: 0 });
    }

    #[tokio::test]
    async fn failed_completion_keeps_draft_and_allows_retry() {
        let host = Arc::new(RecordingHost::default());
        *host.fail_next.lock().unwrap() = Some(CompletionError::Unavailable("503".into()));

        let seed = answered_mentor();
        let mut wizard = mentor(host.clone()).resume(seed.clone(), 2).unwrap();

        let err = wizard.complete().await.unwrap_err();
        assert!(matches!(err, TransitionError::Completion(CompletionError::Unavailable(_))));
        assert_eq!(wizard.phase(), WizardPhase::Editing { step: 2 });
        assert_eq!(wizard.draft(), &seed);
        assert!(wizard.completion_failure().unwrap().contains("503"));

        wizard.complete().await.unwrap();
        assert_eq!(wizard.phase(), WizardPhase::Completed);
        assert!(wizard.completion_failure().is_none());
        assert_eq!(host.completed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn complete_rechecks_steps_skipped_by_resume() {
        let host = Arc::new(RecordingHost::default());
        let seed = Draft::new()
            .set(p("availability.session_rate"), 45)
            .set(p("availability.slots_per_month"), 2);
        let mut wizard = mentor(host.clone()).resume(seed, 2).unwrap();

        let err = wizard.complete().await.unwrap_err();
        assert!(matches!(err, TransitionError::ValidationFailed { ref step_id, error_count: 3 } if step_id == "profile"));
        assert_eq!(wizard.phase(), WizardPhase::Editing { step: 0 });
        assert_eq!(wizard.field_error(&p("personal.gmc_number")), Some(ErrorKind::Missing));
        assert!(host.completed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn finished_sessions_cannot_be_resumed() {
        let mut cancelled = mentor(Arc::default());
        cancelled.cancel().unwrap();
        let err = cancelled.resume(answered_mentor(), 0).unwrap_err();
        assert!(matches!(err, TransitionError::Terminal { .. }));

        let mut completed = mentor(Arc::default()).resume(answered_mentor(), 2).unwrap();
        completed.complete().await.unwrap();
        let err = completed.resume(Draft::new(), 0).unwrap_err();
        assert!(matches!(err, TransitionError::Terminal { ref phase } if phase == "completed"));
    }

    #[tokio::test]
    async fn terminal_phases_reject_everything() {
        let host = Arc::new(RecordingHost::default());
        let mut wizard = mentor(host.clone());
        wizard.set_field(p("personal.full_name"), "Dr Lee").unwrap();

        let draft = wizard.cancel().unwrap();
        assert_eq!(draft.get(&p("personal.full_name")), Some(&FieldValue::from("Dr Lee")));
        assert_eq!(host.cancelled.load(Ordering::SeqCst), 1);

        assert!(matches!(wizard.next(), Err(TransitionError::Terminal { .. })));
        assert!(matches!(wizard.previous(), Err(TransitionError::Terminal { .. })));
        assert!(matches!(wizard.cancel(), Err(TransitionError::Terminal { .. })));
        assert!(matches!(wizard.complete().await, Err(TransitionError::Terminal { .. })));
        assert!(matches!(
            wizard.set_field(p("personal.full_name"), "x"),
            Err(TransitionError::Terminal { .. })
        ));
    }

    #[test]
    fn wizard_with_unknown_rule_is_rejected() {
        let def = WizardDefinition::new("odd", "Odd").step(
            StepDefinition::new("one", "One").field(FieldSpec::text("a", "b", "B").rule("no_such_rule")),
        );
        let err = WizardStateMachine::new(Arc::new(def), TaxonomyKey::pathway("x"), Arc::new(RecordingHost::default()))
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownRule { .. }));

        let empty = WizardDefinition::new("empty", "Empty");
        let err = WizardStateMachine::new(Arc::new(empty), TaxonomyKey::pathway("x"), Arc::new(RecordingHost::default()))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NoSteps { .. }));
    }

    #[test]
    fn status_reports_progress_and_fields() {
        let mut wizard = mentor(Arc::default());
        fill_profile(&mut wizard);
        wizard.next().unwrap();

        let status = wizard.status();
        assert_eq!(status.step_id, "expertise");
        assert_eq!(status.step_count, 3);
        assert_eq!(status.progress_percent, 33);
        assert!(status.fields.iter().any(|f| f.path == p("expertise.bio")));

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"]["phase"], "editing");
        assert_eq!(json["wizard_id"], "mentor-onboarding");
    }
}
