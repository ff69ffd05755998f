//! Form session: one operator resolving and editing one supplier.
//!
//! All lookup results are applied in `SessionInner::apply_lookup`, the only
//! place that checks the sequence guard. The state mutex is never held across
//! an `.await`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use supplyid_core::{DomainError, DomainResult, SessionId, SupplierId};
use supplyid_suppliers::{
    classify, merge_registry_payload, print_eligible, switch_origin, validate_field, Field, FieldErrors,
    Origin, OriginLock, QueryKind, SupplierRecord,
};

use crate::config::ResolverConfig;
use crate::debounce::Debouncer;
use crate::lookup::{LookupOrchestrator, LookupQuery, LookupResult};
use crate::registry::BusinessRegistry;
use crate::store::SupplierStore;
use crate::submission::{SubmissionCoordinator, SubmitOutcome};

/// Debounced input channels that can trigger a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupChannel {
    TaxId,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Non-field message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

pub const NOT_FOUND_MESSAGE: &str = "not found locally or in the registry";

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSnapshot {
    pub session_id: SessionId,
    pub record: SupplierRecord,
    pub field_errors: FieldErrors,
    pub print_eligible: bool,
    pub is_busy: bool,
    pub origin_lock: OriginLock,
    pub matches: Vec<SupplierRecord>,
    pub notice: Option<Notice>,
}

#[derive(Debug)]
struct FormState {
    record: SupplierRecord,
    /// The record as last loaded from or saved to the store.
    baseline: Option<SupplierRecord>,
    field_errors: FieldErrors,
    matches: Vec<SupplierRecord>,
    notice: Option<Notice>,
    /// Bumped whenever another record is loaded. Store requests started
    /// under an older generation do not write back into the form.
    generation: u64,
}

impl FormState {
    fn new_draft() -> Self {
        Self::loaded(SupplierRecord::draft(Origin::Domestic))
    }

    fn loaded(record: SupplierRecord) -> Self {
        let baseline = record.is_persisted().then(|| record.clone());
        let notice = record.is_inconsistent().then(|| {
            Notice::warning("registered as domestic without a tax id; choose the origin and complete the record")
        });
        Self {
            record,
            baseline,
            field_errors: FieldErrors::new(),
            matches: Vec::new(),
            notice,
            generation: 0,
        }
    }

    fn reload(&mut self, mut next: FormState) {
        next.generation = self.generation + 1;
        *self = next;
    }

    fn origin_lock(&self) -> OriginLock {
        self.baseline
            .as_ref()
            .map_or(OriginLock::Editable, SupplierRecord::origin_lock)
    }
}

struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SessionInner<S, R> {
    id: SessionId,
    debounce: Duration,
    state: Mutex<FormState>,
    lookup: LookupOrchestrator<S, R>,
    submissions: SubmissionCoordinator<S>,
    debouncer: Debouncer<LookupChannel>,
    lookups_in_flight: AtomicUsize,
}

impl<S, R> SessionInner<S, R>
where
    S: SupplierStore,
    R: BusinessRegistry,
{
    fn state(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_lookup(&self, raw: &str) -> LookupResult {
        let query = self.lookup.issue(raw);
        let result = {
            let _busy = BusyGuard::enter(&self.lookups_in_flight);
            self.lookup.resolve(&query).await
        };
        self.apply_lookup(&query, &result);
        result
    }

    /// Apply `result` if `query` is still the latest lookup. Returns whether it
    /// was applied.
    fn apply_lookup(&self, query: &LookupQuery, result: &LookupResult) -> bool {
        let mut state = self.state();
        if !self.lookup.is_latest(query.sequence) {
            debug!(seq = query.sequence, "discarding stale lookup result");
            return false;
        }

        match result {
            LookupResult::LocalMatches(found) => {
                state.matches = found.clone();
                state.notice = None;
            }
            LookupResult::RegistryMatch(payload) => {
                state.record = merge_registry_payload(&state.record, payload);
                for field in [Field::TaxId, Field::LegalName, Field::Address] {
                    if state.field_errors.contains(field) {
                        let message = validate_field(&state.record, field);
                        state.field_errors.set(field, message);
                    }
                }
                state.matches.clear();
                state.notice = None;
            }
            LookupResult::NotFound => {
                state.matches.clear();
                state.notice = Some(Notice::info(NOT_FOUND_MESSAGE));
            }
            LookupResult::Failed(e) => {
                warn!(seq = query.sequence, error = %e, "lookup failed");
                state.notice = Some(Notice::error(format!("lookup failed, please retry ({e})")));
            }
        }
        true
    }

    /// Drop pending and in-flight lookups.
    fn reset_lookups(&self) {
        self.debouncer.cancel_all();
        self.lookup.invalidate();
    }
}

/// A single operator's supplier form.
///
/// Cloning yields another handle to the same session.
pub struct FormSession<S, R> {
    inner: Arc<SessionInner<S, R>>,
}

impl<S, R> Clone for FormSession<S, R> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S, R> FormSession<S, R>
where
    S: SupplierStore + Clone + 'static,
    R: BusinessRegistry + 'static,
{
    /// Start a session on an empty domestic draft.
    pub fn new(store: S, registry: R, config: &ResolverConfig) -> Self {
        let inner = SessionInner {
            id: SessionId::new(),
            debounce: config.debounce,
            state: Mutex::new(FormState::new_draft()),
            lookup: LookupOrchestrator::new(store.clone(), registry, config.registry_timeout),
            submissions: SubmissionCoordinator::new(store),
            debouncer: Debouncer::new(),
            lookups_in_flight: AtomicUsize::new(0),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Load an existing record for editing. Pending lookups are dropped.
    pub fn edit(&self, record: SupplierRecord) {
        self.inner.reset_lookups();
        self.inner.state().reload(FormState::loaded(record));
    }

    /// Apply an operator edit, revalidate that field and schedule the
    /// debounced lookup it triggers, if any.
    pub fn on_input_change(&self, field: Field, value: &str) -> DomainResult<()> {
        let is_draft = {
            let mut state = self.inner.state();
            state.record.set_field(field, value)?;
            let message = validate_field(&state.record, field);
            state.field_errors.set(field, message);
            if field == Field::TaxId {
                // A registry answer already on its way is for the old value.
                self.inner.lookup.invalidate();
            }
            !state.record.is_persisted()
        };

        let kind = classify(value);
        match field {
            Field::TaxId if kind == QueryKind::Identifier => self.schedule_lookup(LookupChannel::TaxId, value),
            Field::TaxId => self.inner.debouncer.cancel(&LookupChannel::TaxId),
            Field::LegalName if is_draft && kind != QueryKind::Empty => {
                self.schedule_lookup(LookupChannel::Name, value)
            }
            Field::LegalName => self.inner.debouncer.cancel(&LookupChannel::Name),
            _ => {}
        }
        Ok(())
    }

    fn schedule_lookup(&self, channel: LookupChannel, raw: &str) {
        let session: Weak<SessionInner<S, R>> = Arc::downgrade(&self.inner);
        self.inner
            .debouncer
            .schedule(channel, raw.to_string(), self.inner.debounce, move |raw: String| async move {
                if let Some(inner) = session.upgrade() {
                    inner.run_lookup(&raw).await;
                }
            });
    }

    /// Run a lookup right away, bypassing the debounce.
    pub async fn search_now(&self, raw: &str) -> LookupResult {
        if classify(raw) == QueryKind::Empty {
            self.inner.state().matches.clear();
            return LookupResult::NotFound;
        }
        self.inner.run_lookup(raw).await
    }

    /// Switch the draft's origin. Rejected for locked records.
    pub fn on_origin_toggle(&self, origin: Origin) -> DomainResult<()> {
        {
            let mut state = self.inner.state();
            if !state.origin_lock().allows_toggle() {
                return Err(DomainError::invariant(
                    "the origin of a registered supplier cannot change",
                ));
            }
            if state.record.origin() == origin {
                return Ok(());
            }

            state.record = switch_origin(&state.record, origin);
            state.field_errors.clear(Field::TaxId);
            state.matches.clear();
            // In-flight tax id lookups belong to the previous origin.
            self.inner.lookup.invalidate();
        }
        self.inner.debouncer.cancel(&LookupChannel::TaxId);
        Ok(())
    }

    /// Validate and persist the current record.
    ///
    /// On failure the draft is left exactly as it was; only errors and the
    /// notice change.
    pub async fn on_submit(&self) -> SubmitOutcome {
        let (generation, record, baseline) = {
            let state = self.inner.state();
            (state.generation, state.record.clone(), state.baseline.clone())
        };

        let outcome = self.inner.submissions.submit(&record, baseline.as_ref()).await;

        let mut state = self.inner.state();
        if state.generation != generation {
            if let Some(saved) = outcome.saved() {
                info!(supplier_id = ?saved.id, "saved a supplier that is no longer loaded");
                state.notice = Some(Notice::info(format!("{} was saved", saved.legal_name)));
            } else {
                debug!(?outcome, "submission finished after the form moved on");
            }
            return outcome;
        }
        match &outcome {
            SubmitOutcome::Created(saved) | SubmitOutcome::Updated(saved) => {
                if state.record == record {
                    state.record = saved.clone();
                } else {
                    // Edited while the request was pending: keep the edits.
                    state.record.id = saved.id;
                    state.record.created_at = saved.created_at;
                    state.record.updated_at = saved.updated_at;
                }
                state.baseline = Some(saved.clone());
                state.field_errors = FieldErrors::new();
                state.notice = Some(Notice::info("supplier saved"));
            }
            SubmitOutcome::Unchanged => {
                state.notice = Some(Notice::info("no changes to save"));
            }
            SubmitOutcome::Invalid(errors) => {
                state.field_errors = errors.clone();
            }
            SubmitOutcome::Rejected(errors) => {
                state.field_errors = errors.clone();
                state.notice = Some(Notice::error("the supplier store rejected some fields"));
            }
            SubmitOutcome::Failed(message) => {
                state.notice = Some(Notice::error(format!("could not save the supplier: {message}")));
            }
            SubmitOutcome::AlreadyInFlight => {
                state.notice = Some(Notice::warning("a save is already in progress"));
            }
        }
        outcome
    }

    /// Activate or deactivate the supplier. Persisted records are updated in
    /// the store right away; drafts only change locally and report `Unchanged`.
    pub async fn set_active(&self, active: bool) -> SubmitOutcome {
        let (generation, id) = {
            let mut state = self.inner.state();
            match state.record.id {
                Some(id) => (state.generation, id),
                None => {
                    state.record.active = active;
                    return SubmitOutcome::Unchanged;
                }
            }
        };

        let outcome = self.inner.submissions.set_active(id, active).await;

        let mut state = self.inner.state();
        if state.generation != generation {
            debug!(?outcome, "active flag change finished after the form moved on");
            return outcome;
        }
        match &outcome {
            SubmitOutcome::Created(saved) | SubmitOutcome::Updated(saved) => {
                state.record.active = saved.active;
                state.record.updated_at = saved.updated_at;
                state.baseline = Some(saved.clone());
            }
            SubmitOutcome::Rejected(errors) => {
                let reasons = errors
                    .iter()
                    .map(|(field, message)| format!("{field}: {message}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                state.notice = Some(Notice::error(format!("the supplier store refused the change ({reasons})")));
            }
            SubmitOutcome::Failed(message) => {
                state.notice = Some(Notice::error(format!("could not change the active flag: {message}")));
            }
            SubmitOutcome::AlreadyInFlight => {
                state.notice = Some(Notice::warning("a save is already in progress"));
            }
            SubmitOutcome::Unchanged | SubmitOutcome::Invalid(_) => {}
        }
        outcome
    }

    /// Load one of the current local matches for editing.
    pub fn select_match(&self, id: SupplierId) -> DomainResult<()> {
        let selected = {
            let state = self.inner.state();
            state
                .matches
                .iter()
                .find(|m| m.id == Some(id))
                .cloned()
                .ok_or_else(DomainError::not_found)?
        };
        self.edit(selected);
        Ok(())
    }

    /// Discard unsaved edits and pending lookups. An edited record falls back
    /// to its stored version, a draft to an empty domestic draft.
    pub fn cancel(&self) {
        self.inner.reset_lookups();
        let mut state = self.inner.state();
        let restored = match state.baseline.take() {
            Some(baseline) => FormState::loaded(baseline),
            None => FormState::new_draft(),
        };
        state.reload(restored);
    }

    pub fn is_busy(&self) -> bool {
        self.inner.lookups_in_flight.load(Ordering::SeqCst) > 0 || self.inner.submissions.is_in_flight()
    }

    /// True while a debounced lookup is waiting to fire on `channel`.
    pub fn is_lookup_pending(&self, channel: LookupChannel) -> bool {
        self.inner.debouncer.is_pending(&channel)
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let is_busy = self.is_busy();
        let state = self.inner.state();
        FormSnapshot {
            session_id: self.inner.id,
            record: state.record.clone(),
            field_errors: state.field_errors.clone(),
            print_eligible: print_eligible(&state.record),
            is_busy,
            origin_lock: state.origin_lock(),
            matches: state.matches.clone(),
            notice: state.notice.clone(),
        }
    }
}
