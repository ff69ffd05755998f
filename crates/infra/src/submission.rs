//! Submission of supplier records to the store.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use supplyid_core::SupplierId;
use supplyid_suppliers::{prepare_submission, Field, FieldErrors, SupplierPatch, SupplierPayload, SupplierRecord};

use crate::store::{StoreError, SupplierStore};

/// Outcome of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Created(SupplierRecord),
    Updated(SupplierRecord),
    /// Nothing differs from the loaded record; the store was not called.
    Unchanged,
    /// Local validation failed; the store was not called.
    Invalid(FieldErrors),
    /// The store refused specific fields.
    Rejected(FieldErrors),
    Failed(String),
    /// Another submission from this coordinator is still pending.
    AlreadyInFlight,
}

impl SubmitOutcome {
    pub fn saved(&self) -> Option<&SupplierRecord> {
        match self {
            SubmitOutcome::Created(r) | SubmitOutcome::Updated(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SubmitOutcome::Created(_) | SubmitOutcome::Updated(_) | SubmitOutcome::Unchanged
        )
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Validates, builds the payload and dispatches create/update to the store.
pub struct SubmissionCoordinator<S> {
    store: S,
    in_flight: AtomicBool,
}

impl<S: SupplierStore> SubmissionCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Submit `record`.
    ///
    /// Drafts are created. Persisted records are updated with a patch against
    /// `baseline` (the record as loaded), or with every field when no baseline
    /// is known.
    pub async fn submit(&self, record: &SupplierRecord, baseline: Option<&SupplierRecord>) -> SubmitOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return SubmitOutcome::AlreadyInFlight;
        };

        let payload = match prepare_submission(record) {
            Ok(payload) => payload,
            Err(errors) => {
                debug!(fields = errors.len(), "supplier failed validation");
                return SubmitOutcome::Invalid(errors);
            }
        };

        let result = match record.id {
            None => self.store.create(&payload).await.map(SubmitOutcome::Created),
            Some(id) => {
                let patch = match baseline {
                    Some(baseline) => SupplierPatch::diff(&SupplierPayload::from(baseline), &payload),
                    None => SupplierPatch::full(&payload),
                };
                if patch.is_empty() {
                    return SubmitOutcome::Unchanged;
                }
                self.store.update(id, &patch).await.map(SubmitOutcome::Updated)
            }
        };

        match result {
            Ok(outcome) => {
                if let Some(saved) = outcome.saved() {
                    info!(supplier_id = ?saved.id, "supplier saved");
                }
                outcome
            }
            Err(e) => failure(e),
        }
    }

    pub async fn set_active(&self, id: SupplierId, active: bool) -> SubmitOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return SubmitOutcome::AlreadyInFlight;
        };

        match self.store.set_active(id, active).await {
            Ok(saved) => SubmitOutcome::Updated(saved),
            Err(e) => failure(e),
        }
    }
}

/// Map a store error onto an outcome. Rejections naming only known fields
/// become field errors; anything else is a single generic failure.
fn failure(err: StoreError) -> SubmitOutcome {
    match err {
        StoreError::Rejected(fields) if !fields.is_empty() => {
            let known: Option<FieldErrors> = fields
                .iter()
                .map(|(key, message)| key.parse::<Field>().ok().map(|f| (f, message.clone())))
                .collect();
            match known {
                Some(errors) => SubmitOutcome::Rejected(errors),
                None => {
                    let joined = fields
                        .iter()
                        .map(|(key, message)| format!("{key}: {message}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    SubmitOutcome::Failed(format!("supplier rejected: {joined}"))
                }
            }
        }
        other => {
            warn!(error = %other, "supplier submission failed");
            SubmitOutcome::Failed(other.to_string())
        }
    }
}
