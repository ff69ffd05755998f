//! Lookup orchestration: local store first, then the business registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use supplyid_suppliers::{classify, QueryKind, RegistryPayload, SupplierRecord};

use crate::registry::{BusinessRegistry, RegistryError};
use crate::store::{StoreError, SupplierStore};

/// A lookup request tagged with its issuance number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub raw: String,
    pub sequence: u64,
    pub kind: QueryKind,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// The local store already knows one or more matching suppliers.
    LocalMatches(Vec<SupplierRecord>),
    /// No local match; the registry answered for the tax id.
    RegistryMatch(RegistryPayload),
    NotFound,
    /// A collaborator could not answer. Never reported as `NotFound`.
    Failed(LookupError),
}

/// Monotonic lookup numbering.
///
/// Only the result of the most recently issued query may be applied.
/// `invalidate` advances the counter without issuing, so everything in flight
/// becomes stale.
#[derive(Debug, Default)]
pub struct LookupSequencer {
    issued: AtomicU64,
}

impl LookupSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn invalidate(&self) {
        self.issued.fetch_add(1, Ordering::SeqCst);
    }

    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, sequence: u64) -> bool {
        sequence == self.latest()
    }
}

pub struct LookupOrchestrator<S, R> {
    store: S,
    registry: R,
    registry_timeout: Duration,
    sequencer: LookupSequencer,
}

impl<S, R> LookupOrchestrator<S, R>
where
    S: SupplierStore,
    R: BusinessRegistry,
{
    pub fn new(store: S, registry: R, registry_timeout: Duration) -> Self {
        Self {
            store,
            registry,
            registry_timeout,
            sequencer: LookupSequencer::new(),
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Classify `raw` and give it the next sequence number.
    pub fn issue(&self, raw: &str) -> LookupQuery {
        LookupQuery {
            raw: raw.trim().to_string(),
            sequence: self.sequencer.issue(),
            kind: classify(raw),
        }
    }

    pub fn invalidate(&self) {
        self.sequencer.invalidate();
    }

    pub fn is_latest(&self, sequence: u64) -> bool {
        self.sequencer.is_latest(sequence)
    }

    /// Resolve a query. Does not apply anything; callers check `is_latest`
    /// before using the result.
    #[instrument(
        name = "lookup.resolve",
        skip(self, query),
        fields(seq = query.sequence, kind = ?query.kind)
    )]
    pub async fn resolve(&self, query: &LookupQuery) -> LookupResult {
        if query.kind == QueryKind::Empty {
            return LookupResult::NotFound;
        }

        let local = match self.store.search(&query.raw).await {
            Ok(local) => local,
            Err(e) => {
                warn!(error = %e, "local supplier search failed");
                return LookupResult::Failed(e.into());
            }
        };
        if !local.is_empty() {
            debug!(matches = local.len(), "resolved from local store");
            return LookupResult::LocalMatches(local);
        }

        if query.kind == QueryKind::FreeText {
            return LookupResult::NotFound;
        }

        let answer = tokio::time::timeout(
            self.registry_timeout,
            self.registry.lookup_by_tax_id(&query.raw),
        )
        .await
        .unwrap_or(Err(RegistryError::Timeout));

        match answer {
            Ok(Some(payload)) => LookupResult::RegistryMatch(payload),
            Ok(None) => LookupResult::NotFound,
            Err(e) => {
                warn!(error = %e, "registry lookup failed");
                LookupResult::Failed(e.into())
            }
        }
    }
}
