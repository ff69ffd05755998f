//! Supplier store port (the remote CRUD service holding persisted suppliers).

pub mod http;
pub mod in_memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use supplyid_core::SupplierId;
use supplyid_suppliers::{SupplierPatch, SupplierPayload, SupplierRecord};

pub use http::HttpSupplierStore;
pub use in_memory::InMemorySupplierStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or answered with a server error.
    #[error("supplier store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the payload with per-field messages (wire field names).
    #[error("supplier store rejected the payload ({} field(s))", .0.len())]
    Rejected(BTreeMap<String, String>),

    #[error("supplier not found")]
    NotFound,

    #[error("supplier store error: {0}")]
    Other(String),
}

/// A supplier as the store returns it: payload plus lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSupplier {
    pub id: SupplierId,
    #[serde(flatten)]
    pub payload: SupplierPayload,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredSupplier {
    pub fn into_record(self) -> SupplierRecord {
        self.payload.into_record(self.id, self.created_at, self.updated_at)
    }
}

/// Access to persisted suppliers.
///
/// `update` takes a partial patch; only the fields present in it change.
#[async_trait]
pub trait SupplierStore: Send + Sync {
    /// Suppliers whose legal name contains `query` (case-insensitive) or whose
    /// tax id equals it.
    async fn search(&self, query: &str) -> Result<Vec<SupplierRecord>, StoreError>;

    async fn create(&self, payload: &SupplierPayload) -> Result<SupplierRecord, StoreError>;

    async fn update(&self, id: SupplierId, patch: &SupplierPatch) -> Result<SupplierRecord, StoreError>;

    async fn set_active(&self, id: SupplierId, active: bool) -> Result<SupplierRecord, StoreError>;
}

#[async_trait]
impl<S> SupplierStore for Arc<S>
where
    S: SupplierStore + ?Sized,
{
    async fn search(&self, query: &str) -> Result<Vec<SupplierRecord>, StoreError> {
        (**self).search(query).await
    }

    async fn create(&self, payload: &SupplierPayload) -> Result<SupplierRecord, StoreError> {
        (**self).create(payload).await
    }

    async fn update(&self, id: SupplierId, patch: &SupplierPatch) -> Result<SupplierRecord, StoreError> {
        (**self).update(id, patch).await
    }

    async fn set_active(&self, id: SupplierId, active: bool) -> Result<SupplierRecord, StoreError> {
        (**self).set_active(id, active).await
    }
}
