use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use supplyid_suppliers::RegistryPayload;

use super::{BusinessRegistry, RegistryError};

/// Fixed-content registry for tests/dev.
///
/// Entries can be given an artificial latency to reproduce out-of-order
/// completion, and the whole registry can be switched unavailable.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    entries: RwLock<HashMap<String, RegistryPayload>>,
    delays: RwLock<HashMap<String, Duration>>,
    unavailable: AtomicBool,
    lookups: AtomicUsize,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, payload: RegistryPayload) -> Self {
        self.insert(payload);
        self
    }

    pub fn insert(&self, payload: RegistryPayload) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(payload.tax_id.clone(), payload);
    }

    /// Delay answers for `tax_id` by `delay`.
    pub fn set_delay(&self, tax_id: &str, delay: Duration) {
        self.delays
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tax_id.to_string(), delay);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `lookup_by_tax_id` calls received.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BusinessRegistry for StaticRegistry {
    async fn lookup_by_tax_id(&self, tax_id: &str) -> Result<Option<RegistryPayload>, RegistryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .delays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tax_id)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("static registry switched off".to_string()));
        }

        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(tax_id).cloned())
    }

    async fn refresh(&self) -> Result<DateTime<Utc>, RegistryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("static registry switched off".to_string()));
        }
        let now = Utc::now();
        *self.last_refresh.write().unwrap_or_else(PoisonError::into_inner) = Some(now);
        Ok(now)
    }

    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>, RegistryError> {
        Ok(*self.last_refresh.read().unwrap_or_else(PoisonError::into_inner))
    }
}
