use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use supplyid_core::SupplierId;
use supplyid_suppliers::{
    classify, Origin, QueryKind, SupplierPatch, SupplierPayload, SupplierRecord, TaxId,
};

use super::{StoreError, StoredSupplier, SupplierStore};

/// In-memory supplier store for tests/dev.
///
/// Mirrors the server-side checks of the real store: domestic suppliers need a
/// well-formed tax id and a tax id can only be registered once.
#[derive(Debug, Default)]
pub struct InMemorySupplierStore {
    inner: RwLock<HashMap<SupplierId, StoredSupplier>>,
    unavailable: AtomicBool,
    search_calls: AtomicUsize,
}

fn rejected(field: &str, message: impl Into<String>) -> StoreError {
    StoreError::Rejected(BTreeMap::from([(field.to_string(), message.into())]))
}

fn poisoned() -> StoreError {
    StoreError::Other("in-memory store lock poisoned".to_string())
}

impl InMemorySupplierStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: SupplierId) -> Option<SupplierRecord> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&id).cloned().map(StoredSupplier::into_record)
    }

    /// Load a record as-is, skipping validation (legacy data import).
    pub fn insert_record(&self, record: SupplierRecord) -> SupplierRecord {
        let id = record.id.unwrap_or_default();
        let now = Utc::now();
        let stored = StoredSupplier {
            id,
            payload: SupplierPayload::from(&record),
            created_at: record.created_at.or(Some(now)),
            updated_at: record.updated_at.or(Some(now)),
        };
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, stored.clone());
        stored.into_record()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_payload(
        map: &HashMap<SupplierId, StoredSupplier>,
        id: Option<SupplierId>,
        payload: &SupplierPayload,
    ) -> Result<(), StoreError> {
        if payload.legal_name.trim().is_empty() {
            return Err(rejected("legalName", "legal name is required"));
        }
        if payload.origin != Origin::Domestic {
            return Ok(());
        }

        let raw = payload.tax_id.as_deref().unwrap_or_default();
        let tax_id = TaxId::parse(raw).map_err(|e| rejected("taxId", e.to_string()))?;

        let duplicate = map.values().any(|s| {
            Some(s.id) != id && s.payload.tax_id.as_deref() == Some(tax_id.as_str())
        });
        if duplicate {
            return Err(rejected("taxId", format!("tax id {tax_id} is already registered")));
        }
        Ok(())
    }
}

#[async_trait]
impl SupplierStore for InMemorySupplierStore {
    async fn search(&self, query: &str) -> Result<Vec<SupplierRecord>, StoreError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let needle = query.trim();
        if classify(needle) == QueryKind::Empty {
            return Ok(vec![]);
        }
        let needle_lower = needle.to_lowercase();

        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut matches: Vec<SupplierRecord> = map
            .values()
            .filter(|s| {
                s.payload.tax_id.as_deref() == Some(needle)
                    || s.payload.legal_name.to_lowercase().contains(&needle_lower)
            })
            .cloned()
            .map(StoredSupplier::into_record)
            .collect();
        matches.sort_by(|a, b| a.legal_name.cmp(&b.legal_name));
        Ok(matches)
    }

    async fn create(&self, payload: &SupplierPayload) -> Result<SupplierRecord, StoreError> {
        self.ensure_available()?;

        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Self::check_payload(&map, None, payload)?;

        let now = Utc::now();
        let stored = StoredSupplier {
            id: SupplierId::new(),
            payload: payload.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        map.insert(stored.id, stored.clone());
        Ok(stored.into_record())
    }

    async fn update(&self, id: SupplierId, patch: &SupplierPatch) -> Result<SupplierRecord, StoreError> {
        self.ensure_available()?;

        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let current = map.get(&id).ok_or(StoreError::NotFound)?;
        let payload = patch
            .apply_to(&current.payload)
            .map_err(|e| StoreError::Other(format!("invalid patch: {e}")))?;
        Self::check_payload(&map, Some(id), &payload)?;

        let stored = map.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.payload = payload;
        stored.updated_at = Some(Utc::now());
        Ok(stored.clone().into_record())
    }

    async fn set_active(&self, id: SupplierId, active: bool) -> Result<SupplierRecord, StoreError> {
        self.ensure_available()?;

        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let stored = map.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.payload.active = active;
        stored.updated_at = Some(Utc::now());
        Ok(stored.clone().into_record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplyid_suppliers::{prepare_submission, Field};

    fn payload(tax_id: &str, name: &str) -> SupplierPayload {
        let mut r = SupplierRecord::draft(Origin::Domestic);
        r.set_field(Field::TaxId, tax_id).unwrap();
        r.set_field(Field::LegalName, name).unwrap();
        r.set_field(Field::Address, "Av. Arequipa 100").unwrap();
        r.set_field(Field::Phone, "5551234").unwrap();
        prepare_submission(&r).unwrap()
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamps() {
        let store = InMemorySupplierStore::new();
        let created = store.create(&payload("20123456789", "Acme SAC")).await.unwrap();

        assert!(created.id.is_some());
        assert!(created.created_at.is_some());
        assert_eq!(created.tax_id(), Some("20123456789"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn search_matches_name_substring_or_exact_tax_id() {
        let store = InMemorySupplierStore::new();
        store.create(&payload("20123456789", "Acme SAC")).await.unwrap();
        store.create(&payload("10456789012", "Juan Perez")).await.unwrap();

        let by_name = store.search("acme").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].legal_name, "ACME SAC");

        let by_tax_id = store.search("10456789012").await.unwrap();
        assert_eq!(by_tax_id.len(), 1);
        assert_eq!(by_tax_id[0].legal_name, "JUAN PEREZ");

        assert!(store.search("2012345678").await.unwrap().is_empty());
        assert!(store.search("   ").await.unwrap().is_empty());
        assert_eq!(store.search_calls(), 4);
    }

    #[tokio::test]
    async fn duplicate_tax_id_is_rejected_per_field() {
        let store = InMemorySupplierStore::new();
        store.create(&payload("20123456789", "Acme SAC")).await.unwrap();

        match store.create(&payload("20123456789", "Other SAC")).await.unwrap_err() {
            StoreError::Rejected(fields) => assert!(fields.contains_key("taxId")),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_applies_partial_patch() {
        let store = InMemorySupplierStore::new();
        let before = payload("20123456789", "Acme SAC");
        let created = store.create(&before).await.unwrap();

        let mut after = before.clone();
        after.email = Some("ventas@acme.pe".to_string());
        let patch = SupplierPatch::diff(&before, &after);

        let updated = store.update(created.id.unwrap(), &patch).await.unwrap();
        assert_eq!(updated.contact.email, "ventas@acme.pe");
        assert_eq!(updated.legal_name, "ACME SAC");
    }

    #[tokio::test]
    async fn update_of_unknown_supplier_is_not_found() {
        let store = InMemorySupplierStore::new();
        let patch = SupplierPatch::full(&payload("20123456789", "Acme SAC"));
        assert_eq!(
            store.update(SupplierId::new(), &patch).await.unwrap_err(),
            StoreError::NotFound
        );
    }

    #[tokio::test]
    async fn set_active_toggles_flag() {
        let store = InMemorySupplierStore::new();
        let created = store.create(&payload("20123456789", "Acme SAC")).await.unwrap();
        let id = created.id.unwrap();

        let inactive = store.set_active(id, false).await.unwrap();
        assert!(!inactive.active);
        assert!(!store.get(id).unwrap().active);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemorySupplierStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.search("acme").await, Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.create(&payload("20123456789", "Acme SAC")).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn insert_record_keeps_inconsistent_legacy_data() {
        let store = InMemorySupplierStore::new();
        let mut legacy = SupplierRecord::draft(Origin::Domestic);
        legacy.set_field(Field::LegalName, "Legacy SRL").unwrap();

        let stored = store.insert_record(legacy);
        assert!(stored.is_inconsistent());
        assert_eq!(store.get(stored.id.unwrap()), Some(stored));
    }

    #[test]
    fn insert_record_lands_even_after_lock_poisoning() {
        let store = InMemorySupplierStore::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.inner.write().unwrap();
            panic!("writer crashed while holding the lock");
        }));
        assert!(store.inner.is_poisoned());

        let mut legacy = SupplierRecord::draft(Origin::Foreign);
        legacy.set_field(Field::LegalName, "Globex Ltd").unwrap();
        let stored = store.insert_record(legacy);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(stored.id.unwrap()), Some(stored));
    }
}
