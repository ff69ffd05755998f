use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;

use supplyid_core::SupplierId;
use supplyid_infra::{
    BusinessRegistry, HttpRegistryClient, HttpSupplierStore, RegistryError, StoreError, StoredSupplier,
    SupplierStore,
};
use supplyid_suppliers::{prepare_submission, Field, Origin, SupplierPatch, SupplierPayload, SupplierRecord};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Address nothing is listening on.
async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

// ---------------------------------------------------------------------------
// Fake supplier store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeStore {
    suppliers: Mutex<HashMap<SupplierId, StoredSupplier>>,
    auth_headers: Mutex<Vec<String>>,
}

type Shared = Arc<FakeStore>;

impl FakeStore {
    fn saw(&self, headers: &HeaderMap) {
        if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            self.auth_headers.lock().unwrap().push(value.to_string());
        }
    }
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

#[derive(Deserialize)]
struct ActiveBody {
    active: bool,
}

async fn search(State(fake): State<Shared>, headers: HeaderMap, Query(params): Query<SearchParams>) -> Response {
    fake.saw(&headers);
    let needle = params.q.to_lowercase();
    let items: Vec<StoredSupplier> = fake
        .suppliers
        .lock()
        .unwrap()
        .values()
        .filter(|s| s.payload.legal_name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    Json(json!({ "items": items })).into_response()
}

async fn create(State(fake): State<Shared>, headers: HeaderMap, Json(payload): Json<SupplierPayload>) -> Response {
    fake.saw(&headers);
    if payload.legal_name == "BOOM" {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let mut suppliers = fake.suppliers.lock().unwrap();
    if payload.tax_id.is_some() && suppliers.values().any(|s| s.payload.tax_id == payload.tax_id) {
        let body = json!({ "errors": { "taxId": "tax id already registered" } });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    }

    let now = Utc::now();
    let stored = StoredSupplier {
        id: SupplierId::new(),
        payload,
        created_at: Some(now),
        updated_at: Some(now),
    };
    suppliers.insert(stored.id, stored.clone());
    (StatusCode::CREATED, Json(stored)).into_response()
}

async fn update(
    State(fake): State<Shared>,
    Path(id): Path<SupplierId>,
    Json(patch): Json<SupplierPatch>,
) -> Response {
    let mut suppliers = fake.suppliers.lock().unwrap();
    let Some(stored) = suppliers.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match patch.apply_to(&stored.payload) {
        Ok(payload) => {
            stored.payload = payload;
            stored.updated_at = Some(Utc::now());
            Json(stored.clone()).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn set_active(
    State(fake): State<Shared>,
    Path(id): Path<SupplierId>,
    Json(body): Json<ActiveBody>,
) -> Response {
    let mut suppliers = fake.suppliers.lock().unwrap();
    match suppliers.get_mut(&id) {
        Some(stored) => {
            stored.payload.active = body.active;
            Json(stored.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn store_app(fake: Shared) -> Router {
    Router::new()
        .route("/suppliers", get(search).post(create))
        .route("/suppliers/:id", patch(update))
        .route("/suppliers/:id/active", patch(set_active))
        .with_state(fake)
}

fn payload(tax_id: &str, legal_name: &str) -> SupplierPayload {
    let mut r = SupplierRecord::draft(Origin::Domestic);
    r.set_field(Field::TaxId, tax_id).unwrap();
    r.set_field(Field::LegalName, legal_name).unwrap();
    r.set_field(Field::Address, "Av. Los Olivos 123").unwrap();
    r.set_field(Field::Phone, "01-555-1234").unwrap();
    prepare_submission(&r).unwrap()
}

#[tokio::test]
async fn store_create_search_update_over_http() {
    let fake = Shared::default();
    let srv = TestServer::spawn(store_app(Arc::clone(&fake))).await;
    let store = HttpSupplierStore::new(&srv.base_url).with_token("secret");

    let created = store.create(&payload("20123456789", "Acme SAC")).await.unwrap();
    let id = created.id.expect("store assigns id");
    assert_eq!(created.legal_name, "ACME SAC");
    assert_eq!(created.contact.phone, "015551234");
    assert!(created.created_at.is_some());

    let found = store.search("acme").await.unwrap();
    assert_eq!(found, vec![created.clone()]);
    assert!(store.search("globex").await.unwrap().is_empty());

    let before = SupplierPayload::from(&created);
    let mut after = before.clone();
    after.email = Some("ventas@acme.pe".to_string());
    let updated = store.update(id, &SupplierPatch::diff(&before, &after)).await.unwrap();
    assert_eq!(updated.contact.email, "ventas@acme.pe");
    assert_eq!(updated.tax_id(), Some("20123456789"));

    let inactive = store.set_active(id, false).await.unwrap();
    assert!(!inactive.active);

    let seen = fake.auth_headers.lock().unwrap().clone();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|h| h == "Bearer secret"));
}

#[tokio::test]
async fn store_maps_error_statuses() {
    let srv = TestServer::spawn(store_app(Shared::default())).await;
    let store = HttpSupplierStore::new(&srv.base_url);

    store.create(&payload("20123456789", "Acme SAC")).await.unwrap();

    match store.create(&payload("20123456789", "Acme Dos SAC")).await.unwrap_err() {
        StoreError::Rejected(fields) => {
            assert_eq!(fields.get("taxId").map(String::as_str), Some("tax id already registered"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }

    assert!(matches!(
        store.create(&payload("20987654321", "Boom")).await,
        Err(StoreError::Unavailable(_))
    ));

    let patch = SupplierPatch::full(&payload("20111111111", "Nadie SAC"));
    assert_eq!(store.update(SupplierId::new(), &patch).await.unwrap_err(), StoreError::NotFound);
}

#[tokio::test]
async fn unreachable_store_is_unavailable() {
    let store = HttpSupplierStore::new(closed_port_url().await);
    assert!(matches!(store.search("acme").await, Err(StoreError::Unavailable(_))));
}

// ---------------------------------------------------------------------------
// Fake registry
// ---------------------------------------------------------------------------

async fn registry_lookup(Path(tax_id): Path<String>) -> Response {
    match tax_id.as_str() {
        "20123456789" => Json(json!({
            "taxId": "20123456789",
            "legalName": "ACME SAC",
            "address": "AV. LOS OLIVOS 123",
            "status": "ACTIVO",
            "condition": "HABIDO",
            "industryCodes": ["4690"],
            "workerCount": 12
        }))
        .into_response(),
        "20000000429" => StatusCode::TOO_MANY_REQUESTS.into_response(),
        "20000000503" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        "20000000200" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        "20000000408" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            StatusCode::NOT_FOUND.into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn registry_refresh() -> Json<serde_json::Value> {
    Json(json!({ "refreshedAt": "2026-01-05T10:00:00Z" }))
}

async fn registry_last_refresh() -> Json<serde_json::Value> {
    Json(json!({ "refreshedAt": null }))
}

fn registry_app() -> Router {
    Router::new()
        .route("/registry/refresh", post(registry_refresh))
        .route("/registry/last-refresh", get(registry_last_refresh))
        .route("/registry/:tax_id", get(registry_lookup))
}

#[tokio::test]
async fn registry_lookup_maps_statuses() {
    let srv = TestServer::spawn(registry_app()).await;
    let registry = HttpRegistryClient::new(&srv.base_url);

    let hit = registry.lookup_by_tax_id("20123456789").await.unwrap().expect("hit");
    assert_eq!(hit.legal_name, "ACME SAC");
    assert_eq!(hit.profile.worker_count, Some(12));
    assert_eq!(hit.profile.industry_codes, vec!["4690".to_string()]);

    assert_eq!(registry.lookup_by_tax_id("20999999999").await.unwrap(), None);
    assert_eq!(
        registry.lookup_by_tax_id("20000000429").await.unwrap_err(),
        RegistryError::RateLimited
    );
    assert!(matches!(
        registry.lookup_by_tax_id("20000000503").await,
        Err(RegistryError::Unavailable(_))
    ));
    assert!(matches!(
        registry.lookup_by_tax_id("20000000200").await,
        Err(RegistryError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn slow_registry_times_out() {
    let srv = TestServer::spawn(registry_app()).await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let registry = HttpRegistryClient::with_client(client, &srv.base_url);

    assert_eq!(
        registry.lookup_by_tax_id("20000000408").await.unwrap_err(),
        RegistryError::Timeout
    );
}

#[tokio::test]
async fn registry_refresh_endpoints() {
    let srv = TestServer::spawn(registry_app()).await;
    let registry = HttpRegistryClient::new(&srv.base_url);

    let expected = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
    assert_eq!(registry.refresh().await.unwrap(), expected);
    assert_eq!(registry.last_refreshed_at().await.unwrap(), None);
}

#[tokio::test]
async fn unreachable_registry_is_unavailable() {
    let registry = HttpRegistryClient::new(closed_port_url().await);
    assert!(matches!(
        registry.lookup_by_tax_id("20123456789").await,
        Err(RegistryError::Unavailable(_))
    ));
}
