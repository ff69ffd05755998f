//! HTTP client for the remote supplier store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use supplyid_core::SupplierId;
use supplyid_suppliers::{SupplierPatch, SupplierPayload, SupplierRecord};

use super::{StoreError, StoredSupplier, SupplierStore};

/// Supplier store reached over HTTP/JSON.
///
/// Routes: `GET /suppliers?q=`, `POST /suppliers`, `PATCH /suppliers/{id}`,
/// `PATCH /suppliers/{id}/active`. A 422 answer carrying
/// `{"errors": {field: message}}` is a field-level rejection.
#[derive(Debug, Clone)]
pub struct HttpSupplierStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    items: Vec<StoredSupplier>,
}

#[derive(Debug, Deserialize)]
struct RejectionResponse {
    errors: BTreeMap<String, String>,
}

impl HttpSupplierStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                StoreError::Unavailable(e.to_string())
            } else {
                StoreError::Other(e.to_string())
            }
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound,
            StatusCode::UNPROCESSABLE_ENTITY => match serde_json::from_str::<RejectionResponse>(&body) {
                Ok(r) => StoreError::Rejected(r.errors),
                Err(_) => StoreError::Other(format!("{status}: {body}")),
            },
            s if s.is_server_error() => StoreError::Unavailable(format!("{s}")),
            s => StoreError::Other(format!("{s}: {body}")),
        })
    }

    async fn record(resp: Response) -> Result<SupplierRecord, StoreError> {
        let stored: StoredSupplier = resp
            .json()
            .await
            .map_err(|e| StoreError::Other(format!("invalid store response: {e}")))?;
        Ok(stored.into_record())
    }
}

#[async_trait]
impl SupplierStore for HttpSupplierStore {
    async fn search(&self, query: &str) -> Result<Vec<SupplierRecord>, StoreError> {
        let req = self.client.get(self.url("/suppliers")).query(&[("q", query.trim())]);
        let resp = self.send(req).await?;
        let items: ItemsResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Other(format!("invalid store response: {e}")))?;
        Ok(items.items.into_iter().map(StoredSupplier::into_record).collect())
    }

    async fn create(&self, payload: &SupplierPayload) -> Result<SupplierRecord, StoreError> {
        let req = self.client.post(self.url("/suppliers")).json(payload);
        Self::record(self.send(req).await?).await
    }

    async fn update(&self, id: SupplierId, patch: &SupplierPatch) -> Result<SupplierRecord, StoreError> {
        let req = self.client.patch(self.url(&format!("/suppliers/{id}"))).json(patch);
        Self::record(self.send(req).await?).await
    }

    async fn set_active(&self, id: SupplierId, active: bool) -> Result<SupplierRecord, StoreError> {
        let req = self
            .client
            .patch(self.url(&format!("/suppliers/{id}/active")))
            .json(&serde_json::json!({ "active": active }));
        Self::record(self.send(req).await?).await
    }
}
