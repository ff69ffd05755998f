//! HTTP client for the registry mirror service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use supplyid_suppliers::RegistryPayload;

use super::{BusinessRegistry, RegistryError};

/// Registry reached over HTTP/JSON.
///
/// Routes: `GET /registry/{taxId}` (404 = no entry), `POST /registry/refresh`,
/// `GET /registry/last-refresh`.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    refreshed_at: Option<DateTime<Utc>>,
}

fn transport_error(e: reqwest::Error) -> RegistryError {
    if e.is_timeout() {
        RegistryError::Timeout
    } else if e.is_decode() {
        RegistryError::InvalidResponse(e.to_string())
    } else {
        RegistryError::Unavailable(e.to_string())
    }
}

impl HttpRegistryClient {
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

    async fn send(&self, req: RequestBuilder) -> Result<Response, RegistryError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        req.send().await.map_err(transport_error)
    }

    fn status_error(status: StatusCode) -> RegistryError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => RegistryError::RateLimited,
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => RegistryError::Timeout,
            s if s.is_server_error() => RegistryError::Unavailable(format!("{s}")),
            s => RegistryError::InvalidResponse(format!("unexpected status {s}")),
        }
    }

    async fn refresh_time(resp: Response) -> Result<Option<DateTime<Utc>>, RegistryError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::status_error(status));
        }
        let body: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;
        Ok(body.refreshed_at)
    }
}

#[async_trait]
impl BusinessRegistry for HttpRegistryClient {
    async fn lookup_by_tax_id(&self, tax_id: &str) -> Result<Option<RegistryPayload>, RegistryError> {
        let url = format!("{}/registry/{}", self.base_url, tax_id.trim());
        let resp = self.send(self.client.get(&url)).await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => resp
                .json::<RegistryPayload>()
                .await
                .map(Some)
                .map_err(|e| RegistryError::InvalidResponse(e.to_string())),
            s => Err(Self::status_error(s)),
        }
    }

    async fn refresh(&self) -> Result<DateTime<Utc>, RegistryError> {
        let url = format!("{}/registry/refresh", self.base_url);
        let resp = self.send(self.client.post(&url)).await?;
        Self::refresh_time(resp)
            .await?
            .ok_or_else(|| RegistryError::InvalidResponse("refresh answered without a timestamp".to_string()))
    }

    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>, RegistryError> {
        let url = format!("{}/registry/last-refresh", self.base_url);
        let resp = self.send(self.client.get(&url)).await?;
        Self::refresh_time(resp).await
    }
}
