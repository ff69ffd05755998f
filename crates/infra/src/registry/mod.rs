//! National business registry port.

pub mod http;
pub mod static_registry;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use supplyid_suppliers::RegistryPayload;

pub use http::HttpRegistryClient;
pub use static_registry::StaticRegistry;

/// Registry infrastructure failure.
///
/// "No such tax id" is not an error: lookups return `Ok(None)` for it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry did not answer in time")]
    Timeout,

    #[error("registry rate limit exceeded")]
    RateLimited,

    #[error("invalid registry response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait BusinessRegistry: Send + Sync {
    /// Look up an 11-digit tax id. `Ok(None)` means the registry has no entry.
    async fn lookup_by_tax_id(&self, tax_id: &str) -> Result<Option<RegistryPayload>, RegistryError>;

    /// Ask the registry mirror to reload its bulk data; returns the new refresh time.
    async fn refresh(&self) -> Result<DateTime<Utc>, RegistryError>;

    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>, RegistryError>;
}

#[async_trait]
impl<R> BusinessRegistry for Arc<R>
where
    R: BusinessRegistry + ?Sized,
{
    async fn lookup_by_tax_id(&self, tax_id: &str) -> Result<Option<RegistryPayload>, RegistryError> {
        (**self).lookup_by_tax_id(tax_id).await
    }

    async fn refresh(&self) -> Result<DateTime<Utc>, RegistryError> {
        (**self).refresh().await
    }

    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>, RegistryError> {
        (**self).last_refreshed_at().await
    }
}
