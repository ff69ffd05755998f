//! `supplyid`: interactive supplier resolution against the supplier store and
//! the national business registry.

mod args;
mod command;
mod repl;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use supplyid_infra::{
    BusinessRegistry, FormSession, HttpRegistryClient, HttpSupplierStore, InMemorySupplierStore,
    ResolverConfig, StaticRegistry, SupplierStore,
};
use supplyid_suppliers::{RegistryPayload, RegistryProfile};

use crate::args::Cli;
use crate::repl::Repl;

/// Registry content for `--in-memory` sessions.
fn demo_registry() -> StaticRegistry {
    StaticRegistry::new().with_entry(RegistryPayload {
        tax_id: "20123456789".to_string(),
        legal_name: "ACME SAC".to_string(),
        address: Some("AV. LOS OLIVOS 123 - LIMA".to_string()),
        profile: RegistryProfile {
            status: Some("ACTIVO".to_string()),
            condition: Some("HABIDO".to_string()),
            industry_codes: vec!["4690".to_string()],
            ..RegistryProfile::default()
        },
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    supplyid_observability::init_pretty();

    let config = cli.apply(ResolverConfig::from_env()?);

    let (store, registry): (Arc<dyn SupplierStore>, Arc<dyn BusinessRegistry>) = if config.in_memory {
        info!("using in-memory store and demo registry");
        let store: Arc<dyn SupplierStore> = Arc::new(InMemorySupplierStore::new());
        let registry: Arc<dyn BusinessRegistry> = Arc::new(demo_registry());
        (store, registry)
    } else {
        if config.auth_token.is_none() {
            warn!("SUPPLYID_AUTH_TOKEN not set; calling services without credentials");
        }
        let mut store = HttpSupplierStore::new(config.store_url.clone());
        let mut registry = HttpRegistryClient::new(config.registry_url.clone());
        if let Some(token) = &config.auth_token {
            store = store.with_token(token.clone());
            registry = registry.with_token(token.clone());
        }
        info!(store = %config.store_url, registry = %config.registry_url, "using HTTP services");
        let store: Arc<dyn SupplierStore> = Arc::new(store);
        let registry: Arc<dyn BusinessRegistry> = Arc::new(registry);
        (store, registry)
    };

    let session = FormSession::new(store, Arc::clone(&registry), &config);
    info!(session_id = %session.id(), "session started");

    Repl::new(session, registry).run().await
}
