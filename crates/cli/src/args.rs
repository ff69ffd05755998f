//! Command-line arguments.

use std::time::Duration;

use clap::Parser;
use supplyid_infra::ResolverConfig;

#[derive(Parser, Debug)]
#[command(name = "supplyid")]
#[command(version, about = "Resolve, reconcile and register suppliers from the terminal")]
#[command(long_about = r#"
Interactive supplier form. Type a tax id or a name and the resolver looks it up
in the local supplier store and, for tax ids, in the national business registry.

Settings come from SUPPLYID_* environment variables; flags override them.

Example:
  supplyid --in-memory
  supplyid --store-url http://suppliers.internal --registry-url http://registry.internal
"#)]
pub struct Cli {
    /// Use an in-memory store and a demo registry instead of the HTTP services
    #[arg(long)]
    pub in_memory: bool,

    /// Supplier store base URL
    #[arg(long, value_name = "URL")]
    pub store_url: Option<String>,

    /// Registry base URL
    #[arg(long, value_name = "URL")]
    pub registry_url: Option<String>,

    /// Debounce interval for lookups, in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,
}

impl Cli {
    /// Layer the flags over `config`.
    pub fn apply(&self, mut config: ResolverConfig) -> ResolverConfig {
        if self.in_memory {
            config.in_memory = true;
        }
        if let Some(url) = &self.store_url {
            config.store_url = url.clone();
        }
        if let Some(url) = &self.registry_url {
            config.registry_url = url.clone();
        }
        if let Some(ms) = self.debounce_ms {
            config = config.with_debounce(Duration::from_millis(ms));
        }
        config
    }
}
