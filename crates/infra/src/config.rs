//! Configuration loading and representation.
//!
//! Values come from `SUPPLYID_*` environment variables with development
//! defaults for anything unset.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 8_000;
pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:8090";
pub const DEFAULT_STORE_URL: &str = "http://localhost:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Runtime configuration of a resolver process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Quiet period before a lookup channel fires.
    pub debounce: Duration,
    pub registry_url: String,
    /// Upper bound on a single registry call.
    pub registry_timeout: Duration,
    pub store_url: String,
    /// Bearer token sent to the store and the registry.
    pub auth_token: Option<String>,
    /// Use the in-memory store and registry instead of the HTTP adapters.
    pub in_memory: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            registry_timeout: Duration::from_millis(DEFAULT_REGISTRY_TIMEOUT_MS),
            store_url: DEFAULT_STORE_URL.to_string(),
            auth_token: None,
            in_memory: false,
        }
    }
}

impl ResolverConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source (used by tests).
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let millis = |var: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match get(var) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::Invalid { var, value: raw }),
            }
        };

        let in_memory = match get("SUPPLYID_IN_MEMORY") {
            None => defaults.in_memory,
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| ConfigError::Invalid {
                var: "SUPPLYID_IN_MEMORY",
                value: raw,
            })?,
        };

        Ok(Self {
            debounce: millis("SUPPLYID_DEBOUNCE_MS", defaults.debounce)?,
            registry_url: get("SUPPLYID_REGISTRY_URL").unwrap_or(defaults.registry_url),
            registry_timeout: millis("SUPPLYID_REGISTRY_TIMEOUT_MS", defaults.registry_timeout)?,
            store_url: get("SUPPLYID_STORE_URL").unwrap_or(defaults.store_url),
            auth_token: get("SUPPLYID_AUTH_TOKEN").filter(|t| !t.trim().is_empty()),
            in_memory,
        })
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}
