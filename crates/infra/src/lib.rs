//! Infrastructure layer: supplier store and registry adapters, lookup
//! orchestration, debouncing, submission and the form session that ties them
//! together.

pub mod config;
pub mod debounce;
pub mod lookup;
pub mod registry;
pub mod session;
pub mod store;
pub mod submission;


pub use config::{ConfigError, ResolverConfig};
pub use debounce::Debouncer;
pub use lookup::{LookupError, LookupOrchestrator, LookupQuery, LookupResult, LookupSequencer};
pub use registry::{BusinessRegistry, HttpRegistryClient, RegistryError, StaticRegistry};
pub use session::{FormSession, FormSnapshot, LookupChannel, Notice, NoticeLevel};
pub use store::{HttpSupplierStore, InMemorySupplierStore, StoreError, StoredSupplier, SupplierStore};
pub use submission::{SubmissionCoordinator, SubmitOutcome};
