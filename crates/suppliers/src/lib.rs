//! Supplier domain module (identity resolution and reconciliation rules).
//!
//! This crate contains the business rules for supplier records: tax identifier
//! classification, the origin-dependent record shape, registry payload merging,
//! validation and submission payload preparation. It is purely deterministic
//! domain logic (no IO, no HTTP, no timers).

pub mod identifier;
pub mod merge;
pub mod record;
pub mod registry;
pub mod submission;
pub mod validation;

pub use identifier::{classify, is_well_formed_tax_id, QueryKind, TaxId, APPROVED_TAX_ID_PREFIXES};
pub use merge::{merge_registry_payload, switch_origin};
pub use record::{ContactDetails, Field, Origin, OriginDetails, OriginLock, SupplierRecord};
pub use registry::{RegistryPayload, RegistryProfile};
pub use submission::{prepare_submission, SupplierPatch, SupplierPayload};
pub use validation::{print_eligible, validate, validate_field, FieldErrors};
