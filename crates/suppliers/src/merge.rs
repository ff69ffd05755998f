//! Record merge engine: registry payload merging and origin switching.
//!
//! Both operations are pure constructors: they take the current record and
//! return the next one, leaving the caller to decide when to replace state.

use crate::record::{Origin, OriginDetails, SupplierRecord};
use crate::registry::RegistryPayload;

/// Merge a registry lookup hit into the current record.
///
/// Registry-owned fields (tax id, legal name, address, registry profile) are
/// taken from the payload; user-owned fields (contact details, active flag)
/// are left as they are. A payload value that is blank does not erase a value
/// the record already has.
///
/// Registry data never applies to a foreign supplier, so a foreign record is
/// returned unchanged.
///
/// Applying the same payload twice yields the same record as applying it once.
pub fn merge_registry_payload(current: &SupplierRecord, payload: &RegistryPayload) -> SupplierRecord {
    let mut next = current.clone();

    let OriginDetails::Domestic { tax_id, registry } = &mut next.details else {
        return next;
    };

    let incoming_tax_id = payload.tax_id.trim();
    if !incoming_tax_id.is_empty() {
        *tax_id = incoming_tax_id.to_string();
    }
    *registry = payload.normalized_profile();

    let legal_name = payload.legal_name.trim();
    if !legal_name.is_empty() {
        next.legal_name = legal_name.to_uppercase();
    }

    if let Some(address) = payload.address.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        next.address = address.to_uppercase();
    }

    next
}

/// Switch a record to another origin.
///
/// The common fields (legal name, address, contact details, active flag, id and
/// timestamps) survive the switch. The origin-specific part is rebuilt empty:
/// a foreign record has no tax id or registry data, and a record switched back
/// to domestic must be populated again by a fresh registry lookup.
///
/// Switching to the current origin is a no-op.
pub fn switch_origin(current: &SupplierRecord, new_origin: Origin) -> SupplierRecord {
    if current.origin() == new_origin {
        return current.clone();
    }

    SupplierRecord {
        details: OriginDetails::empty(new_origin),
        ..current.clone()
    }
}
