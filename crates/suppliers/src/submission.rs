//! Submission payloads: what is sent to the supplier store on create/update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use supplyid_core::SupplierId;

use crate::record::{ContactDetails, Field, Origin, OriginDetails, SupplierRecord};
use crate::registry::RegistryProfile;
use crate::validation::{validate, FieldErrors};

/// Create/update body for the supplier store.
///
/// Carries no lifecycle metadata (id, timestamps). Optional text fields are
/// absent rather than empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPayload {
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    pub legal_name: String,
    pub address: String,
    /// Digits only.
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryProfile>,
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

impl SupplierPayload {
    /// Rebuild the record a store holds for this payload.
    pub fn into_record(
        self,
        id: SupplierId,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> SupplierRecord {
        let details = match self.origin {
            Origin::Domestic => OriginDetails::Domestic {
                tax_id: self.tax_id.unwrap_or_default(),
                registry: self.registry.unwrap_or_default(),
            },
            Origin::Foreign => OriginDetails::Foreign,
        };

        SupplierRecord {
            id: Some(id),
            legal_name: self.legal_name,
            address: self.address,
            contact: ContactDetails {
                phone: self.phone,
                email: self.email.unwrap_or_default(),
                representative: self.representative.unwrap_or_default(),
                contact_person: self.contact_person.unwrap_or_default(),
            },
            active: self.active,
            details,
            created_at,
            updated_at,
        }
    }
}

impl From<&SupplierRecord> for SupplierPayload {
    /// Normalize a record into store shape without validating it.
    fn from(record: &SupplierRecord) -> Self {
        let (tax_id, registry) = match &record.details {
            OriginDetails::Domestic { tax_id, registry } => (
                non_blank(tax_id),
                if registry.is_empty() { None } else { Some(registry.clone()) },
            ),
            OriginDetails::Foreign => (None, None),
        };

        SupplierPayload {
            origin: record.origin(),
            tax_id,
            legal_name: record.legal_name.trim().to_string(),
            address: record.address.trim().to_string(),
            phone: digits_only(&record.contact.phone),
            email: non_blank(&record.contact.email),
            representative: non_blank(&record.contact.representative),
            contact_person: non_blank(&record.contact.contact_person),
            active: record.active,
            registry,
        }
    }
}

fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Validate `record` and build its submission payload.
///
/// Returns the field errors instead when the record is not savable; no
/// collaborator is involved either way.
pub fn prepare_submission(record: &SupplierRecord) -> Result<SupplierPayload, FieldErrors> {
    let mut errors = validate(record);

    if digits_only(&record.contact.phone).is_empty() && !errors.contains(Field::Phone) {
        errors.insert(Field::Phone, "phone must contain digits");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(SupplierPayload::from(record))
}

/// Partial update body: only the top-level payload fields that changed.
///
/// A field that became absent is sent as an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierPatch(Map<String, JsonValue>);

fn to_object(payload: &SupplierPayload) -> Map<String, JsonValue> {
    match serde_json::to_value(payload) {
        Ok(JsonValue::Object(map)) => map,
        // A struct with named fields always serializes to an object.
        _ => Map::new(),
    }
}

impl SupplierPatch {
    /// Fields of `next` that differ from `baseline`.
    pub fn diff(baseline: &SupplierPayload, next: &SupplierPayload) -> Self {
        let before = to_object(baseline);
        let after = to_object(next);

        let mut changes = Map::new();
        for (key, value) in &after {
            if before.get(key) != Some(value) {
                changes.insert(key.clone(), value.clone());
            }
        }
        for key in before.keys() {
            if !after.contains_key(key) {
                changes.insert(key.clone(), JsonValue::Null);
            }
        }
        Self(changes)
    }

    /// Patch that sets every field of `payload`.
    pub fn full(payload: &SupplierPayload) -> Self {
        Self(to_object(payload))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Apply the patch on top of `base`.
    pub fn apply_to(&self, base: &SupplierPayload) -> Result<SupplierPayload, serde_json::Error> {
        let mut merged = to_object(base);
        for (key, value) in &self.0 {
            if value.is_null() {
                merged.remove(key);
            } else {
                merged.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(JsonValue::Object(merged))
    }
}
