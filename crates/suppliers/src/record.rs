use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplyid_core::{DomainError, DomainResult, SupplierId};

use crate::registry::RegistryProfile;

/// Supplier origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Domestic,
    Foreign,
}

impl core::str::FromStr for Origin {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "domestic" => Ok(Origin::Domestic),
            "foreign" => Ok(Origin::Foreign),
            other => Err(DomainError::validation(format!(
                "origin must be one of: domestic, foreign (got {other:?})"
            ))),
        }
    }
}

/// Origin-dependent part of a supplier record.
///
/// Only domestic suppliers carry a tax identifier and registry data; a foreign
/// supplier cannot hold either, so "clear the registry fields" is simply a
/// change of variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "lowercase")]
pub enum OriginDetails {
    Domestic {
        #[serde(rename = "taxId", default)]
        tax_id: String,
        #[serde(default)]
        registry: RegistryProfile,
    },
    Foreign,
}

impl OriginDetails {
    pub fn empty(origin: Origin) -> Self {
        match origin {
            Origin::Domestic => OriginDetails::Domestic {
                tax_id: String::new(),
                registry: RegistryProfile::default(),
            },
            Origin::Foreign => OriginDetails::Foreign,
        }
    }

    pub fn origin(&self) -> Origin {
        match self {
            OriginDetails::Domestic { .. } => Origin::Domestic,
            OriginDetails::Foreign => Origin::Foreign,
        }
    }
}

/// User-owned contact fields. Registry merges never touch these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub phone: String,
    pub email: String,
    pub representative: String,
    pub contact_person: String,
}

/// Hand-editable fields of a supplier form.
///
/// Registry descriptive fields have no variant here: they can only change
/// through a registry merge or an origin switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    TaxId,
    LegalName,
    Address,
    Phone,
    Email,
    Representative,
    ContactPerson,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::TaxId,
        Field::LegalName,
        Field::Address,
        Field::Phone,
        Field::Email,
        Field::Representative,
        Field::ContactPerson,
    ];

    /// Wire name (camelCase), as used by the store and in field-error maps.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::TaxId => "taxId",
            Field::LegalName => "legalName",
            Field::Address => "address",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::Representative => "representative",
            Field::ContactPerson => "contactPerson",
        }
    }
}

impl core::fmt::Display for Field {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Field {
    type Err = DomainError;

    /// Accepts the camelCase wire name or its snake_case spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Field::ALL
            .into_iter()
            .find(|f| {
                f.as_str() == key || f.as_str().to_lowercase() == key.replace('_', "").to_lowercase()
            })
            .ok_or_else(|| DomainError::validation(format!("unknown field: {key}")))
    }
}

/// Whether the origin selector may be changed for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginLock {
    /// New draft: origin can be toggled freely.
    Editable,
    /// Persisted, consistent record: origin is fixed.
    Locked,
    /// Persisted domestic record without a tax id. The origin stays editable so
    /// the operator can correct the record.
    Inconsistent,
}

impl OriginLock {
    pub fn allows_toggle(self) -> bool {
        !matches!(self, OriginLock::Locked)
    }
}

/// A supplier record: an in-memory draft or a persisted supplier being edited.
///
/// Text fields are kept as the operator typed them (after case normalization);
/// blank values mean "absent" and are converted at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRecord {
    pub id: Option<SupplierId>,
    pub legal_name: String,
    pub address: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub active: bool,
    #[serde(flatten)]
    pub details: OriginDetails,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SupplierRecord {
    /// Create an empty, not-yet-persisted draft.
    pub fn draft(origin: Origin) -> Self {
        Self {
            id: None,
            legal_name: String::new(),
            address: String::new(),
            contact: ContactDetails::default(),
            active: true,
            details: OriginDetails::empty(origin),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn origin(&self) -> Origin {
        self.details.origin()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Tax id of a domestic record (possibly empty); `None` for foreign records.
    pub fn tax_id(&self) -> Option<&str> {
        match &self.details {
            OriginDetails::Domestic { tax_id, .. } => Some(tax_id),
            OriginDetails::Foreign => None,
        }
    }

    pub fn registry(&self) -> Option<&RegistryProfile> {
        match &self.details {
            OriginDetails::Domestic { registry, .. } => Some(registry),
            OriginDetails::Foreign => None,
        }
    }

    /// Persisted domestic record lacking a tax id.
    pub fn is_inconsistent(&self) -> bool {
        self.is_persisted() && matches!(self.tax_id(), Some(t) if t.trim().is_empty())
    }

    pub fn origin_lock(&self) -> OriginLock {
        if !self.is_persisted() {
            OriginLock::Editable
        } else if self.is_inconsistent() {
            OriginLock::Inconsistent
        } else {
            OriginLock::Locked
        }
    }

    /// Current value of an editable field (empty when not applicable).
    pub fn field_value(&self, field: Field) -> &str {
        match field {
            Field::TaxId => self.tax_id().unwrap_or(""),
            Field::LegalName => &self.legal_name,
            Field::Address => &self.address,
            Field::Phone => &self.contact.phone,
            Field::Email => &self.contact.email,
            Field::Representative => &self.contact.representative,
            Field::ContactPerson => &self.contact.contact_person,
        }
    }

    /// Apply one keystroke-level edit.
    ///
    /// Free-text fields are upper-cased and email is lower-cased. Editing the
    /// tax id of a foreign supplier is rejected.
    pub fn set_field(&mut self, field: Field, value: &str) -> DomainResult<()> {
        match field {
            Field::TaxId => match &mut self.details {
                OriginDetails::Domestic { tax_id, .. } => *tax_id = value.trim().to_string(),
                OriginDetails::Foreign => {
                    return Err(DomainError::validation(
                        "tax id does not apply to foreign suppliers",
                    ));
                }
            },
            Field::LegalName => self.legal_name = value.to_uppercase(),
            Field::Address => self.address = value.to_uppercase(),
            Field::Phone => self.contact.phone = value.to_string(),
            Field::Email => self.contact.email = value.trim().to_lowercase(),
            Field::Representative => self.contact.representative = value.to_uppercase(),
            Field::ContactPerson => self.contact.contact_person = value.to_uppercase(),
        }
        Ok(())
    }
}
