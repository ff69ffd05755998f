//! Validation engine: per-field rules and record-level derived flags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identifier::{is_well_formed_tax_id, APPROVED_TAX_ID_PREFIXES, TAX_ID_LEN};
use crate::record::{Field, SupplierRecord};

/// Field-keyed validation messages.
///
/// Local validation failures and store-side rejections share this shape so the
/// caller renders both the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// Clear one field's error; other fields keep theirs.
    pub fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }

    /// Replace the error for `field` with the result of a fresh validation.
    pub fn set(&mut self, field: Field, message: Option<String>) {
        match message {
            Some(m) => self.insert(field, m),
            None => self.clear(field),
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

impl FromIterator<(Field, String)> for FieldErrors {
    fn from_iter<T: IntoIterator<Item = (Field, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn required(value: &str, label: &str) -> Option<String> {
    if value.trim().is_empty() {
        Some(format!("{label} is required"))
    } else {
        None
    }
}

/// Validate one field of `record`. Returns the error message, if any.
pub fn validate_field(record: &SupplierRecord, field: Field) -> Option<String> {
    match field {
        Field::LegalName => required(&record.legal_name, "legal name"),
        Field::Address => required(&record.address, "address"),
        Field::Phone => required(&record.contact.phone, "phone"),
        Field::TaxId => {
            // Foreign suppliers have no tax id to validate.
            let tax_id = record.tax_id()?.trim();
            if tax_id.is_empty() {
                Some("tax id is required for domestic suppliers".to_string())
            } else if !is_well_formed_tax_id(tax_id) {
                Some(format!(
                    "tax id must be {TAX_ID_LEN} digits starting with {}",
                    APPROVED_TAX_ID_PREFIXES.join(" or ")
                ))
            } else {
                None
            }
        }
        Field::Email => {
            let email = record.contact.email.trim();
            if email.is_empty() || looks_like_email(email) {
                None
            } else {
                Some("email is not a valid address".to_string())
            }
        }
        Field::Representative | Field::ContactPerson => None,
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

/// Validate every field of `record`.
pub fn validate(record: &SupplierRecord) -> FieldErrors {
    Field::ALL
        .into_iter()
        .filter_map(|f| validate_field(record, f).map(|m| (f, m)))
        .collect()
}

/// Whether the record may be printed or exported.
///
/// Only persisted records qualify, and only when legal name, address, phone and
/// email are all present. Always derived, never stored.
pub fn print_eligible(record: &SupplierRecord) -> bool {
    record.is_persisted()
        && [
            &record.legal_name,
            &record.address,
            &record.contact.phone,
            &record.contact.email,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Origin;
    use supplyid_core::SupplierId;

    fn complete(origin: Origin) -> SupplierRecord {
        let mut r = SupplierRecord::draft(origin);
        if origin == Origin::Domestic {
            r.set_field(Field::TaxId, "20123456789").unwrap();
        }
        r.set_field(Field::LegalName, "Acme SAC").unwrap();
        r.set_field(Field::Address, "Av. Los Pinos 123").unwrap();
        r.set_field(Field::Phone, "555-1234").unwrap();
        r.set_field(Field::Email, "ventas@acme.pe").unwrap();
        r
    }

    #[test]
    fn complete_records_validate_cleanly() {
        assert!(validate(&complete(Origin::Domestic)).is_empty());
        assert!(validate(&complete(Origin::Foreign)).is_empty());
    }

    #[test]
    fn required_fields_are_checked_after_trimming() {
        let mut r = complete(Origin::Foreign);
        r.set_field(Field::LegalName, "   ").unwrap();
        r.set_field(Field::Phone, "").unwrap();

        let errors = validate(&r);
        assert!(errors.contains(Field::LegalName));
        assert!(errors.contains(Field::Phone));
        assert!(!errors.contains(Field::Address));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn tax_id_is_required_only_for_domestic() {
        let mut domestic = complete(Origin::Domestic);
        domestic.set_field(Field::TaxId, "").unwrap();
        let errors = validate(&domestic);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec![Field::TaxId]);

        let foreign = complete(Origin::Foreign);
        assert_eq!(validate_field(&foreign, Field::TaxId), None);
    }

    #[test]
    fn eleven_digits_with_unknown_prefix_is_not_savable() {
        let mut r = complete(Origin::Domestic);
        r.set_field(Field::TaxId, "12345678901").unwrap();
        let msg = validate_field(&r, Field::TaxId).unwrap();
        assert!(msg.contains("10 or 20"));
    }

    #[test]
    fn malformed_email_is_flagged_but_empty_email_is_fine() {
        let mut r = complete(Origin::Foreign);
        r.set_field(Field::Email, "ventas@acme").unwrap();
        assert!(validate_field(&r, Field::Email).is_some());

        r.set_field(Field::Email, "").unwrap();
        assert!(validate_field(&r, Field::Email).is_none());
    }

    #[test]
    fn clearing_one_error_keeps_the_others() {
        let mut errors = validate(&SupplierRecord::draft(Origin::Domestic));
        assert!(errors.contains(Field::LegalName));
        assert!(errors.contains(Field::Address));

        errors.clear(Field::LegalName);
        assert!(!errors.contains(Field::LegalName));
        assert!(errors.contains(Field::Address));
        assert!(errors.contains(Field::Phone));
        assert!(errors.contains(Field::TaxId));
    }

    #[test]
    fn print_eligibility_requires_persisted_complete_record() {
        let mut r = complete(Origin::Domestic);
        assert!(!print_eligible(&r), "drafts are never printable");

        r.id = Some(SupplierId::new());
        assert!(print_eligible(&r));

        for field in [Field::LegalName, Field::Address, Field::Phone, Field::Email] {
            let mut missing = r.clone();
            missing.set_field(field, " ").unwrap();
            assert!(!print_eligible(&missing), "{field} missing should block printing");
        }
    }

    #[test]
    fn field_errors_serialize_keyed_by_wire_name() {
        let mut errors = FieldErrors::new();
        errors.insert(Field::TaxId, "required");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "taxId": "required" }));
    }
}
