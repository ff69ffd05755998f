//! Tax identifier rules.
//!
//! Two rules live here and they are deliberately different:
//!
//! - [`classify`] uses the loose 11-digit shape. It decides whether a search
//!   string is eligible for a registry lookup.
//! - [`is_well_formed_tax_id`] additionally checks the prefix. It decides
//!   whether a record may be saved.
//!
//! An 11-digit identifier with an unknown prefix is still sent to the registry
//! so the operator gets feedback, but it can never be persisted.

use serde::{Deserialize, Serialize};

use supplyid_core::{DomainError, DomainResult, ValueObject};

/// Number of digits in a national tax identifier.
pub const TAX_ID_LEN: usize = 11;

/// Two-digit prefixes accepted for domestic suppliers
/// (`10` natural persons, `20` legal entities).
pub const APPROVED_TAX_ID_PREFIXES: [&str; 2] = ["10", "20"];

/// Classification of a raw search string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Exactly 11 ASCII digits: eligible for a registry lookup.
    Identifier,
    /// Any other non-blank input: searched locally by name only.
    FreeText,
    /// Blank input: never looked up.
    Empty,
}

fn is_eleven_digits(s: &str) -> bool {
    s.len() == TAX_ID_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

/// Classify a search string. Surrounding whitespace is ignored.
pub fn classify(input: &str) -> QueryKind {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        QueryKind::Empty
    } else if is_eleven_digits(trimmed) {
        QueryKind::Identifier
    } else {
        QueryKind::FreeText
    }
}

/// Whether `input` is a tax identifier that may be saved on a domestic supplier.
pub fn is_well_formed_tax_id(input: &str) -> bool {
    is_eleven_digits(input) && APPROVED_TAX_ID_PREFIXES.iter().any(|p| input.starts_with(p))
}

/// A well-formed national tax identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxId(String);

impl TaxId {
    pub fn parse(input: &str) -> DomainResult<Self> {
        let trimmed = input.trim();
        if !is_eleven_digits(trimmed) {
            return Err(DomainError::validation(format!(
                "tax id must have exactly {TAX_ID_LEN} digits"
            )));
        }
        if !is_well_formed_tax_id(trimmed) {
            return Err(DomainError::validation(format!(
                "tax id must start with one of {}",
                APPROVED_TAX_ID_PREFIXES.join(", ")
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for TaxId {}

impl core::fmt::Display for TaxId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaxId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TaxId> for String {
    fn from(value: TaxId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_distinguishes_identifier_free_text_and_empty() {
        assert_eq!(classify("20123456789"), QueryKind::Identifier);
        assert_eq!(classify("12345678901"), QueryKind::Identifier);
        assert_eq!(classify("  20123456789 "), QueryKind::Identifier);
        assert_eq!(classify("Juan Perez"), QueryKind::FreeText);
        assert_eq!(classify("2012345678"), QueryKind::FreeText);
        assert_eq!(classify("201234567890"), QueryKind::FreeText);
        assert_eq!(classify("2012345678a"), QueryKind::FreeText);
        assert_eq!(classify(""), QueryKind::Empty);
        assert_eq!(classify(" \t\n"), QueryKind::Empty);
    }

    #[test]
    fn well_formed_requires_approved_prefix() {
        assert!(is_well_formed_tax_id("10123456789"));
        assert!(is_well_formed_tax_id("20123456789"));
        assert!(!is_well_formed_tax_id("12345678901"));
        assert!(!is_well_formed_tax_id("15123456789"));
        assert!(!is_well_formed_tax_id("2012345678"));
        assert!(!is_well_formed_tax_id(""));
    }

    #[test]
    fn non_ascii_digits_are_not_identifiers() {
        // Arabic-Indic digits are numeric but not ASCII.
        assert_eq!(classify("٢٠١٢٣٤٥٦٧٨٩"), QueryKind::FreeText);
        assert!(!is_well_formed_tax_id("٢٠١٢٣٤٥٦٧٨٩"));
    }

    #[test]
    fn tax_id_parse_rejects_unknown_prefix() {
        assert!(TaxId::parse("20123456789").is_ok());
        match TaxId::parse("12345678901").unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("10, 20")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn tax_id_deserialization_validates() {
        let ok: TaxId = serde_json::from_str("\"10123456789\"").unwrap();
        assert_eq!(ok.as_str(), "10123456789");
        assert!(serde_json::from_str::<TaxId>("\"99999999999\"").is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: every 11-digit string is an identifier.
            #[test]
            fn eleven_digits_classify_as_identifier(s in "[0-9]{11}") {
                prop_assert_eq!(classify(&s), QueryKind::Identifier);
            }

            /// Property: non-blank strings of any other shape are free text.
            #[test]
            fn other_non_blank_input_is_free_text(s in "[A-Za-z ]{0,5}[A-Za-z][0-9A-Za-z ]{0,20}") {
                prop_assert_eq!(classify(&s), QueryKind::FreeText);
            }

            /// Property: blank strings are empty.
            #[test]
            fn blank_input_is_empty(s in "[ \t\r\n]{0,12}") {
                prop_assert_eq!(classify(&s), QueryKind::Empty);
            }

            /// Property: well-formed implies identifier, and the prefix decides the rest.
            #[test]
            fn well_formed_is_identifier_with_approved_prefix(s in "[0-9]{11}") {
                let approved = s.starts_with("10") || s.starts_with("20");
                prop_assert_eq!(is_well_formed_tax_id(&s), approved);
            }
        }
    }
}
