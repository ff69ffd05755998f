//! National business registry data, as returned by a lookup and as kept on a
//! domestic supplier record.

use serde::{Deserialize, Serialize};

/// Registry-owned descriptive fields of a domestic supplier.
///
/// These fields are never hand-edited: they are only ever replaced as a whole
/// by [`crate::merge_registry_payload`] or cleared by [`crate::switch_origin`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryProfile {
    /// Taxpayer status (e.g. `ACTIVO`).
    pub status: Option<String>,
    /// Domicile condition (e.g. `HABIDO`).
    pub condition: Option<String>,
    pub taxpayer_type: Option<String>,
    #[serde(default)]
    pub industry_codes: Vec<String>,
    pub worker_count: Option<u32>,
    pub billing_system: Option<String>,
    pub accounting_system: Option<String>,
    pub foreign_trade: Option<String>,
    /// Six-digit geographic code of the fiscal domicile.
    pub geo_code: Option<String>,
    pub department: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    /// Registry publication period the data was taken from (e.g. `2024-05`).
    pub publication_period: Option<String>,
}

impl RegistryProfile {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A registry lookup hit.
///
/// Field names follow the registry's camelCase wire format. Text values are
/// kept as sent; normalization happens when the payload is merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryPayload {
    pub tax_id: String,
    pub legal_name: String,
    pub address: Option<String>,
    #[serde(flatten)]
    pub profile: RegistryProfile,
}

impl RegistryPayload {
    /// Registry profile with blank strings dropped and codes normalized.
    pub fn normalized_profile(&self) -> RegistryProfile {
        fn clean(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty() && *s != "-")
                .map(str::to_uppercase)
        }

        let p = &self.profile;
        RegistryProfile {
            status: clean(&p.status),
            condition: clean(&p.condition),
            taxpayer_type: clean(&p.taxpayer_type),
            industry_codes: p
                .industry_codes
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            worker_count: p.worker_count,
            billing_system: clean(&p.billing_system),
            accounting_system: clean(&p.accounting_system),
            foreign_trade: clean(&p.foreign_trade),
            geo_code: clean(&p.geo_code),
            department: clean(&p.department),
            province: clean(&p.province),
            district: clean(&p.district),
            publication_period: p
                .publication_period
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}
