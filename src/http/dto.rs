//! Data Transfer Objects for the HTTP API.
//!
//! These DTOs are used for request/response serialization in the REST API.
//! The calculation result DTOs are re-exported from the api module since
//! they already derive Serialize/Deserialize.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::ValuationId;

// Re-export existing DTOs that are already serializable
pub use crate::api::{
    ActivityBreakdown, CptCode, Institution, PayerMultiplier, PayerMix, PayerType, ProcedureType,
    Provider, ProviderType, Rate, RateComponent, RateMode, Scenario, ScenarioComparison,
    ScenarioLine, ScenarioProcedure, Site, SiteType, Valuation, ValuationActivity,
    ValuationSummary,
};

/// Generic list response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Request body for creating or replacing a CPT code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertCptCodeRequest {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub work_rvu: Option<Decimal>,
    pub procedure_type: ProcedureType,
}

/// Request body for creating or updating an institution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionRequest {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Request body for creating or updating a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub name: String,
    pub provider_type: ProviderType,
    pub home_institution_id: i64,
}

/// Request body for creating or updating a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRequest {
    pub name: String,
    pub site_type: SiteType,
    pub institution_id: i64,
}

/// Request body for upserting a rate on its logical key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertRateRequest {
    pub cpt_code: String,
    pub payer_type: PayerType,
    pub site_type: SiteType,
    pub component: RateComponent,
    pub amount_cents: i64,
}

/// Request body for upserting a payer multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertMultiplierRequest {
    pub payer_type: PayerType,
    pub professional_ratio: i32,
    pub technical_ratio: i32,
    pub global_ratio: i32,
}

/// One activity line in a valuation creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub cpt_code: String,
    #[serde(default)]
    pub monthly_orders: i32,
    #[serde(default)]
    pub monthly_reads: i32,
    #[serde(default)]
    pub monthly_performs: i32,
}

/// Request body for creating a valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateValuationRequest {
    pub provider_id: i64,
    #[serde(default)]
    pub site_id: Option<i64>,
    #[serde(default)]
    pub monthly_patients: i32,
    pub activities: Vec<ActivityRequest>,
}

/// Response for valuation creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateValuationResponse {
    pub valuation_id: ValuationId,
    /// Present when the valuation is guest-owned; the client must send this
    /// token back to read or delete the valuation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_session: Option<String>,
}

/// One procedure line in a scenario creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioProcedureRequest {
    pub cpt_code: String,
    pub quantity: i32,
}

/// Request body for creating a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScenarioRequest {
    pub provider_name: String,
    #[serde(default)]
    pub monthly_patients: i32,
    pub medicare_pct: i32,
    pub commercial_pct: i32,
    pub medicaid_pct: i32,
    pub site_type: SiteType,
    pub rate_mode: RateMode,
    pub procedures: Vec<ScenarioProcedureRequest>,
}

impl CreateScenarioRequest {
    /// Validate the request before any storage or calculation happens.
    pub fn validate(&self) -> Result<(), String> {
        PayerMix::new(self.medicare_pct, self.commercial_pct, self.medicaid_pct).validate()?;
        if self.procedures.is_empty() {
            return Err("Scenario must contain at least one procedure".to_string());
        }
        Ok(())
    }
}

/// Response carrying only a created row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// Response for delete operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

/// Query parameters for the valuation calculate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CalculateQuery {
    /// Payer whose rates price the valuation (default: medicare)
    #[serde(default)]
    pub payer: Option<PayerType>,
}

/// Query parameters for the rate list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RateListQuery {
    #[serde(default)]
    pub cpt_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_request_validation() {
        let mut request = CreateScenarioRequest {
            provider_name: "Dr. Test".to_string(),
            monthly_patients: 100,
            medicare_pct: 40,
            commercial_pct: 40,
            medicaid_pct: 20,
            site_type: SiteType::Fpa,
            rate_mode: RateMode::Manual,
            procedures: vec![ScenarioProcedureRequest {
                cpt_code: "99213".to_string(),
                quantity: 1,
            }],
        };
        assert!(request.validate().is_ok());

        request.medicaid_pct = 21;
        assert!(request.validate().is_err());

        request.medicaid_pct = 20;
        request.procedures.clear();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_calculate_query_parses_payer() {
        let query: CalculateQuery = serde_json::from_str(r#"{"payer":"commercial"}"#).unwrap();
        assert_eq!(query.payer, Some(PayerType::Commercial));
    }
}
