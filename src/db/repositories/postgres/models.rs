use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{
    cpt_codes, institutions, payer_multipliers, providers, rates, scenario_procedures, scenarios,
    sites, valuation_activities, valuations,
};
use crate::api::{InstitutionId, ProviderId, RateId, ScenarioId, SiteId, ValuationId};
use crate::db::repository::RepositoryError;
use crate::models::catalog::{CptCode, Institution, PayerMultiplier, Provider, Rate, Site};
use crate::models::scenario::{PayerMix, Scenario, ScenarioProcedure};
use crate::models::valuation::{Valuation, ValuationActivity, ValuationOwner};

/// Parse a text-encoded enum column, mapping corruption to an internal error.
fn parse_column<T>(value: &str, column: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| RepositoryError::internal(format!("Corrupt {} column: {}", column, e)))
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = cpt_codes)]
pub struct CptCodeRow {
    pub code: String,
    pub description: String,
    pub work_rvu: Option<Decimal>,
    pub procedure_type: String,
}

impl From<&CptCode> for CptCodeRow {
    fn from(cpt: &CptCode) -> Self {
        Self {
            code: cpt.code.clone(),
            description: cpt.description.clone(),
            work_rvu: cpt.work_rvu,
            procedure_type: cpt.procedure_type.as_str().to_string(),
        }
    }
}

impl TryFrom<CptCodeRow> for CptCode {
    type Error = RepositoryError;

    fn try_from(row: CptCodeRow) -> Result<Self, Self::Error> {
        Ok(CptCode {
            procedure_type: parse_column(&row.procedure_type, "procedure_type")?,
            code: row.code,
            description: row.description,
            work_rvu: row.work_rvu,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = institutions)]
pub struct InstitutionRow {
    pub institution_id: i64,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = institutions)]
pub struct NewInstitutionRow {
    pub name: String,
    pub active: bool,
}

impl From<InstitutionRow> for Institution {
    fn from(row: InstitutionRow) -> Self {
        Institution {
            id: Some(InstitutionId::new(row.institution_id)),
            name: row.name,
            active: row.active,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = providers)]
pub struct ProviderRow {
    pub provider_id: i64,
    pub name: String,
    pub provider_type: String,
    pub home_institution_id: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = providers)]
pub struct NewProviderRow {
    pub name: String,
    pub provider_type: String,
    pub home_institution_id: i64,
}

impl From<&Provider> for NewProviderRow {
    fn from(provider: &Provider) -> Self {
        Self {
            name: provider.name.clone(),
            provider_type: provider.provider_type.as_str().to_string(),
            home_institution_id: provider.home_institution_id.value(),
        }
    }
}

impl TryFrom<ProviderRow> for Provider {
    type Error = RepositoryError;

    fn try_from(row: ProviderRow) -> Result<Self, Self::Error> {
        Ok(Provider {
            id: Some(ProviderId::new(row.provider_id)),
            provider_type: parse_column(&row.provider_type, "provider_type")?,
            name: row.name,
            home_institution_id: InstitutionId::new(row.home_institution_id),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sites)]
pub struct SiteRow {
    pub site_id: i64,
    pub name: String,
    pub site_type: String,
    pub institution_id: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sites)]
pub struct NewSiteRow {
    pub name: String,
    pub site_type: String,
    pub institution_id: i64,
}

impl From<&Site> for NewSiteRow {
    fn from(site: &Site) -> Self {
        Self {
            name: site.name.clone(),
            site_type: site.site_type.as_str().to_string(),
            institution_id: site.institution_id.value(),
        }
    }
}

impl TryFrom<SiteRow> for Site {
    type Error = RepositoryError;

    fn try_from(row: SiteRow) -> Result<Self, Self::Error> {
        Ok(Site {
            id: Some(SiteId::new(row.site_id)),
            site_type: parse_column(&row.site_type, "site_type")?,
            name: row.name,
            institution_id: InstitutionId::new(row.institution_id),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rates)]
pub struct RateRow {
    pub rate_id: i64,
    pub cpt_code: String,
    pub payer_type: String,
    pub site_type: String,
    pub component: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rates)]
pub struct NewRateRow {
    pub cpt_code: String,
    pub payer_type: String,
    pub site_type: String,
    pub component: String,
    pub amount_cents: i64,
}

impl From<&Rate> for NewRateRow {
    fn from(rate: &Rate) -> Self {
        Self {
            cpt_code: rate.cpt_code.clone(),
            payer_type: rate.payer_type.as_str().to_string(),
            site_type: rate.site_type.as_str().to_string(),
            component: rate.component.as_str().to_string(),
            amount_cents: rate.amount_cents,
        }
    }
}

impl TryFrom<RateRow> for Rate {
    type Error = RepositoryError;

    fn try_from(row: RateRow) -> Result<Self, Self::Error> {
        Ok(Rate {
            id: Some(RateId::new(row.rate_id)),
            payer_type: parse_column(&row.payer_type, "payer_type")?,
            site_type: parse_column(&row.site_type, "site_type")?,
            component: parse_column(&row.component, "component")?,
            cpt_code: row.cpt_code,
            amount_cents: row.amount_cents,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = payer_multipliers)]
pub struct PayerMultiplierRow {
    pub payer_type: String,
    pub professional_ratio: i32,
    pub technical_ratio: i32,
    pub global_ratio: i32,
}

impl From<&PayerMultiplier> for PayerMultiplierRow {
    fn from(multiplier: &PayerMultiplier) -> Self {
        Self {
            payer_type: multiplier.payer_type.as_str().to_string(),
            professional_ratio: multiplier.professional_ratio,
            technical_ratio: multiplier.technical_ratio,
            global_ratio: multiplier.global_ratio,
        }
    }
}

impl TryFrom<PayerMultiplierRow> for PayerMultiplier {
    type Error = RepositoryError;

    fn try_from(row: PayerMultiplierRow) -> Result<Self, Self::Error> {
        Ok(PayerMultiplier {
            payer_type: parse_column(&row.payer_type, "payer_type")?,
            professional_ratio: row.professional_ratio,
            technical_ratio: row.technical_ratio,
            global_ratio: row.global_ratio,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = valuations)]
pub struct ValuationRow {
    pub valuation_id: i64,
    pub provider_id: i64,
    pub site_id: Option<i64>,
    pub monthly_patients: i32,
    pub owner_kind: String,
    pub owner_token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = valuations)]
pub struct NewValuationRow {
    pub provider_id: i64,
    pub site_id: Option<i64>,
    pub monthly_patients: i32,
    pub owner_kind: String,
    pub owner_token: String,
    pub created_at: DateTime<Utc>,
}

pub fn owner_columns(owner: &ValuationOwner) -> (String, String) {
    match owner {
        ValuationOwner::User(id) => ("user".to_string(), id.clone()),
        ValuationOwner::Guest(token) => ("guest".to_string(), token.clone()),
    }
}

fn owner_from_columns(kind: &str, token: &str) -> Result<ValuationOwner, RepositoryError> {
    match kind {
        "user" => Ok(ValuationOwner::User(token.to_string())),
        "guest" => Ok(ValuationOwner::Guest(token.to_string())),
        other => Err(RepositoryError::internal(format!(
            "Corrupt owner_kind column: {}",
            other
        ))),
    }
}

impl From<&Valuation> for NewValuationRow {
    fn from(valuation: &Valuation) -> Self {
        let (owner_kind, owner_token) = owner_columns(&valuation.owner);
        Self {
            provider_id: valuation.provider_id.value(),
            site_id: valuation.site_id.map(|id| id.value()),
            monthly_patients: valuation.monthly_patients,
            owner_kind,
            owner_token,
            created_at: valuation.created_at,
        }
    }
}

impl ValuationRow {
    pub fn into_valuation(
        self,
        activities: Vec<ValuationActivity>,
    ) -> Result<Valuation, RepositoryError> {
        Ok(Valuation {
            id: Some(ValuationId::new(self.valuation_id)),
            provider_id: ProviderId::new(self.provider_id),
            site_id: self.site_id.map(SiteId::new),
            monthly_patients: self.monthly_patients,
            owner: owner_from_columns(&self.owner_kind, &self.owner_token)?,
            created_at: self.created_at,
            activities,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = valuation_activities)]
#[allow(dead_code)] // activity_id is used only by the database
pub struct ValuationActivityRow {
    pub activity_id: i64,
    pub valuation_id: i64,
    pub cpt_code: String,
    pub monthly_orders: i32,
    pub monthly_reads: i32,
    pub monthly_performs: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = valuation_activities)]
pub struct NewValuationActivityRow {
    pub valuation_id: i64,
    pub cpt_code: String,
    pub monthly_orders: i32,
    pub monthly_reads: i32,
    pub monthly_performs: i32,
}

impl From<ValuationActivityRow> for ValuationActivity {
    fn from(row: ValuationActivityRow) -> Self {
        ValuationActivity {
            cpt_code: row.cpt_code,
            monthly_orders: row.monthly_orders,
            monthly_reads: row.monthly_reads,
            monthly_performs: row.monthly_performs,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = scenarios)]
pub struct ScenarioRow {
    pub scenario_id: i64,
    pub provider_name: String,
    pub monthly_patients: i32,
    pub medicare_pct: i32,
    pub commercial_pct: i32,
    pub medicaid_pct: i32,
    pub site_type: String,
    pub rate_mode: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = scenarios)]
pub struct NewScenarioRow {
    pub provider_name: String,
    pub monthly_patients: i32,
    pub medicare_pct: i32,
    pub commercial_pct: i32,
    pub medicaid_pct: i32,
    pub site_type: String,
    pub rate_mode: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Scenario> for NewScenarioRow {
    fn from(scenario: &Scenario) -> Self {
        Self {
            provider_name: scenario.provider_name.clone(),
            monthly_patients: scenario.monthly_patients,
            medicare_pct: scenario.payer_mix.medicare_pct,
            commercial_pct: scenario.payer_mix.commercial_pct,
            medicaid_pct: scenario.payer_mix.medicaid_pct,
            site_type: scenario.site_type.as_str().to_string(),
            rate_mode: scenario.rate_mode.as_str().to_string(),
            created_at: scenario.created_at,
        }
    }
}

impl ScenarioRow {
    pub fn into_scenario(
        self,
        procedures: Vec<ScenarioProcedure>,
    ) -> Result<Scenario, RepositoryError> {
        Ok(Scenario {
            id: Some(ScenarioId::new(self.scenario_id)),
            payer_mix: PayerMix::new(self.medicare_pct, self.commercial_pct, self.medicaid_pct),
            site_type: parse_column(&self.site_type, "site_type")?,
            rate_mode: parse_column(&self.rate_mode, "rate_mode")?,
            provider_name: self.provider_name,
            monthly_patients: self.monthly_patients,
            created_at: self.created_at,
            procedures,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = scenario_procedures)]
#[allow(dead_code)] // procedure_id is used only by the database
pub struct ScenarioProcedureRow {
    pub procedure_id: i64,
    pub scenario_id: i64,
    pub cpt_code: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = scenario_procedures)]
pub struct NewScenarioProcedureRow {
    pub scenario_id: i64,
    pub cpt_code: String,
    pub quantity: i32,
}

impl From<ScenarioProcedureRow> for ScenarioProcedure {
    fn from(row: ScenarioProcedureRow) -> Self {
        ScenarioProcedure {
            cpt_code: row.cpt_code,
            quantity: row.quantity,
        }
    }
}
