//! High-level database service layer.
//!
//! This module provides repository-agnostic database operations that work
//! with any implementation of the repository traits. These functions carry
//! the business validation that must hold regardless of the storage backend:
//! payer-mix totals, volume sanity checks, and the imaging/non-imaging
//! volume split.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (REST API)                           │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs) - Business Logic           │
//! │  - Creation-time validation                             │
//! │  - Referential checks with clear messages               │
//! │  - Cross-cutting concerns                               │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                │
//! ┌───▼──────────────┐     ┌───────────▼─────────────┐
//! │ Postgres         │     │ Local Repository        │
//! │ (Diesel)         │     │ (in-memory)             │
//! └──────────────────┘     └─────────────────────────┘
//! ```

use log::info;

use crate::api::{
    InstitutionId, ProviderId, RateId, ScenarioId, SiteId, ValuationId,
};
use crate::db::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::models::catalog::{
    CptCode, Institution, PayerMultiplier, PayerType, Provider, Rate, Site,
};
use crate::models::scenario::Scenario;
use crate::models::valuation::{Valuation, ValuationOwner};

// ==================== Health & Connection ====================

/// Check if the database connection is healthy.
pub async fn health_check(repo: &dyn FullRepository) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== CPT Codes ====================

pub async fn list_cpt_codes(repo: &dyn FullRepository) -> RepositoryResult<Vec<CptCode>> {
    repo.list_cpt_codes().await
}

pub async fn get_cpt_code(repo: &dyn FullRepository, code: &str) -> RepositoryResult<CptCode> {
    repo.get_cpt_code(code).await
}

/// Insert or replace a CPT code after validating its fields.
pub async fn upsert_cpt_code(repo: &dyn FullRepository, cpt: &CptCode) -> RepositoryResult<()> {
    if cpt.code.trim().is_empty() {
        return Err(RepositoryError::validation("CPT code must not be empty"));
    }
    if let Some(work_rvu) = cpt.work_rvu {
        if work_rvu.is_sign_negative() {
            return Err(RepositoryError::validation("work RVU must be non-negative"));
        }
    }
    repo.upsert_cpt_code(cpt).await
}

pub async fn delete_cpt_code(repo: &dyn FullRepository, code: &str) -> RepositoryResult<usize> {
    repo.delete_cpt_code(code).await
}

// ==================== Institutions ====================

pub async fn list_institutions(repo: &dyn FullRepository) -> RepositoryResult<Vec<Institution>> {
    repo.list_institutions().await
}

pub async fn get_institution(
    repo: &dyn FullRepository,
    id: InstitutionId,
) -> RepositoryResult<Institution> {
    repo.get_institution(id).await
}

pub async fn store_institution(
    repo: &dyn FullRepository,
    institution: &Institution,
) -> RepositoryResult<InstitutionId> {
    if institution.name.trim().is_empty() {
        return Err(RepositoryError::validation(
            "Institution name must not be empty",
        ));
    }
    repo.store_institution(institution).await
}

pub async fn delete_institution(
    repo: &dyn FullRepository,
    id: InstitutionId,
) -> RepositoryResult<usize> {
    repo.delete_institution(id).await
}

// ==================== Providers ====================

pub async fn list_providers(repo: &dyn FullRepository) -> RepositoryResult<Vec<Provider>> {
    repo.list_providers().await
}

pub async fn get_provider(
    repo: &dyn FullRepository,
    id: ProviderId,
) -> RepositoryResult<Provider> {
    repo.get_provider(id).await
}

pub async fn store_provider(
    repo: &dyn FullRepository,
    provider: &Provider,
) -> RepositoryResult<ProviderId> {
    if provider.name.trim().is_empty() {
        return Err(RepositoryError::validation(
            "Provider name must not be empty",
        ));
    }
    repo.store_provider(provider).await
}

pub async fn delete_provider(
    repo: &dyn FullRepository,
    id: ProviderId,
) -> RepositoryResult<usize> {
    repo.delete_provider(id).await
}

// ==================== Sites ====================

pub async fn list_sites(repo: &dyn FullRepository) -> RepositoryResult<Vec<Site>> {
    repo.list_sites().await
}

pub async fn get_site(repo: &dyn FullRepository, id: SiteId) -> RepositoryResult<Site> {
    repo.get_site(id).await
}

pub async fn store_site(repo: &dyn FullRepository, site: &Site) -> RepositoryResult<SiteId> {
    if site.name.trim().is_empty() {
        return Err(RepositoryError::validation("Site name must not be empty"));
    }
    repo.store_site(site).await
}

pub async fn delete_site(repo: &dyn FullRepository, id: SiteId) -> RepositoryResult<usize> {
    repo.delete_site(id).await
}

// ==================== Rates ====================

pub async fn list_rates(
    repo: &dyn FullRepository,
    cpt_code: Option<&str>,
) -> RepositoryResult<Vec<Rate>> {
    repo.list_rates(cpt_code).await
}

/// Insert or update a rate on its logical key. Last write wins on
/// concurrent edits; there is no optimistic concurrency control here.
pub async fn upsert_rate(repo: &dyn FullRepository, rate: &Rate) -> RepositoryResult<RateId> {
    if rate.amount_cents < 0 {
        return Err(RepositoryError::validation(
            "Rate amount must be non-negative",
        ));
    }
    if !rate.site_type.components().contains(&rate.component) {
        return Err(RepositoryError::validation(format!(
            "Component {} is not payable at {} sites",
            rate.component.as_str(),
            rate.site_type.as_str()
        )));
    }
    repo.upsert_rate(rate).await
}

pub async fn delete_rate(repo: &dyn FullRepository, id: RateId) -> RepositoryResult<usize> {
    repo.delete_rate(id).await
}

// ==================== Payer Multipliers ====================

pub async fn list_payer_multipliers(
    repo: &dyn FullRepository,
) -> RepositoryResult<Vec<PayerMultiplier>> {
    repo.list_payer_multipliers().await
}

pub async fn get_payer_multiplier(
    repo: &dyn FullRepository,
    payer: PayerType,
) -> RepositoryResult<PayerMultiplier> {
    repo.get_payer_multiplier(payer).await
}

pub async fn upsert_payer_multiplier(
    repo: &dyn FullRepository,
    multiplier: &PayerMultiplier,
) -> RepositoryResult<()> {
    if multiplier.professional_ratio < 0
        || multiplier.technical_ratio < 0
        || multiplier.global_ratio < 0
    {
        return Err(RepositoryError::validation(
            "Multiplier ratios must be non-negative",
        ));
    }
    repo.upsert_payer_multiplier(multiplier).await
}

// ==================== Valuations ====================

/// Store a new valuation after validating its activity rows.
///
/// Rules enforced here, before the repository's referential checks:
/// - at least one activity
/// - all monthly volumes non-negative
/// - imaging codes carry orders/reads only, other codes performs only
pub async fn create_valuation(
    repo: &dyn FullRepository,
    valuation: &Valuation,
) -> RepositoryResult<ValuationId> {
    if valuation.activities.is_empty() {
        return Err(RepositoryError::validation(
            "Valuation must contain at least one activity",
        ));
    }

    for activity in &valuation.activities {
        if activity.monthly_orders < 0
            || activity.monthly_reads < 0
            || activity.monthly_performs < 0
        {
            return Err(RepositoryError::validation(format!(
                "Monthly volumes for CPT {} must be non-negative",
                activity.cpt_code
            )));
        }
        let cpt = repo.get_cpt_code(&activity.cpt_code).await.map_err(|e| {
            RepositoryError::validation(format!(
                "Activity references unknown CPT code {}: {}",
                activity.cpt_code, e
            ))
        })?;
        if cpt.procedure_type.is_imaging() && activity.monthly_performs != 0 {
            return Err(RepositoryError::validation(format!(
                "Imaging CPT {} is measured by orders/reads, not performs",
                activity.cpt_code
            )));
        }
        if !cpt.procedure_type.is_imaging()
            && (activity.monthly_orders != 0 || activity.monthly_reads != 0)
        {
            return Err(RepositoryError::validation(format!(
                "Non-imaging CPT {} is measured by performs only",
                activity.cpt_code
            )));
        }
    }

    let id = repo.store_valuation(valuation).await?;
    info!(
        "Stored valuation {} with {} activities",
        id,
        valuation.activities.len()
    );
    Ok(id)
}

pub async fn get_valuation(
    repo: &dyn FullRepository,
    id: ValuationId,
) -> RepositoryResult<Valuation> {
    repo.get_valuation(id).await
}

pub async fn list_valuations_for_owner(
    repo: &dyn FullRepository,
    owner: &ValuationOwner,
) -> RepositoryResult<Vec<Valuation>> {
    repo.list_valuations_for_owner(owner).await
}

/// Delete a valuation; its activity rows go with it.
pub async fn delete_valuation(
    repo: &dyn FullRepository,
    id: ValuationId,
) -> RepositoryResult<usize> {
    let deleted = repo.delete_valuation(id).await?;
    if deleted > 0 {
        info!("Deleted valuation {}", id);
    }
    Ok(deleted)
}

// ==================== Scenarios ====================

/// Store a new scenario after validating the payer mix and procedures.
pub async fn create_scenario(
    repo: &dyn FullRepository,
    scenario: &Scenario,
) -> RepositoryResult<ScenarioId> {
    scenario
        .payer_mix
        .validate()
        .map_err(RepositoryError::validation)?;
    if scenario.procedures.is_empty() {
        return Err(RepositoryError::validation(
            "Scenario must contain at least one procedure",
        ));
    }
    for procedure in &scenario.procedures {
        if procedure.quantity < 0 {
            return Err(RepositoryError::validation(format!(
                "Quantity for CPT {} must be non-negative",
                procedure.cpt_code
            )));
        }
    }

    let id = repo.store_scenario(scenario).await?;
    info!(
        "Stored scenario {} with {} procedures",
        id,
        scenario.procedures.len()
    );
    Ok(id)
}

pub async fn get_scenario(
    repo: &dyn FullRepository,
    id: ScenarioId,
) -> RepositoryResult<Scenario> {
    repo.get_scenario(id).await
}

pub async fn list_scenarios(repo: &dyn FullRepository) -> RepositoryResult<Vec<Scenario>> {
    repo.list_scenarios().await
}

pub async fn delete_scenario(
    repo: &dyn FullRepository,
    id: ScenarioId,
) -> RepositoryResult<usize> {
    let deleted = repo.delete_scenario(id).await?;
    if deleted > 0 {
        info!("Deleted scenario {}", id);
    }
    Ok(deleted)
}
