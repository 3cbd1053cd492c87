//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory using HashMap structures, providing fast, deterministic, and
//! isolated execution. Referential integrity is enforced the same way the
//! Postgres schema does: inserts require their referenced rows, deletes are
//! rejected while dependents exist, and valuation/scenario deletes cascade
//! to their child rows.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::api::{InstitutionId, ProviderId, RateId, ScenarioId, SiteId, ValuationId};
use crate::db::repository::{
    CatalogRepository, RepositoryError, RepositoryResult, ScenarioRepository, ValuationRepository,
};
use crate::models::catalog::{
    CptCode, Institution, PayerMultiplier, PayerType, Provider, Rate, Site,
};
use crate::models::scenario::Scenario;
use crate::models::valuation::{Valuation, ValuationOwner};

/// In-memory local repository.
///
/// This implementation stores all data in memory using HashMaps, making it
/// ideal for unit tests and local development that need isolation and speed.
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    cpt_codes: HashMap<String, CptCode>,
    institutions: HashMap<InstitutionId, Institution>,
    providers: HashMap<ProviderId, Provider>,
    sites: HashMap<SiteId, Site>,
    rates: HashMap<RateId, Rate>,
    multipliers: HashMap<PayerType, PayerMultiplier>,
    valuations: HashMap<ValuationId, Valuation>,
    scenarios: HashMap<ScenarioId, Scenario>,

    // ID counters
    next_institution_id: i64,
    next_provider_id: i64,
    next_site_id: i64,
    next_rate_id: i64,
    next_valuation_id: i64,
    next_scenario_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            cpt_codes: HashMap::new(),
            institutions: HashMap::new(),
            providers: HashMap::new(),
            sites: HashMap::new(),
            rates: HashMap::new(),
            multipliers: HashMap::new(),
            valuations: HashMap::new(),
            scenarios: HashMap::new(),
            next_institution_id: 1,
            next_provider_id: 1,
            next_site_id: 1,
            next_rate_id: 1,
            next_valuation_id: 1,
            next_scenario_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        let mut data = self.data.write().unwrap();
        data.is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write().unwrap();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of valuations stored.
    pub fn valuation_count(&self) -> usize {
        self.data.read().unwrap().valuations.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        let data = self.data.read().unwrap();
        if !data.is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().unwrap().is_healthy)
    }

    async fn list_cpt_codes(&self) -> RepositoryResult<Vec<CptCode>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut codes: Vec<CptCode> = data.cpt_codes.values().cloned().collect();
        codes.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(codes)
    }

    async fn get_cpt_code(&self, code: &str) -> RepositoryResult<CptCode> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.cpt_codes
            .get(code)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("CPT code {} not found", code)))
    }

    async fn upsert_cpt_code(&self, cpt: &CptCode) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        data.cpt_codes.insert(cpt.code.clone(), cpt.clone());
        Ok(())
    }

    async fn delete_cpt_code(&self, code: &str) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.rates.values().any(|r| r.cpt_code == code) {
            return Err(RepositoryError::validation(format!(
                "CPT code {} is referenced by rates",
                code
            )));
        }
        if data
            .valuations
            .values()
            .any(|v| v.activities.iter().any(|a| a.cpt_code == code))
        {
            return Err(RepositoryError::validation(format!(
                "CPT code {} is referenced by valuation activities",
                code
            )));
        }
        if data
            .scenarios
            .values()
            .any(|s| s.procedures.iter().any(|p| p.cpt_code == code))
        {
            return Err(RepositoryError::validation(format!(
                "CPT code {} is referenced by scenario procedures",
                code
            )));
        }
        Ok(data.cpt_codes.remove(code).map(|_| 1).unwrap_or(0))
    }

    async fn list_institutions(&self) -> RepositoryResult<Vec<Institution>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut institutions: Vec<Institution> = data.institutions.values().cloned().collect();
        institutions.sort_by_key(|i| i.id);
        Ok(institutions)
    }

    async fn get_institution(&self, id: InstitutionId) -> RepositoryResult<Institution> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.institutions
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Institution {} not found", id)))
    }

    async fn store_institution(
        &self,
        institution: &Institution,
    ) -> RepositoryResult<InstitutionId> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let id = match institution.id {
            Some(id) => {
                if !data.institutions.contains_key(&id) {
                    return Err(RepositoryError::not_found(format!(
                        "Institution {} not found",
                        id
                    )));
                }
                id
            }
            None => {
                let id = InstitutionId::new(data.next_institution_id);
                data.next_institution_id += 1;
                id
            }
        };
        let mut stored = institution.clone();
        stored.id = Some(id);
        data.institutions.insert(id, stored);
        Ok(id)
    }

    async fn delete_institution(&self, id: InstitutionId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.providers.values().any(|p| p.home_institution_id == id) {
            return Err(RepositoryError::validation(format!(
                "Institution {} is referenced by providers",
                id
            )));
        }
        if data.sites.values().any(|s| s.institution_id == id) {
            return Err(RepositoryError::validation(format!(
                "Institution {} is referenced by sites",
                id
            )));
        }
        Ok(data.institutions.remove(&id).map(|_| 1).unwrap_or(0))
    }

    async fn list_providers(&self) -> RepositoryResult<Vec<Provider>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut providers: Vec<Provider> = data.providers.values().cloned().collect();
        providers.sort_by_key(|p| p.id);
        Ok(providers)
    }

    async fn get_provider(&self, id: ProviderId) -> RepositoryResult<Provider> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.providers
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Provider {} not found", id)))
    }

    async fn store_provider(&self, provider: &Provider) -> RepositoryResult<ProviderId> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if !data
            .institutions
            .contains_key(&provider.home_institution_id)
        {
            return Err(RepositoryError::validation(format!(
                "Home institution {} does not exist",
                provider.home_institution_id
            )));
        }
        let id = match provider.id {
            Some(id) => {
                if !data.providers.contains_key(&id) {
                    return Err(RepositoryError::not_found(format!(
                        "Provider {} not found",
                        id
                    )));
                }
                id
            }
            None => {
                let id = ProviderId::new(data.next_provider_id);
                data.next_provider_id += 1;
                id
            }
        };
        let mut stored = provider.clone();
        stored.id = Some(id);
        data.providers.insert(id, stored);
        Ok(id)
    }

    async fn delete_provider(&self, id: ProviderId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.valuations.values().any(|v| v.provider_id == id) {
            return Err(RepositoryError::validation(format!(
                "Provider {} is referenced by valuations",
                id
            )));
        }
        Ok(data.providers.remove(&id).map(|_| 1).unwrap_or(0))
    }

    async fn list_sites(&self) -> RepositoryResult<Vec<Site>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut sites: Vec<Site> = data.sites.values().cloned().collect();
        sites.sort_by_key(|s| s.id);
        Ok(sites)
    }

    async fn get_site(&self, id: SiteId) -> RepositoryResult<Site> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.sites
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Site {} not found", id)))
    }

    async fn store_site(&self, site: &Site) -> RepositoryResult<SiteId> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if !data.institutions.contains_key(&site.institution_id) {
            return Err(RepositoryError::validation(format!(
                "Institution {} does not exist",
                site.institution_id
            )));
        }
        let id = match site.id {
            Some(id) => {
                if !data.sites.contains_key(&id) {
                    return Err(RepositoryError::not_found(format!("Site {} not found", id)));
                }
                id
            }
            None => {
                let id = SiteId::new(data.next_site_id);
                data.next_site_id += 1;
                id
            }
        };
        let mut stored = site.clone();
        stored.id = Some(id);
        data.sites.insert(id, stored);
        Ok(id)
    }

    async fn delete_site(&self, id: SiteId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.valuations.values().any(|v| v.site_id == Some(id)) {
            return Err(RepositoryError::validation(format!(
                "Site {} is referenced by valuations",
                id
            )));
        }
        Ok(data.sites.remove(&id).map(|_| 1).unwrap_or(0))
    }

    async fn list_rates(&self, cpt_code: Option<&str>) -> RepositoryResult<Vec<Rate>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut rates: Vec<Rate> = data
            .rates
            .values()
            .filter(|r| cpt_code.map_or(true, |code| r.cpt_code == code))
            .cloned()
            .collect();
        rates.sort_by_key(|r| r.id);
        Ok(rates)
    }

    async fn fetch_rates_for_cpt_codes(&self, codes: &[String]) -> RepositoryResult<Vec<Rate>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        Ok(data
            .rates
            .values()
            .filter(|r| codes.contains(&r.cpt_code))
            .cloned()
            .collect())
    }

    async fn upsert_rate(&self, rate: &Rate) -> RepositoryResult<RateId> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if !data.cpt_codes.contains_key(&rate.cpt_code) {
            return Err(RepositoryError::validation(format!(
                "CPT code {} does not exist",
                rate.cpt_code
            )));
        }
        // Upsert on the logical key tuple
        let existing = data
            .rates
            .values()
            .find(|r| {
                r.cpt_code == rate.cpt_code
                    && r.payer_type == rate.payer_type
                    && r.site_type == rate.site_type
                    && r.component == rate.component
            })
            .and_then(|r| r.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = RateId::new(data.next_rate_id);
                data.next_rate_id += 1;
                id
            }
        };
        let mut stored = rate.clone();
        stored.id = Some(id);
        data.rates.insert(id, stored);
        Ok(id)
    }

    async fn delete_rate(&self, id: RateId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        Ok(data.rates.remove(&id).map(|_| 1).unwrap_or(0))
    }

    async fn list_payer_multipliers(&self) -> RepositoryResult<Vec<PayerMultiplier>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut multipliers: Vec<PayerMultiplier> = data.multipliers.values().cloned().collect();
        multipliers.sort_by_key(|m| m.payer_type.as_str());
        Ok(multipliers)
    }

    async fn get_payer_multiplier(&self, payer: PayerType) -> RepositoryResult<PayerMultiplier> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.multipliers.get(&payer).cloned().ok_or_else(|| {
            RepositoryError::not_found(format!("No multiplier for payer {}", payer.as_str()))
        })
    }

    async fn upsert_payer_multiplier(
        &self,
        multiplier: &PayerMultiplier,
    ) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        data.multipliers
            .insert(multiplier.payer_type, multiplier.clone());
        Ok(())
    }
}

#[async_trait]
impl ValuationRepository for LocalRepository {
    async fn store_valuation(&self, valuation: &Valuation) -> RepositoryResult<ValuationId> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if !data.providers.contains_key(&valuation.provider_id) {
            return Err(RepositoryError::validation(format!(
                "Provider {} does not exist",
                valuation.provider_id
            )));
        }
        if let Some(site_id) = valuation.site_id {
            if !data.sites.contains_key(&site_id) {
                return Err(RepositoryError::validation(format!(
                    "Site {} does not exist",
                    site_id
                )));
            }
        }
        for activity in &valuation.activities {
            if !data.cpt_codes.contains_key(&activity.cpt_code) {
                return Err(RepositoryError::validation(format!(
                    "CPT code {} does not exist",
                    activity.cpt_code
                )));
            }
        }

        let id = ValuationId::new(data.next_valuation_id);
        data.next_valuation_id += 1;
        let mut stored = valuation.clone();
        stored.id = Some(id);
        data.valuations.insert(id, stored);
        Ok(id)
    }

    async fn get_valuation(&self, id: ValuationId) -> RepositoryResult<Valuation> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.valuations
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Valuation {} not found", id)))
    }

    async fn list_valuations_for_owner(
        &self,
        owner: &ValuationOwner,
    ) -> RepositoryResult<Vec<Valuation>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut valuations: Vec<Valuation> = data
            .valuations
            .values()
            .filter(|v| &v.owner == owner)
            .cloned()
            .collect();
        valuations.sort_by_key(|v| v.id);
        Ok(valuations)
    }

    async fn delete_valuation(&self, id: ValuationId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        // Activities are stored inside the aggregate, so removing the
        // valuation removes them with it.
        Ok(data.valuations.remove(&id).map(|_| 1).unwrap_or(0))
    }
}

#[async_trait]
impl ScenarioRepository for LocalRepository {
    async fn store_scenario(&self, scenario: &Scenario) -> RepositoryResult<ScenarioId> {
        self.check_health()?;
        scenario
            .payer_mix
            .validate()
            .map_err(RepositoryError::validation)?;
        let mut data = self.data.write().unwrap();
        for procedure in &scenario.procedures {
            if !data.cpt_codes.contains_key(&procedure.cpt_code) {
                return Err(RepositoryError::validation(format!(
                    "CPT code {} does not exist",
                    procedure.cpt_code
                )));
            }
        }

        let id = ScenarioId::new(data.next_scenario_id);
        data.next_scenario_id += 1;
        let mut stored = scenario.clone();
        stored.id = Some(id);
        data.scenarios.insert(id, stored);
        Ok(id)
    }

    async fn get_scenario(&self, id: ScenarioId) -> RepositoryResult<Scenario> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.scenarios
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Scenario {} not found", id)))
    }

    async fn list_scenarios(&self) -> RepositoryResult<Vec<Scenario>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut scenarios: Vec<Scenario> = data.scenarios.values().cloned().collect();
        scenarios.sort_by_key(|s| s.id);
        Ok(scenarios)
    }

    async fn delete_scenario(&self, id: ScenarioId) -> RepositoryResult<usize> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        Ok(data.scenarios.remove(&id).map(|_| 1).unwrap_or(0))
    }
}
