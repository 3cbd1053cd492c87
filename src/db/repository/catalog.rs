//! Catalog repository trait for reference-data CRUD.
//!
//! Covers CPT codes, institutions, providers, sites, rates and payer
//! multipliers. Implementations enforce referential integrity: a provider
//! must reference an existing institution, a site an existing institution,
//! a rate an existing CPT code, and deletes are rejected while dependent
//! rows exist.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{InstitutionId, ProviderId, RateId, SiteId};
use crate::models::catalog::{
    CptCode, Institution, PayerMultiplier, PayerType, Provider, Rate, Site,
};

/// Repository trait for catalog (reference data) operations.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Check if the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== CPT Codes ====================

    async fn list_cpt_codes(&self) -> RepositoryResult<Vec<CptCode>>;

    /// Fetch a single CPT code by its code string.
    async fn get_cpt_code(&self, code: &str) -> RepositoryResult<CptCode>;

    /// Insert or replace a CPT code (the code string is the key).
    async fn upsert_cpt_code(&self, cpt: &CptCode) -> RepositoryResult<()>;

    /// Delete a CPT code. Fails while rates, valuation activities or
    /// scenario procedures still reference it.
    async fn delete_cpt_code(&self, code: &str) -> RepositoryResult<usize>;

    // ==================== Institutions ====================

    async fn list_institutions(&self) -> RepositoryResult<Vec<Institution>>;

    async fn get_institution(&self, id: InstitutionId) -> RepositoryResult<Institution>;

    /// Insert (id unset) or update (id set) an institution, returning its id.
    async fn store_institution(&self, institution: &Institution)
        -> RepositoryResult<InstitutionId>;

    /// Delete an institution. Fails while providers or sites reference it.
    async fn delete_institution(&self, id: InstitutionId) -> RepositoryResult<usize>;

    // ==================== Providers ====================

    async fn list_providers(&self) -> RepositoryResult<Vec<Provider>>;

    async fn get_provider(&self, id: ProviderId) -> RepositoryResult<Provider>;

    /// Insert or update a provider, returning its id. The home institution
    /// must exist.
    async fn store_provider(&self, provider: &Provider) -> RepositoryResult<ProviderId>;

    async fn delete_provider(&self, id: ProviderId) -> RepositoryResult<usize>;

    // ==================== Sites ====================

    async fn list_sites(&self) -> RepositoryResult<Vec<Site>>;

    async fn get_site(&self, id: SiteId) -> RepositoryResult<Site>;

    /// Insert or update a site, returning its id. The owning institution
    /// must exist.
    async fn store_site(&self, site: &Site) -> RepositoryResult<SiteId>;

    async fn delete_site(&self, id: SiteId) -> RepositoryResult<usize>;

    // ==================== Rates ====================

    /// List rates, optionally filtered to one CPT code.
    async fn list_rates(&self, cpt_code: Option<&str>) -> RepositoryResult<Vec<Rate>>;

    /// Fetch all rate rows for a set of CPT codes (one round trip per
    /// calculation request).
    async fn fetch_rates_for_cpt_codes(&self, codes: &[String]) -> RepositoryResult<Vec<Rate>>;

    /// Insert or update the rate identified by its logical key
    /// (cpt_code, payer_type, site_type, component), returning the row id.
    /// The CPT code must exist.
    async fn upsert_rate(&self, rate: &Rate) -> RepositoryResult<RateId>;

    async fn delete_rate(&self, id: RateId) -> RepositoryResult<usize>;

    // ==================== Payer Multipliers ====================

    async fn list_payer_multipliers(&self) -> RepositoryResult<Vec<PayerMultiplier>>;

    async fn get_payer_multiplier(&self, payer: PayerType) -> RepositoryResult<PayerMultiplier>;

    /// Insert or update the multiplier row for a payer type.
    async fn upsert_payer_multiplier(&self, multiplier: &PayerMultiplier)
        -> RepositoryResult<()>;
}
