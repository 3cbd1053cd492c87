//! Domain model types.
//!
//! Entities are grouped by lifecycle: `catalog` holds admin-managed
//! reference data (CPT codes, rates, providers, institutions, sites),
//! `valuation` and `scenario` hold the user-owned aggregates consumed by
//! the calculation engines.

pub mod catalog;
pub mod scenario;
pub mod valuation;

pub use catalog::{
    CptCode, Institution, PayerMultiplier, PayerType, ProcedureType, Provider, ProviderType, Rate,
    RateComponent, RateTable, Site, SiteType,
};
pub use scenario::{PayerMix, RateMode, Scenario, ScenarioProcedure};
pub use valuation::{Valuation, ValuationActivity, ValuationOwner};
