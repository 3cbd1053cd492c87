//! Public API surface for the Rust backend.
//!
//! This file consolidates the identifier newtypes and the calculation
//! result types exposed over the HTTP API. All types derive
//! Serialize/Deserialize for JSON serialization.

pub use crate::models::catalog::{
    CptCode, Institution, PayerMultiplier, PayerType, ProcedureType, Provider, ProviderType, Rate,
    RateComponent, RateTable, Site, SiteType,
};
pub use crate::models::scenario::{PayerMix, RateMode, Scenario, ScenarioProcedure};
pub use crate::models::valuation::{Valuation, ValuationActivity, ValuationOwner};

pub use crate::services::scenario::{ScenarioComparison, ScenarioLine};
pub use crate::services::valuation::{ActivityBreakdown, ValuationSummary};

use serde::{Deserialize, Serialize};

/// Institution identifier (database primary key).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstitutionId(pub i64);

/// Provider identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProviderId(pub i64);

/// Billing site identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteId(pub i64);

/// Rate row identifier (surrogate key; the logical key is the
/// CPT/payer/site-type/component tuple).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RateId(pub i64);

/// Valuation identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValuationId(pub i64);

/// Scenario identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioId(pub i64);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            pub fn new(value: i64) -> Self {
                $name(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

impl_id!(InstitutionId);
impl_id!(ProviderId);
impl_id!(SiteId);
impl_id!(RateId);
impl_id!(ValuationId);
impl_id!(ScenarioId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = ValuationId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(format!("{}", id), "42");
    }

    #[test]
    fn test_id_serialization() {
        let id = ProviderId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: ProviderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
