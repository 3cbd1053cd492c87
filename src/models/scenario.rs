//! Scenario aggregate: payer-mix based FPA vs. Article 28 comparison input.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::ScenarioId;
use crate::models::catalog::{PayerType, SiteType};

/// How technical rates are resolved during scenario calculation.
///
/// Manual mode uses stored rates for every payer. Calculated mode keeps
/// Medicare technical as ground truth and derives Commercial/Medicaid
/// technical through the payer multipliers; professional and global rates
/// always come from storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateMode {
    Manual,
    Calculated,
}

impl RateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateMode::Manual => "manual",
            RateMode::Calculated => "calculated",
        }
    }
}

impl FromStr for RateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "calculated" => Ok(Self::Calculated),
            _ => Err(format!("Unknown rate mode: {}", s)),
        }
    }
}

/// Percentage split of patient volume across the three payers.
///
/// Must total exactly 100; enforced at scenario creation, before any
/// calculation runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerMix {
    pub medicare_pct: i32,
    pub commercial_pct: i32,
    pub medicaid_pct: i32,
}

impl PayerMix {
    pub fn new(medicare_pct: i32, commercial_pct: i32, medicaid_pct: i32) -> Self {
        Self {
            medicare_pct,
            commercial_pct,
            medicaid_pct,
        }
    }

    /// Validate that the mix is non-negative and totals exactly 100.
    pub fn validate(&self) -> Result<(), String> {
        if self.medicare_pct < 0 || self.commercial_pct < 0 || self.medicaid_pct < 0 {
            return Err("Payer mix percentages must be non-negative".to_string());
        }
        let total = self.medicare_pct + self.commercial_pct + self.medicaid_pct;
        if total != 100 {
            return Err(format!("Payer mix must total 100, got {}", total));
        }
        Ok(())
    }

    pub fn percent(&self, payer: PayerType) -> i32 {
        match payer {
            PayerType::Medicare => self.medicare_pct,
            PayerType::Commercial => self.commercial_pct,
            PayerType::Medicaid => self.medicaid_pct,
        }
    }

    /// Weight of a payer as a decimal fraction (40 -> 0.40).
    pub fn weight(&self, payer: PayerType) -> Decimal {
        Decimal::new(self.percent(payer) as i64, 2)
    }
}

/// One CPT line in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioProcedure {
    pub cpt_code: String,
    pub quantity: i32,
}

/// A what-if comparison of FPA vs. Article 28 reimbursement for a payer mix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: Option<ScenarioId>,
    pub provider_name: String,
    pub monthly_patients: i32,
    pub payer_mix: PayerMix,
    /// The site type the scenario author currently operates under; the
    /// calculation always produces both sides of the comparison
    pub site_type: SiteType,
    pub rate_mode: RateMode,
    pub created_at: DateTime<Utc>,
    pub procedures: Vec<ScenarioProcedure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payer_mix_valid() {
        assert!(PayerMix::new(40, 40, 20).validate().is_ok());
        assert!(PayerMix::new(100, 0, 0).validate().is_ok());
    }

    #[test]
    fn test_payer_mix_rejects_off_by_one() {
        assert!(PayerMix::new(40, 40, 19).validate().is_err());
        assert!(PayerMix::new(40, 40, 21).validate().is_err());
    }

    #[test]
    fn test_payer_mix_rejects_negative() {
        assert!(PayerMix::new(120, -40, 20).validate().is_err());
    }

    #[test]
    fn test_payer_mix_weights() {
        let mix = PayerMix::new(40, 40, 20);
        assert_eq!(mix.weight(PayerType::Medicare), dec!(0.40));
        assert_eq!(mix.weight(PayerType::Commercial), dec!(0.40));
        assert_eq!(mix.weight(PayerType::Medicaid), dec!(0.20));
    }
}
