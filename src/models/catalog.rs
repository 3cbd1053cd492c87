//! Catalog entities: CPT codes, payers, rates, providers, institutions, sites.
//!
//! These are the reference-data entities managed through admin CRUD. The
//! valuation and scenario engines consume them read-only.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::{InstitutionId, ProviderId, RateId, SiteId};

/// How a CPT code's monthly volume is measured.
///
/// Imaging codes are measured by reads (interpretations) with orders tracked
/// separately; procedure and visit codes are measured by performs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureType {
    Imaging,
    Procedure,
    Visit,
}

impl ProcedureType {
    pub fn is_imaging(&self) -> bool {
        matches!(self, ProcedureType::Imaging)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureType::Imaging => "imaging",
            ProcedureType::Procedure => "procedure",
            ProcedureType::Visit => "visit",
        }
    }
}

impl FromStr for ProcedureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "imaging" => Ok(Self::Imaging),
            "procedure" => Ok(Self::Procedure),
            "visit" => Ok(Self::Visit),
            _ => Err(format!("Unknown procedure type: {}", s)),
        }
    }
}

/// Provider classification driving the revenue attribution policy.
///
/// - `Type1`: home-institution provider practicing at their own site; earns
///   and is attributed every revenue component at the home institution.
/// - `Type2`: visiting provider; professional revenue books to the home
///   institution, technical revenue to the hosting facility.
/// - `Type3`: referring/ordering-only provider; generates technical revenue
///   for the hosting facility but earns no professional revenue or RVUs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Type1,
    Type2,
    Type3,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Type1 => "type1",
            ProviderType::Type2 => "type2",
            ProviderType::Type3 => "type3",
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "type1" => Ok(Self::Type1),
            "type2" => Ok(Self::Type2),
            "type3" => Ok(Self::Type3),
            _ => Err(format!("Unknown provider type: {}", s)),
        }
    }
}

/// Billing site classification.
///
/// FPA (Freestanding Office) sites are paid a single blended Global rate;
/// Article 28 (Hospital Outpatient) sites split payment into Professional
/// and Technical components.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    Fpa,
    Article28,
}

impl SiteType {
    /// The rate components payable at this site type.
    pub fn components(&self) -> &'static [RateComponent] {
        match self {
            SiteType::Fpa => &[RateComponent::Global],
            SiteType::Article28 => &[RateComponent::Professional, RateComponent::Technical],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Fpa => "fpa",
            SiteType::Article28 => "article28",
        }
    }
}

impl FromStr for SiteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fpa" => Ok(Self::Fpa),
            "article28" => Ok(Self::Article28),
            _ => Err(format!("Unknown site type: {}", s)),
        }
    }
}

/// Payer classification for rate lookup and payer-mix weighting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayerType {
    Medicare,
    Commercial,
    Medicaid,
}

impl PayerType {
    /// All payer types, in payer-mix order.
    pub const ALL: [PayerType; 3] = [
        PayerType::Medicare,
        PayerType::Commercial,
        PayerType::Medicaid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PayerType::Medicare => "medicare",
            PayerType::Commercial => "commercial",
            PayerType::Medicaid => "medicaid",
        }
    }
}

impl FromStr for PayerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "medicare" => Ok(Self::Medicare),
            "commercial" => Ok(Self::Commercial),
            "medicaid" => Ok(Self::Medicaid),
            _ => Err(format!("Unknown payer type: {}", s)),
        }
    }
}

/// Payment component of a rate row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateComponent {
    Professional,
    Technical,
    Global,
}

impl RateComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateComponent::Professional => "professional",
            RateComponent::Technical => "technical",
            RateComponent::Global => "global",
        }
    }
}

impl FromStr for RateComponent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "professional" => Ok(Self::Professional),
            "technical" => Ok(Self::Technical),
            "global" => Ok(Self::Global),
            _ => Err(format!("Unknown rate component: {}", s)),
        }
    }
}

/// A CPT procedure code with its work RVU weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CptCode {
    /// CPT code string, e.g. "99213" (primary key)
    pub code: String,
    /// Human-readable description
    pub description: String,
    /// Work RVUs earned per unit of service; `None` is treated as zero
    pub work_rvu: Option<Decimal>,
    /// Measurement category for monthly volumes
    pub procedure_type: ProcedureType,
}

/// A billing institution (hospital system or practice group).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: Option<InstitutionId>,
    pub name: String,
    /// Inactive institutions stay referenceable but are hidden from pickers
    pub active: bool,
}

/// A provider with a home institution and an attribution classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Option<ProviderId>,
    pub name: String,
    pub provider_type: ProviderType,
    pub home_institution_id: InstitutionId,
}

/// A physical billing site belonging to an institution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: Option<SiteId>,
    pub name: String,
    pub site_type: SiteType,
    pub institution_id: InstitutionId,
}

/// A reimbursement rate row.
///
/// Logical key: (cpt_code, payer_type, site_type, component). At most one
/// rate exists per key; writes are upserts on that tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rate {
    pub id: Option<RateId>,
    pub cpt_code: String,
    pub payer_type: PayerType,
    pub site_type: SiteType,
    pub component: RateComponent,
    /// Monetary value in integer cents
    pub amount_cents: i64,
}

impl Rate {
    /// The rate as a decimal dollar amount.
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.amount_cents, 2)
    }
}

/// Per-payer rate multipliers, ratios where 100 = 1.00x.
///
/// Only the technical ratio participates in calculated rate mode (deriving
/// Commercial/Medicaid technical rates from the Medicare technical rate);
/// the professional and global ratios are stored for completeness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayerMultiplier {
    pub payer_type: PayerType,
    pub professional_ratio: i32,
    pub technical_ratio: i32,
    pub global_ratio: i32,
}

impl PayerMultiplier {
    /// Identity multiplier (1.00x on every component).
    pub fn identity(payer_type: PayerType) -> Self {
        Self {
            payer_type,
            professional_ratio: 100,
            technical_ratio: 100,
            global_ratio: 100,
        }
    }

    /// Technical ratio as a decimal factor (100 -> 1.00).
    pub fn technical_factor(&self) -> Decimal {
        Decimal::new(self.technical_ratio as i64, 2)
    }
}

/// Read-only lookup view over a set of rate rows, keyed by the logical
/// rate tuple. Built once per calculation request.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<(String, PayerType, SiteType, RateComponent), i64>,
}

impl RateTable {
    pub fn from_rates(rates: &[Rate]) -> Self {
        let mut table = HashMap::with_capacity(rates.len());
        for rate in rates {
            table.insert(
                (
                    rate.cpt_code.clone(),
                    rate.payer_type,
                    rate.site_type,
                    rate.component,
                ),
                rate.amount_cents,
            );
        }
        Self { rates: table }
    }

    /// Look up a rate as a decimal dollar amount. `None` when no row matches.
    pub fn lookup(
        &self,
        cpt_code: &str,
        payer: PayerType,
        site_type: SiteType,
        component: RateComponent,
    ) -> Option<Decimal> {
        self.rates
            .get(&(cpt_code.to_string(), payer, site_type, component))
            .map(|cents| Decimal::new(*cents, 2))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
