//! Valuation aggregate: a provider's monthly procedure volumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ProviderId, SiteId, ValuationId};

/// Who owns a valuation.
///
/// Guest-owned valuations live only as long as their session token survives
/// the TTL sweep; user-owned valuations persist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ValuationOwner {
    User(String),
    Guest(String),
}

impl ValuationOwner {
    pub fn is_guest(&self) -> bool {
        matches!(self, ValuationOwner::Guest(_))
    }
}

/// Monthly volumes for one CPT code inside a valuation.
///
/// For imaging codes only orders/reads are meaningful; for procedure and
/// visit codes only performs is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationActivity {
    pub cpt_code: String,
    pub monthly_orders: i32,
    pub monthly_reads: i32,
    pub monthly_performs: i32,
}

/// A provider's monthly activity profile, owned by a user or guest session.
///
/// Activities are stored as part of the aggregate; deleting the valuation
/// deletes them with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valuation {
    pub id: Option<ValuationId>,
    pub provider_id: ProviderId,
    /// Site where the activity happens; `None` models a freestanding office
    /// context at the provider's home institution
    pub site_id: Option<SiteId>,
    pub monthly_patients: i32,
    pub owner: ValuationOwner,
    pub created_at: DateTime<Utc>,
    pub activities: Vec<ValuationActivity>,
}
