//! Valuation repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::ValuationId;
use crate::models::valuation::{Valuation, ValuationOwner};

/// Repository trait for valuation aggregates.
///
/// A valuation is stored together with its activity rows; deleting the
/// valuation removes the activities with it (no orphans).
#[async_trait]
pub trait ValuationRepository: Send + Sync {
    /// Store a new valuation with its activities, returning the assigned id.
    /// Referenced provider, site and CPT codes must exist.
    async fn store_valuation(&self, valuation: &Valuation) -> RepositoryResult<ValuationId>;

    /// Fetch a valuation including its activities.
    async fn get_valuation(&self, id: ValuationId) -> RepositoryResult<Valuation>;

    /// List valuations belonging to an owner (user id or guest session).
    async fn list_valuations_for_owner(
        &self,
        owner: &ValuationOwner,
    ) -> RepositoryResult<Vec<Valuation>>;

    /// Delete a valuation and, cascading, all of its activity rows.
    /// Returns the number of valuations removed (0 when absent).
    async fn delete_valuation(&self, id: ValuationId) -> RepositoryResult<usize>;
}
