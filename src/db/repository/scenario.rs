//! Scenario repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::ScenarioId;
use crate::models::scenario::Scenario;

/// Repository trait for scenario aggregates.
///
/// A scenario is stored together with its procedure lines; deleting the
/// scenario removes the lines with it.
#[async_trait]
pub trait ScenarioRepository: Send + Sync {
    /// Store a new scenario with its procedures, returning the assigned id.
    /// The payer mix must already be validated; referenced CPT codes must
    /// exist.
    async fn store_scenario(&self, scenario: &Scenario) -> RepositoryResult<ScenarioId>;

    /// Fetch a scenario including its procedures.
    async fn get_scenario(&self, id: ScenarioId) -> RepositoryResult<Scenario>;

    async fn list_scenarios(&self) -> RepositoryResult<Vec<Scenario>>;

    /// Delete a scenario and, cascading, all of its procedure lines.
    async fn delete_scenario(&self, id: ScenarioId) -> RepositoryResult<usize>;
}
