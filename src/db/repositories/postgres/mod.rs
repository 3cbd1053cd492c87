//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres database.
//! Referential integrity lives in the schema: foreign keys restrict catalog
//! deletes while dependents exist, and valuation/scenario child rows are
//! declared `ON DELETE CASCADE` so aggregate deletes never leave orphans.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{InstitutionId, ProviderId, RateId, ScenarioId, SiteId, ValuationId};
use crate::db::repository::{
    CatalogRepository, ErrorContext, RepositoryError, RepositoryResult, ScenarioRepository,
    ValuationRepository,
};
use crate::models::catalog::{
    CptCode, Institution, PayerMultiplier, PayerType, Provider, Rate, Site,
};
use crate::models::scenario::{Scenario, ScenarioProcedure};
use crate::models::valuation::{Valuation, ValuationActivity, ValuationOwner};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
}

/// Diesel-backed repository for Postgres.
///
/// This repository implementation provides:
/// - Connection pooling with configurable limits
/// - Health monitoring and statistics
/// - Automatic schema migrations
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Arguments
    /// * `config` - Database configuration
    ///
    /// # Returns
    /// * `Ok(PostgresRepository)` on success
    /// * `Err(RepositoryError)` if connection or migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        Ok(())
    }

    /// Current pool and query statistics.
    pub fn pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
        }
    }

    /// Run a blocking Diesel closure on a pooled connection.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || -> RepositoryResult<T> {
            let mut conn = pool.get().map_err(RepositoryError::from)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| RepositoryError::internal(format!("Task join error: {}", e)))?;

        self.total_queries.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }
        result.map_err(|e| e.with_operation(operation))
    }
}

fn load_activities(
    conn: &mut PgConnection,
    id: i64,
) -> RepositoryResult<Vec<ValuationActivity>> {
    let rows = valuation_activities::table
        .filter(valuation_activities::valuation_id.eq(id))
        .order(valuation_activities::activity_id.asc())
        .load::<ValuationActivityRow>(conn)
        .map_err(RepositoryError::from)?;
    Ok(rows.into_iter().map(ValuationActivity::from).collect())
}

fn load_procedures(
    conn: &mut PgConnection,
    id: i64,
) -> RepositoryResult<Vec<ScenarioProcedure>> {
    let rows = scenario_procedures::table
        .filter(scenario_procedures::scenario_id.eq(id))
        .order(scenario_procedures::procedure_id.asc())
        .load::<ScenarioProcedureRow>(conn)
        .map_err(RepositoryError::from)?;
    Ok(rows.into_iter().map(ScenarioProcedure::from).collect())
}

#[async_trait]
impl CatalogRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn| {
            Ok(sql_query("SELECT 1").execute(conn).is_ok())
        })
        .await
    }

    async fn list_cpt_codes(&self) -> RepositoryResult<Vec<CptCode>> {
        self.with_conn("list_cpt_codes", |conn| {
            let rows = cpt_codes::table
                .order(cpt_codes::code.asc())
                .load::<CptCodeRow>(conn)
                .map_err(RepositoryError::from)?;
            rows.into_iter().map(CptCode::try_from).collect()
        })
        .await
    }

    async fn get_cpt_code(&self, code: &str) -> RepositoryResult<CptCode> {
        let code = code.to_string();
        self.with_conn("get_cpt_code", move |conn| {
            let row = cpt_codes::table
                .find(&code)
                .first::<CptCodeRow>(conn)
                .optional()
                .map_err(RepositoryError::from)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("CPT code {} not found", code))
                })?;
            CptCode::try_from(row)
        })
        .await
    }

    async fn upsert_cpt_code(&self, cpt: &CptCode) -> RepositoryResult<()> {
        let row = CptCodeRow::from(cpt);
        self.with_conn("upsert_cpt_code", move |conn| {
            diesel::insert_into(cpt_codes::table)
                .values(&row)
                .on_conflict(cpt_codes::code)
                .do_update()
                .set((
                    cpt_codes::description.eq(excluded(cpt_codes::description)),
                    cpt_codes::work_rvu.eq(excluded(cpt_codes::work_rvu)),
                    cpt_codes::procedure_type.eq(excluded(cpt_codes::procedure_type)),
                ))
                .execute(conn)
                .map_err(RepositoryError::from)?;
            Ok(())
        })
        .await
    }

    async fn delete_cpt_code(&self, code: &str) -> RepositoryResult<usize> {
        let code = code.to_string();
        self.with_conn("delete_cpt_code", move |conn| {
            diesel::delete(cpt_codes::table.find(&code))
                .execute(conn)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn list_institutions(&self) -> RepositoryResult<Vec<Institution>> {
        self.with_conn("list_institutions", |conn| {
            let rows = institutions::table
                .order(institutions::institution_id.asc())
                .load::<InstitutionRow>(conn)
                .map_err(RepositoryError::from)?;
            Ok(rows.into_iter().map(Institution::from).collect())
        })
        .await
    }

    async fn get_institution(&self, id: InstitutionId) -> RepositoryResult<Institution> {
        self.with_conn("get_institution", move |conn| {
            let row = institutions::table
                .find(id.value())
                .first::<InstitutionRow>(conn)
                .optional()
                .map_err(RepositoryError::from)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Institution {} not found", id))
                })?;
            Ok(Institution::from(row))
        })
        .await
    }

    async fn store_institution(
        &self,
        institution: &Institution,
    ) -> RepositoryResult<InstitutionId> {
        let institution = institution.clone();
        self.with_conn("store_institution", move |conn| match institution.id {
            Some(id) => {
                let updated = diesel::update(institutions::table.find(id.value()))
                    .set((
                        institutions::name.eq(&institution.name),
                        institutions::active.eq(institution.active),
                    ))
                    .execute(conn)
                    .map_err(RepositoryError::from)?;
                if updated == 0 {
                    return Err(RepositoryError::not_found(format!(
                        "Institution {} not found",
                        id
                    )));
                }
                Ok(id)
            }
            None => {
                let new_row = NewInstitutionRow {
                    name: institution.name.clone(),
                    active: institution.active,
                };
                let id: i64 = diesel::insert_into(institutions::table)
                    .values(&new_row)
                    .returning(institutions::institution_id)
                    .get_result(conn)
                    .map_err(RepositoryError::from)?;
                Ok(InstitutionId::new(id))
            }
        })
        .await
    }

    async fn delete_institution(&self, id: InstitutionId) -> RepositoryResult<usize> {
        self.with_conn("delete_institution", move |conn| {
            diesel::delete(institutions::table.find(id.value()))
                .execute(conn)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn list_providers(&self) -> RepositoryResult<Vec<Provider>> {
        self.with_conn("list_providers", |conn| {
            let rows = providers::table
                .order(providers::provider_id.asc())
                .load::<ProviderRow>(conn)
                .map_err(RepositoryError::from)?;
            rows.into_iter().map(Provider::try_from).collect()
        })
        .await
    }

    async fn get_provider(&self, id: ProviderId) -> RepositoryResult<Provider> {
        self.with_conn("get_provider", move |conn| {
            let row = providers::table
                .find(id.value())
                .first::<ProviderRow>(conn)
                .optional()
                .map_err(RepositoryError::from)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Provider {} not found", id))
                })?;
            Provider::try_from(row)
        })
        .await
    }

    async fn store_provider(&self, provider: &Provider) -> RepositoryResult<ProviderId> {
        let provider = provider.clone();
        self.with_conn("store_provider", move |conn| match provider.id {
            Some(id) => {
                let updated = diesel::update(providers::table.find(id.value()))
                    .set((
                        providers::name.eq(&provider.name),
                        providers::provider_type.eq(provider.provider_type.as_str()),
                        providers::home_institution_id
                            .eq(provider.home_institution_id.value()),
                    ))
                    .execute(conn)
                    .map_err(RepositoryError::from)?;
                if updated == 0 {
                    return Err(RepositoryError::not_found(format!(
                        "Provider {} not found",
                        id
                    )));
                }
                Ok(id)
            }
            None => {
                let new_row = NewProviderRow::from(&provider);
                let id: i64 = diesel::insert_into(providers::table)
                    .values(&new_row)
                    .returning(providers::provider_id)
                    .get_result(conn)
                    .map_err(RepositoryError::from)?;
                Ok(ProviderId::new(id))
            }
        })
        .await
    }

    async fn delete_provider(&self, id: ProviderId) -> RepositoryResult<usize> {
        self.with_conn("delete_provider", move |conn| {
            diesel::delete(providers::table.find(id.value()))
                .execute(conn)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn list_sites(&self) -> RepositoryResult<Vec<Site>> {
        self.with_conn("list_sites", |conn| {
            let rows = sites::table
                .order(sites::site_id.asc())
                .load::<SiteRow>(conn)
                .map_err(RepositoryError::from)?;
            rows.into_iter().map(Site::try_from).collect()
        })
        .await
    }

    async fn get_site(&self, id: SiteId) -> RepositoryResult<Site> {
        self.with_conn("get_site", move |conn| {
            let row = sites::table
                .find(id.value())
                .first::<SiteRow>(conn)
                .optional()
                .map_err(RepositoryError::from)?
                .ok_or_else(|| RepositoryError::not_found(format!("Site {} not found", id)))?;
            Site::try_from(row)
        })
        .await
    }

    async fn store_site(&self, site: &Site) -> RepositoryResult<SiteId> {
        let site = site.clone();
        self.with_conn("store_site", move |conn| match site.id {
            Some(id) => {
                let updated = diesel::update(sites::table.find(id.value()))
                    .set((
                        sites::name.eq(&site.name),
                        sites::site_type.eq(site.site_type.as_str()),
                        sites::institution_id.eq(site.institution_id.value()),
                    ))
                    .execute(conn)
                    .map_err(RepositoryError::from)?;
                if updated == 0 {
                    return Err(RepositoryError::not_found(format!(
                        "Site {} not found",
                        id
                    )));
                }
                Ok(id)
            }
            None => {
                let new_row = NewSiteRow::from(&site);
                let id: i64 = diesel::insert_into(sites::table)
                    .values(&new_row)
                    .returning(sites::site_id)
                    .get_result(conn)
                    .map_err(RepositoryError::from)?;
                Ok(SiteId::new(id))
            }
        })
        .await
    }

    async fn delete_site(&self, id: SiteId) -> RepositoryResult<usize> {
        self.with_conn("delete_site", move |conn| {
            diesel::delete(sites::table.find(id.value()))
                .execute(conn)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn list_rates(&self, cpt_code: Option<&str>) -> RepositoryResult<Vec<Rate>> {
        let cpt_code = cpt_code.map(|c| c.to_string());
        self.with_conn("list_rates", move |conn| {
            let mut query = rates::table.into_boxed();
            if let Some(ref code) = cpt_code {
                query = query.filter(rates::cpt_code.eq(code.clone()));
            }
            let rows = query
                .order(rates::rate_id.asc())
                .load::<RateRow>(conn)
                .map_err(RepositoryError::from)?;
            rows.into_iter().map(Rate::try_from).collect()
        })
        .await
    }

    async fn fetch_rates_for_cpt_codes(&self, codes: &[String]) -> RepositoryResult<Vec<Rate>> {
        let codes = codes.to_vec();
        self.with_conn("fetch_rates_for_cpt_codes", move |conn| {
            let rows = rates::table
                .filter(rates::cpt_code.eq_any(&codes))
                .load::<RateRow>(conn)
                .map_err(RepositoryError::from)?;
            rows.into_iter().map(Rate::try_from).collect()
        })
        .await
    }

    async fn upsert_rate(&self, rate: &Rate) -> RepositoryResult<RateId> {
        let new_row = NewRateRow::from(rate);
        self.with_conn("upsert_rate", move |conn| {
            let id: i64 = diesel::insert_into(rates::table)
                .values(&new_row)
                .on_conflict((
                    rates::cpt_code,
                    rates::payer_type,
                    rates::site_type,
                    rates::component,
                ))
                .do_update()
                .set(rates::amount_cents.eq(excluded(rates::amount_cents)))
                .returning(rates::rate_id)
                .get_result(conn)
                .map_err(RepositoryError::from)?;
            Ok(RateId::new(id))
        })
        .await
    }

    async fn delete_rate(&self, id: RateId) -> RepositoryResult<usize> {
        self.with_conn("delete_rate", move |conn| {
            diesel::delete(rates::table.find(id.value()))
                .execute(conn)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn list_payer_multipliers(&self) -> RepositoryResult<Vec<PayerMultiplier>> {
        self.with_conn("list_payer_multipliers", |conn| {
            let rows = payer_multipliers::table
                .order(payer_multipliers::payer_type.asc())
                .load::<PayerMultiplierRow>(conn)
                .map_err(RepositoryError::from)?;
            rows.into_iter().map(PayerMultiplier::try_from).collect()
        })
        .await
    }

    async fn get_payer_multiplier(&self, payer: PayerType) -> RepositoryResult<PayerMultiplier> {
        self.with_conn("get_payer_multiplier", move |conn| {
            let row = payer_multipliers::table
                .find(payer.as_str())
                .first::<PayerMultiplierRow>(conn)
                .optional()
                .map_err(RepositoryError::from)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!(
                        "No multiplier for payer {}",
                        payer.as_str()
                    ))
                })?;
            PayerMultiplier::try_from(row)
        })
        .await
    }

    async fn upsert_payer_multiplier(
        &self,
        multiplier: &PayerMultiplier,
    ) -> RepositoryResult<()> {
        let row = PayerMultiplierRow::from(multiplier);
        self.with_conn("upsert_payer_multiplier", move |conn| {
            diesel::insert_into(payer_multipliers::table)
                .values(&row)
                .on_conflict(payer_multipliers::payer_type)
                .do_update()
                .set((
                    payer_multipliers::professional_ratio
                        .eq(excluded(payer_multipliers::professional_ratio)),
                    payer_multipliers::technical_ratio
                        .eq(excluded(payer_multipliers::technical_ratio)),
                    payer_multipliers::global_ratio
                        .eq(excluded(payer_multipliers::global_ratio)),
                ))
                .execute(conn)
                .map_err(RepositoryError::from)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ValuationRepository for PostgresRepository {
    async fn store_valuation(&self, valuation: &Valuation) -> RepositoryResult<ValuationId> {
        let new_row = NewValuationRow::from(valuation);
        let activities = valuation.activities.clone();
        self.with_conn("store_valuation", move |conn| {
            conn.transaction::<ValuationId, RepositoryError, _>(|conn| {
                let id: i64 = diesel::insert_into(valuations::table)
                    .values(&new_row)
                    .returning(valuations::valuation_id)
                    .get_result(conn)?;

                let activity_rows: Vec<NewValuationActivityRow> = activities
                    .iter()
                    .map(|a| NewValuationActivityRow {
                        valuation_id: id,
                        cpt_code: a.cpt_code.clone(),
                        monthly_orders: a.monthly_orders,
                        monthly_reads: a.monthly_reads,
                        monthly_performs: a.monthly_performs,
                    })
                    .collect();
                diesel::insert_into(valuation_activities::table)
                    .values(&activity_rows)
                    .execute(conn)?;

                Ok(ValuationId::new(id))
            })
        })
        .await
    }

    async fn get_valuation(&self, id: ValuationId) -> RepositoryResult<Valuation> {
        self.with_conn("get_valuation", move |conn| {
            let row = valuations::table
                .find(id.value())
                .first::<ValuationRow>(conn)
                .optional()
                .map_err(RepositoryError::from)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Valuation {} not found", id))
                })?;
            let activities = load_activities(conn, id.value())?;
            row.into_valuation(activities)
        })
        .await
    }

    async fn list_valuations_for_owner(
        &self,
        owner: &ValuationOwner,
    ) -> RepositoryResult<Vec<Valuation>> {
        let (owner_kind, owner_token) = owner_columns(owner);
        self.with_conn("list_valuations_for_owner", move |conn| {
            let rows = valuations::table
                .filter(valuations::owner_kind.eq(&owner_kind))
                .filter(valuations::owner_token.eq(&owner_token))
                .order(valuations::valuation_id.asc())
                .load::<ValuationRow>(conn)
                .map_err(RepositoryError::from)?;

            let mut result = Vec::with_capacity(rows.len());
            for row in rows {
                let activities = load_activities(conn, row.valuation_id)?;
                result.push(row.into_valuation(activities)?);
            }
            Ok(result)
        })
        .await
    }

    async fn delete_valuation(&self, id: ValuationId) -> RepositoryResult<usize> {
        // Activity rows go with the valuation via ON DELETE CASCADE.
        self.with_conn("delete_valuation", move |conn| {
            diesel::delete(valuations::table.find(id.value()))
                .execute(conn)
                .map_err(RepositoryError::from)
        })
        .await
    }
}

#[async_trait]
impl ScenarioRepository for PostgresRepository {
    async fn store_scenario(&self, scenario: &Scenario) -> RepositoryResult<ScenarioId> {
        let new_row = NewScenarioRow::from(scenario);
        let procedures = scenario.procedures.clone();
        self.with_conn("store_scenario", move |conn| {
            conn.transaction::<ScenarioId, RepositoryError, _>(|conn| {
                let id: i64 = diesel::insert_into(scenarios::table)
                    .values(&new_row)
                    .returning(scenarios::scenario_id)
                    .get_result(conn)?;

                let procedure_rows: Vec<NewScenarioProcedureRow> = procedures
                    .iter()
                    .map(|p| NewScenarioProcedureRow {
                        scenario_id: id,
                        cpt_code: p.cpt_code.clone(),
                        quantity: p.quantity,
                    })
                    .collect();
                diesel::insert_into(scenario_procedures::table)
                    .values(&procedure_rows)
                    .execute(conn)?;

                Ok(ScenarioId::new(id))
            })
        })
        .await
    }

    async fn get_scenario(&self, id: ScenarioId) -> RepositoryResult<Scenario> {
        self.with_conn("get_scenario", move |conn| {
            let row = scenarios::table
                .find(id.value())
                .first::<ScenarioRow>(conn)
                .optional()
                .map_err(RepositoryError::from)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Scenario {} not found", id))
                })?;
            let procedures = load_procedures(conn, id.value())?;
            row.into_scenario(procedures)
        })
        .await
    }

    async fn list_scenarios(&self) -> RepositoryResult<Vec<Scenario>> {
        self.with_conn("list_scenarios", |conn| {
            let rows = scenarios::table
                .order(scenarios::scenario_id.asc())
                .load::<ScenarioRow>(conn)
                .map_err(RepositoryError::from)?;

            let mut result = Vec::with_capacity(rows.len());
            for row in rows {
                let procedures = load_procedures(conn, row.scenario_id)?;
                result.push(row.into_scenario(procedures)?);
            }
            Ok(result)
        })
        .await
    }

    async fn delete_scenario(&self, id: ScenarioId) -> RepositoryResult<usize> {
        // Procedure rows go with the scenario via ON DELETE CASCADE.
        self.with_conn("delete_scenario", move |conn| {
            diesel::delete(scenarios::table.find(id.value()))
                .execute(conn)
                .map_err(RepositoryError::from)
        })
        .await
    }
}
