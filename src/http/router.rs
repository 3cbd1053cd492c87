//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the API router with versioned endpoints
    let api_v1 = Router::new()
        // CPT code catalog
        .route("/cpt-codes", get(handlers::list_cpt_codes))
        .route("/cpt-codes", post(handlers::upsert_cpt_code))
        .route("/cpt-codes/{code}", get(handlers::get_cpt_code))
        .route("/cpt-codes/{code}", axum::routing::delete(handlers::delete_cpt_code))
        // Institutions
        .route("/institutions", get(handlers::list_institutions))
        .route("/institutions", post(handlers::create_institution))
        .route("/institutions/{id}", get(handlers::get_institution))
        .route("/institutions/{id}", put(handlers::update_institution))
        .route("/institutions/{id}", axum::routing::delete(handlers::delete_institution))
        // Providers
        .route("/providers", get(handlers::list_providers))
        .route("/providers", post(handlers::create_provider))
        .route("/providers/{id}", get(handlers::get_provider))
        .route("/providers/{id}", put(handlers::update_provider))
        .route("/providers/{id}", axum::routing::delete(handlers::delete_provider))
        // Sites
        .route("/sites", get(handlers::list_sites))
        .route("/sites", post(handlers::create_site))
        .route("/sites/{id}", get(handlers::get_site))
        .route("/sites/{id}", put(handlers::update_site))
        .route("/sites/{id}", axum::routing::delete(handlers::delete_site))
        // Rates and multipliers
        .route("/rates", get(handlers::list_rates))
        .route("/rates", post(handlers::upsert_rate))
        .route("/rates/{id}", axum::routing::delete(handlers::delete_rate))
        .route("/multipliers", get(handlers::list_multipliers))
        .route("/multipliers", put(handlers::upsert_multiplier))
        // Valuations + calculation
        .route("/valuations", get(handlers::list_valuations))
        .route("/valuations", post(handlers::create_valuation))
        .route("/valuations/{id}", get(handlers::get_valuation))
        .route("/valuations/{id}", axum::routing::delete(handlers::delete_valuation))
        .route("/valuations/{id}/calculate", get(handlers::calculate_valuation))
        // Scenarios + comparison
        .route("/scenarios", get(handlers::list_scenarios))
        .route("/scenarios", post(handlers::create_scenario))
        .route("/scenarios/{id}", get(handlers::get_scenario))
        .route("/scenarios/{id}", axum::routing::delete(handlers::delete_scenario))
        .route("/scenarios/{id}/calculate", get(handlers::calculate_scenario));

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::services::guest_sessions::GuestSessionStore;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_router_creation() {
        let repo = Arc::new(LocalRepository::new()) as Arc<dyn crate::db::repository::FullRepository>;
        let sessions = Arc::new(GuestSessionStore::new(Duration::from_secs(3600)));
        let state = AppState::new(repo, sessions);
        let _router = create_router(state);
        // If we got here, router was created successfully
    }
}
