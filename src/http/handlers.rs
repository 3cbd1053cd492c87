//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic. Catalog mutations are gated by the
//! `X-Admin-Token` header; guest-owned valuations are keyed by the
//! `X-Guest-Session` header.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use super::dto::{
    ActivityRequest, CalculateQuery, CreateScenarioRequest, CreateValuationRequest,
    CreateValuationResponse, CreatedResponse, DeletedResponse, HealthResponse, InstitutionRequest,
    ListResponse, ProviderRequest, RateListQuery, ScenarioProcedureRequest, SiteRequest,
    UpsertCptCodeRequest, UpsertMultiplierRequest, UpsertRateRequest,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{
    CptCode, Institution, InstitutionId, PayerMix, PayerMultiplier, PayerType, Provider,
    ProviderId, Rate, RateId, Scenario, ScenarioComparison, ScenarioId, Site, SiteId, Valuation,
    ValuationActivity, ValuationId, ValuationOwner, ValuationSummary,
};
use crate::db::services as db_services;
use crate::services::{get_scenario_comparison, get_valuation_summary};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
const GUEST_SESSION_HEADER: &str = "x-guest-session";
const USER_ID_HEADER: &str = "x-user-id";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// Gate privileged catalog mutations behind the shared admin token.
/// A server configured without a token runs open (development mode).
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    match &state.admin_token {
        None => Ok(()),
        Some(expected) => {
            let provided = header_value(headers, ADMIN_TOKEN_HEADER);
            if provided.as_deref() == Some(expected.as_str()) {
                Ok(())
            } else {
                Err(AppError::Forbidden(
                    "Admin token required for this operation".to_string(),
                ))
            }
        }
    }
}

fn is_admin(state: &AppState, headers: &HeaderMap) -> bool {
    require_admin(state, headers).is_ok()
}

/// Resolve the caller's identity for valuation ownership checks.
fn caller_owner(headers: &HeaderMap) -> Option<ValuationOwner> {
    if let Some(user_id) = header_value(headers, USER_ID_HEADER) {
        return Some(ValuationOwner::User(user_id));
    }
    header_value(headers, GUEST_SESSION_HEADER).map(ValuationOwner::Guest)
}

/// Check that the caller may read or delete a valuation.
fn check_valuation_access(
    state: &AppState,
    headers: &HeaderMap,
    valuation: &Valuation,
) -> Result<(), AppError> {
    if is_admin(state, headers) && state.admin_token.is_some() {
        return Ok(());
    }
    match caller_owner(headers) {
        Some(ref owner) if *owner == valuation.owner => {
            if let ValuationOwner::Guest(token) = owner {
                state.guest_sessions.touch(token);
            }
            Ok(())
        }
        _ => Err(AppError::Forbidden(
            "Valuation belongs to another owner".to_string(),
        )),
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and database is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// CPT Codes
// =============================================================================

/// GET /v1/cpt-codes
pub async fn list_cpt_codes(State(state): State<AppState>) -> HandlerResult<ListResponse<CptCode>> {
    let codes = db_services::list_cpt_codes(state.repository.as_ref()).await?;
    Ok(Json(codes.into()))
}

/// GET /v1/cpt-codes/{code}
pub async fn get_cpt_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> HandlerResult<CptCode> {
    let cpt = db_services::get_cpt_code(state.repository.as_ref(), &code).await?;
    Ok(Json(cpt))
}

/// POST /v1/cpt-codes
pub async fn upsert_cpt_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpsertCptCodeRequest>,
) -> HandlerResult<CptCode> {
    require_admin(&state, &headers)?;
    let cpt = CptCode {
        code: request.code,
        description: request.description,
        work_rvu: request.work_rvu,
        procedure_type: request.procedure_type,
    };
    db_services::upsert_cpt_code(state.repository.as_ref(), &cpt).await?;
    Ok(Json(cpt))
}

/// DELETE /v1/cpt-codes/{code}
pub async fn delete_cpt_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> HandlerResult<DeletedResponse> {
    require_admin(&state, &headers)?;
    let deleted = db_services::delete_cpt_code(state.repository.as_ref(), &code).await?;
    Ok(Json(DeletedResponse { deleted }))
}

// =============================================================================
// Institutions
// =============================================================================

/// GET /v1/institutions
pub async fn list_institutions(
    State(state): State<AppState>,
) -> HandlerResult<ListResponse<Institution>> {
    let institutions = db_services::list_institutions(state.repository.as_ref()).await?;
    Ok(Json(institutions.into()))
}

/// GET /v1/institutions/{id}
pub async fn get_institution(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<Institution> {
    let institution =
        db_services::get_institution(state.repository.as_ref(), InstitutionId::new(id)).await?;
    Ok(Json(institution))
}

/// POST /v1/institutions
pub async fn create_institution(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InstitutionRequest>,
) -> HandlerResult<CreatedResponse> {
    require_admin(&state, &headers)?;
    let institution = Institution {
        id: None,
        name: request.name,
        active: request.active,
    };
    let id = db_services::store_institution(state.repository.as_ref(), &institution).await?;
    Ok(Json(CreatedResponse { id: id.value() }))
}

/// PUT /v1/institutions/{id}
pub async fn update_institution(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<InstitutionRequest>,
) -> HandlerResult<Institution> {
    require_admin(&state, &headers)?;
    let institution = Institution {
        id: Some(InstitutionId::new(id)),
        name: request.name,
        active: request.active,
    };
    db_services::store_institution(state.repository.as_ref(), &institution).await?;
    Ok(Json(institution))
}

/// DELETE /v1/institutions/{id}
pub async fn delete_institution(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<DeletedResponse> {
    require_admin(&state, &headers)?;
    let deleted =
        db_services::delete_institution(state.repository.as_ref(), InstitutionId::new(id)).await?;
    Ok(Json(DeletedResponse { deleted }))
}

// =============================================================================
// Providers
// =============================================================================

/// GET /v1/providers
pub async fn list_providers(
    State(state): State<AppState>,
) -> HandlerResult<ListResponse<Provider>> {
    let providers = db_services::list_providers(state.repository.as_ref()).await?;
    Ok(Json(providers.into()))
}

/// GET /v1/providers/{id}
pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<Provider> {
    let provider =
        db_services::get_provider(state.repository.as_ref(), ProviderId::new(id)).await?;
    Ok(Json(provider))
}

/// POST /v1/providers
pub async fn create_provider(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ProviderRequest>,
) -> HandlerResult<CreatedResponse> {
    require_admin(&state, &headers)?;
    let provider = Provider {
        id: None,
        name: request.name,
        provider_type: request.provider_type,
        home_institution_id: InstitutionId::new(request.home_institution_id),
    };
    let id = db_services::store_provider(state.repository.as_ref(), &provider).await?;
    Ok(Json(CreatedResponse { id: id.value() }))
}

/// PUT /v1/providers/{id}
pub async fn update_provider(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<ProviderRequest>,
) -> HandlerResult<Provider> {
    require_admin(&state, &headers)?;
    let provider = Provider {
        id: Some(ProviderId::new(id)),
        name: request.name,
        provider_type: request.provider_type,
        home_institution_id: InstitutionId::new(request.home_institution_id),
    };
    db_services::store_provider(state.repository.as_ref(), &provider).await?;
    Ok(Json(provider))
}

/// DELETE /v1/providers/{id}
pub async fn delete_provider(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<DeletedResponse> {
    require_admin(&state, &headers)?;
    let deleted =
        db_services::delete_provider(state.repository.as_ref(), ProviderId::new(id)).await?;
    Ok(Json(DeletedResponse { deleted }))
}

// =============================================================================
// Sites
// =============================================================================

/// GET /v1/sites
pub async fn list_sites(State(state): State<AppState>) -> HandlerResult<ListResponse<Site>> {
    let sites = db_services::list_sites(state.repository.as_ref()).await?;
    Ok(Json(sites.into()))
}

/// GET /v1/sites/{id}
pub async fn get_site(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult<Site> {
    let site = db_services::get_site(state.repository.as_ref(), SiteId::new(id)).await?;
    Ok(Json(site))
}

/// POST /v1/sites
pub async fn create_site(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SiteRequest>,
) -> HandlerResult<CreatedResponse> {
    require_admin(&state, &headers)?;
    let site = Site {
        id: None,
        name: request.name,
        site_type: request.site_type,
        institution_id: InstitutionId::new(request.institution_id),
    };
    let id = db_services::store_site(state.repository.as_ref(), &site).await?;
    Ok(Json(CreatedResponse { id: id.value() }))
}

/// PUT /v1/sites/{id}
pub async fn update_site(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<SiteRequest>,
) -> HandlerResult<Site> {
    require_admin(&state, &headers)?;
    let site = Site {
        id: Some(SiteId::new(id)),
        name: request.name,
        site_type: request.site_type,
        institution_id: InstitutionId::new(request.institution_id),
    };
    db_services::store_site(state.repository.as_ref(), &site).await?;
    Ok(Json(site))
}

/// DELETE /v1/sites/{id}
pub async fn delete_site(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<DeletedResponse> {
    require_admin(&state, &headers)?;
    let deleted = db_services::delete_site(state.repository.as_ref(), SiteId::new(id)).await?;
    Ok(Json(DeletedResponse { deleted }))
}

// =============================================================================
// Rates & Multipliers
// =============================================================================

/// GET /v1/rates
pub async fn list_rates(
    State(state): State<AppState>,
    Query(query): Query<RateListQuery>,
) -> HandlerResult<ListResponse<Rate>> {
    let rates =
        db_services::list_rates(state.repository.as_ref(), query.cpt_code.as_deref()).await?;
    Ok(Json(rates.into()))
}

/// POST /v1/rates
///
/// Upsert on the (cpt_code, payer_type, site_type, component) tuple.
pub async fn upsert_rate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpsertRateRequest>,
) -> HandlerResult<CreatedResponse> {
    require_admin(&state, &headers)?;
    let rate = Rate {
        id: None,
        cpt_code: request.cpt_code,
        payer_type: request.payer_type,
        site_type: request.site_type,
        component: request.component,
        amount_cents: request.amount_cents,
    };
    let id = db_services::upsert_rate(state.repository.as_ref(), &rate).await?;
    Ok(Json(CreatedResponse { id: id.value() }))
}

/// DELETE /v1/rates/{id}
pub async fn delete_rate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<DeletedResponse> {
    require_admin(&state, &headers)?;
    let deleted = db_services::delete_rate(state.repository.as_ref(), RateId::new(id)).await?;
    Ok(Json(DeletedResponse { deleted }))
}

/// GET /v1/multipliers
pub async fn list_multipliers(
    State(state): State<AppState>,
) -> HandlerResult<ListResponse<PayerMultiplier>> {
    let multipliers = db_services::list_payer_multipliers(state.repository.as_ref()).await?;
    Ok(Json(multipliers.into()))
}

/// PUT /v1/multipliers
pub async fn upsert_multiplier(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpsertMultiplierRequest>,
) -> HandlerResult<PayerMultiplier> {
    require_admin(&state, &headers)?;
    let multiplier = PayerMultiplier {
        payer_type: request.payer_type,
        professional_ratio: request.professional_ratio,
        technical_ratio: request.technical_ratio,
        global_ratio: request.global_ratio,
    };
    db_services::upsert_payer_multiplier(state.repository.as_ref(), &multiplier).await?;
    Ok(Json(multiplier))
}

// =============================================================================
// Valuations
// =============================================================================

fn activity_from_request(request: ActivityRequest) -> ValuationActivity {
    ValuationActivity {
        cpt_code: request.cpt_code,
        monthly_orders: request.monthly_orders,
        monthly_reads: request.monthly_reads,
        monthly_performs: request.monthly_performs,
    }
}

/// POST /v1/valuations
///
/// Creates a valuation owned by the authenticated user (`X-User-Id`) or by
/// a guest session. Without either header a new guest session is minted and
/// returned in the response.
pub async fn create_valuation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateValuationRequest>,
) -> HandlerResult<CreateValuationResponse> {
    let (owner, guest_session) = match header_value(&headers, USER_ID_HEADER) {
        Some(user_id) => (ValuationOwner::User(user_id), None),
        None => {
            let token = header_value(&headers, GUEST_SESSION_HEADER)
                .unwrap_or_else(|| state.guest_sessions.create_session());
            (ValuationOwner::Guest(token.clone()), Some(token))
        }
    };

    let valuation = Valuation {
        id: None,
        provider_id: ProviderId::new(request.provider_id),
        site_id: request.site_id.map(SiteId::new),
        monthly_patients: request.monthly_patients,
        owner: owner.clone(),
        created_at: Utc::now(),
        activities: request
            .activities
            .into_iter()
            .map(activity_from_request)
            .collect(),
    };

    let valuation_id = db_services::create_valuation(state.repository.as_ref(), &valuation).await?;
    if let ValuationOwner::Guest(ref token) = owner {
        state.guest_sessions.register_valuation(token, valuation_id);
    }

    Ok(Json(CreateValuationResponse {
        valuation_id,
        guest_session,
    }))
}

/// GET /v1/valuations
///
/// List the caller's valuations.
pub async fn list_valuations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HandlerResult<ListResponse<Valuation>> {
    let owner = caller_owner(&headers).ok_or_else(|| {
        AppError::BadRequest("X-User-Id or X-Guest-Session header required".to_string())
    })?;
    let valuations =
        db_services::list_valuations_for_owner(state.repository.as_ref(), &owner).await?;
    Ok(Json(valuations.into()))
}

/// GET /v1/valuations/{id}
pub async fn get_valuation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<Valuation> {
    let valuation =
        db_services::get_valuation(state.repository.as_ref(), ValuationId::new(id)).await?;
    check_valuation_access(&state, &headers, &valuation)?;
    Ok(Json(valuation))
}

/// DELETE /v1/valuations/{id}
pub async fn delete_valuation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<DeletedResponse> {
    let valuation_id = ValuationId::new(id);
    let valuation = db_services::get_valuation(state.repository.as_ref(), valuation_id).await?;
    check_valuation_access(&state, &headers, &valuation)?;

    let deleted = db_services::delete_valuation(state.repository.as_ref(), valuation_id).await?;
    if let ValuationOwner::Guest(ref token) = valuation.owner {
        state.guest_sessions.remove_valuation(token, valuation_id);
    }
    Ok(Json(DeletedResponse { deleted }))
}

/// GET /v1/valuations/{id}/calculate
///
/// Compute the RVU and revenue summary for a valuation. The `payer` query
/// parameter selects whose rates price the activities (default: medicare).
pub async fn calculate_valuation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<CalculateQuery>,
) -> HandlerResult<ValuationSummary> {
    let valuation_id = ValuationId::new(id);
    let valuation = db_services::get_valuation(state.repository.as_ref(), valuation_id).await?;
    check_valuation_access(&state, &headers, &valuation)?;

    let payer = query.payer.unwrap_or(PayerType::Medicare);
    let summary = get_valuation_summary(state.repository.as_ref(), valuation_id, payer).await?;
    Ok(Json(summary))
}

// =============================================================================
// Scenarios
// =============================================================================

/// POST /v1/scenarios
pub async fn create_scenario(
    State(state): State<AppState>,
    Json(request): Json<CreateScenarioRequest>,
) -> HandlerResult<CreatedResponse> {
    request.validate().map_err(AppError::BadRequest)?;

    let scenario = Scenario {
        id: None,
        provider_name: request.provider_name,
        monthly_patients: request.monthly_patients,
        payer_mix: PayerMix::new(
            request.medicare_pct,
            request.commercial_pct,
            request.medicaid_pct,
        ),
        site_type: request.site_type,
        rate_mode: request.rate_mode,
        created_at: Utc::now(),
        procedures: request
            .procedures
            .into_iter()
            .map(|p: ScenarioProcedureRequest| crate::api::ScenarioProcedure {
                cpt_code: p.cpt_code,
                quantity: p.quantity,
            })
            .collect(),
    };

    let id = db_services::create_scenario(state.repository.as_ref(), &scenario).await?;
    Ok(Json(CreatedResponse { id: id.value() }))
}

/// GET /v1/scenarios
pub async fn list_scenarios(
    State(state): State<AppState>,
) -> HandlerResult<ListResponse<Scenario>> {
    let scenarios = db_services::list_scenarios(state.repository.as_ref()).await?;
    Ok(Json(scenarios.into()))
}

/// GET /v1/scenarios/{id}
pub async fn get_scenario(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<Scenario> {
    let scenario =
        db_services::get_scenario(state.repository.as_ref(), ScenarioId::new(id)).await?;
    Ok(Json(scenario))
}

/// DELETE /v1/scenarios/{id}
pub async fn delete_scenario(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<DeletedResponse> {
    let deleted =
        db_services::delete_scenario(state.repository.as_ref(), ScenarioId::new(id)).await?;
    Ok(Json(DeletedResponse { deleted }))
}

/// GET /v1/scenarios/{id}/calculate
///
/// Compute the FPA vs. Article 28 comparison for a scenario.
pub async fn calculate_scenario(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<ScenarioComparison> {
    let comparison =
        get_scenario_comparison(state.repository.as_ref(), ScenarioId::new(id)).await?;
    Ok(Json(comparison))
}
