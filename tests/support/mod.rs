//! Shared fixtures for integration tests.

use chrono::Utc;
use rust_decimal_macros::dec;

use rvumod::api::{InstitutionId, ProviderId, SiteId};
use rvumod::db::repositories::LocalRepository;
use rvumod::db::services;
use rvumod::models::catalog::{
    CptCode, Institution, PayerMultiplier, PayerType, ProcedureType, Provider, ProviderType, Rate,
    RateComponent, Site, SiteType,
};
use rvumod::models::valuation::{Valuation, ValuationActivity, ValuationOwner};

/// Ids of the seeded catalog rows.
pub struct Seeded {
    pub home_institution: InstitutionId,
    pub host_institution: InstitutionId,
    pub office_site: SiteId,
    pub hospital_site: SiteId,
}

/// Seed a repository with two CPT codes (99213 visit, 70450 imaging), two
/// institutions, one site of each type, full Medicare/Commercial/Medicaid
/// rates, and technical multipliers for the non-Medicare payers.
pub async fn seed_catalog(repo: &LocalRepository) -> Seeded {
    services::upsert_cpt_code(
        repo,
        &CptCode {
            code: "99213".to_string(),
            description: "Office visit, established patient".to_string(),
            work_rvu: Some(dec!(0.97)),
            procedure_type: ProcedureType::Visit,
        },
    )
    .await
    .unwrap();
    services::upsert_cpt_code(
        repo,
        &CptCode {
            code: "70450".to_string(),
            description: "CT head without contrast".to_string(),
            work_rvu: Some(dec!(0.85)),
            procedure_type: ProcedureType::Imaging,
        },
    )
    .await
    .unwrap();

    let home_institution = services::store_institution(
        repo,
        &Institution {
            id: None,
            name: "Home Medical Group".to_string(),
            active: true,
        },
    )
    .await
    .unwrap();
    let host_institution = services::store_institution(
        repo,
        &Institution {
            id: None,
            name: "Host Hospital".to_string(),
            active: true,
        },
    )
    .await
    .unwrap();

    let office_site = services::store_site(
        repo,
        &Site {
            id: None,
            name: "Home Office".to_string(),
            site_type: SiteType::Fpa,
            institution_id: home_institution,
        },
    )
    .await
    .unwrap();
    let hospital_site = services::store_site(
        repo,
        &Site {
            id: None,
            name: "Host Outpatient Dept".to_string(),
            site_type: SiteType::Article28,
            institution_id: host_institution,
        },
    )
    .await
    .unwrap();

    // (cpt, payer, site, component, cents)
    let rates = [
        ("99213", PayerType::Medicare, SiteType::Fpa, RateComponent::Global, 8000),
        ("99213", PayerType::Commercial, SiteType::Fpa, RateComponent::Global, 13400),
        ("99213", PayerType::Medicaid, SiteType::Fpa, RateComponent::Global, 9800),
        ("99213", PayerType::Medicare, SiteType::Article28, RateComponent::Professional, 4000),
        ("99213", PayerType::Commercial, SiteType::Article28, RateComponent::Professional, 6000),
        ("99213", PayerType::Medicaid, SiteType::Article28, RateComponent::Professional, 3000),
        ("99213", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 2000),
        ("99213", PayerType::Commercial, SiteType::Article28, RateComponent::Technical, 3000),
        ("99213", PayerType::Medicaid, SiteType::Article28, RateComponent::Technical, 1500),
        ("70450", PayerType::Medicare, SiteType::Fpa, RateComponent::Global, 12000),
        ("70450", PayerType::Commercial, SiteType::Fpa, RateComponent::Global, 20000),
        ("70450", PayerType::Medicaid, SiteType::Fpa, RateComponent::Global, 10000),
        ("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Professional, 4000),
        ("70450", PayerType::Commercial, SiteType::Article28, RateComponent::Professional, 6500),
        ("70450", PayerType::Medicaid, SiteType::Article28, RateComponent::Professional, 3500),
        ("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 11000),
        ("70450", PayerType::Commercial, SiteType::Article28, RateComponent::Technical, 16000),
        ("70450", PayerType::Medicaid, SiteType::Article28, RateComponent::Technical, 9000),
    ];
    for (code, payer, site, component, cents) in rates {
        services::upsert_rate(
            repo,
            &Rate {
                id: None,
                cpt_code: code.to_string(),
                payer_type: payer,
                site_type: site,
                component,
                amount_cents: cents,
            },
        )
        .await
        .unwrap();
    }

    services::upsert_payer_multiplier(
        repo,
        &PayerMultiplier {
            payer_type: PayerType::Commercial,
            professional_ratio: 120,
            technical_ratio: 145,
            global_ratio: 100,
        },
    )
    .await
    .unwrap();
    services::upsert_payer_multiplier(
        repo,
        &PayerMultiplier {
            payer_type: PayerType::Medicaid,
            professional_ratio: 90,
            technical_ratio: 80,
            global_ratio: 100,
        },
    )
    .await
    .unwrap();

    Seeded {
        home_institution,
        host_institution,
        office_site,
        hospital_site,
    }
}

/// Store a provider of the given type homed at `home`.
pub async fn seed_provider(
    repo: &LocalRepository,
    provider_type: ProviderType,
    home: InstitutionId,
) -> ProviderId {
    services::store_provider(
        repo,
        &Provider {
            id: None,
            name: format!("Dr. {:?}", provider_type),
            provider_type,
            home_institution_id: home,
        },
    )
    .await
    .unwrap()
}

/// Build a valuation aggregate ready for storage.
pub fn valuation(
    provider_id: ProviderId,
    site_id: Option<SiteId>,
    owner: ValuationOwner,
    activities: Vec<ValuationActivity>,
) -> Valuation {
    Valuation {
        id: None,
        provider_id,
        site_id,
        monthly_patients: 100,
        owner,
        created_at: Utc::now(),
        activities,
    }
}

pub fn imaging_activity(orders: i32, reads: i32) -> ValuationActivity {
    ValuationActivity {
        cpt_code: "70450".to_string(),
        monthly_orders: orders,
        monthly_reads: reads,
        monthly_performs: 0,
    }
}

pub fn visit_activity(performs: i32) -> ValuationActivity {
    ValuationActivity {
        cpt_code: "99213".to_string(),
        monthly_orders: 0,
        monthly_reads: 0,
        monthly_performs: performs,
    }
}
