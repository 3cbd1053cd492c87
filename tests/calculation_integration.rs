//! End-to-end calculation tests against the in-memory repository.

mod support;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use rvumod::db::repositories::LocalRepository;
use rvumod::db::services;
use rvumod::models::catalog::{PayerType, ProviderType, SiteType};
use rvumod::models::scenario::{PayerMix, RateMode, Scenario, ScenarioProcedure};
use rvumod::models::valuation::ValuationOwner;
use rvumod::services::{get_scenario_comparison, get_valuation_summary};

use support::{imaging_activity, seed_catalog, seed_provider, valuation, visit_activity};

fn user_owner() -> ValuationOwner {
    ValuationOwner::User("user_1".to_string())
}

#[tokio::test]
async fn test_type2_valuation_summary_end_to_end() {
    let repo = LocalRepository::new();
    let seeded = seed_catalog(&repo).await;
    let provider_id = seed_provider(&repo, ProviderType::Type2, seeded.home_institution).await;

    let id = services::create_valuation(
        &repo,
        &valuation(
            provider_id,
            Some(seeded.hospital_site),
            user_owner(),
            vec![imaging_activity(30, 25), visit_activity(50)],
        ),
    )
    .await
    .unwrap();

    let summary = get_valuation_summary(&repo, id, PayerType::Medicare)
        .await
        .unwrap();

    assert_eq!(summary.site_type, SiteType::Article28);
    // 70450: earned prof 25 * $40, attributed prof 30 * $40, tech 30 * $110
    // 99213: prof 50 * $40 both sides, tech 50 * $20 attributed only (Type2)
    assert_eq!(summary.total_professional_revenue, dec!(3000.00));
    assert_eq!(summary.total_attributed_professional_revenue, dec!(3200.00));
    assert_eq!(summary.total_technical_revenue, Decimal::ZERO);
    assert_eq!(summary.total_attributed_technical_revenue, dec!(4300.00));
    // RVUs: 25 * 0.85 + 50 * 0.97 earned; 30 * 0.85 + 50 * 0.97 attributed
    assert_eq!(summary.total_rvus, dec!(69.75));
    assert_eq!(summary.total_attributed_rvus, dec!(74.00));
    assert_eq!(summary.missing_rate_count, 0);
    assert_eq!(summary.activities.len(), 2);
}

#[tokio::test]
async fn test_calculate_is_idempotent_without_writes() {
    let repo = LocalRepository::new();
    let seeded = seed_catalog(&repo).await;
    let provider_id = seed_provider(&repo, ProviderType::Type1, seeded.home_institution).await;

    let id = services::create_valuation(
        &repo,
        &valuation(
            provider_id,
            Some(seeded.office_site),
            user_owner(),
            vec![visit_activity(50)],
        ),
    )
    .await
    .unwrap();

    let first = get_valuation_summary(&repo, id, PayerType::Medicare)
        .await
        .unwrap();
    let second = get_valuation_summary(&repo, id, PayerType::Medicare)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(first.total_rvus, dec!(48.50));
    assert_eq!(first.total_global_revenue, dec!(4000.00)); // 50 * $80
}

#[tokio::test]
async fn test_valuation_with_no_site_prices_as_freestanding_office() {
    let repo = LocalRepository::new();
    let seeded = seed_catalog(&repo).await;
    let provider_id = seed_provider(&repo, ProviderType::Type1, seeded.home_institution).await;

    let id = services::create_valuation(
        &repo,
        &valuation(provider_id, None, user_owner(), vec![visit_activity(10)]),
    )
    .await
    .unwrap();

    let summary = get_valuation_summary(&repo, id, PayerType::Commercial)
        .await
        .unwrap();

    assert_eq!(summary.site_type, SiteType::Fpa);
    assert_eq!(summary.total_global_revenue, dec!(1340.00)); // 10 * $134
    assert_eq!(summary.total_professional_revenue, Decimal::ZERO);
}

#[tokio::test]
async fn test_missing_rates_surface_in_summary() {
    let repo = LocalRepository::new();
    let seeded = seed_catalog(&repo).await;
    let provider_id = seed_provider(&repo, ProviderType::Type1, seeded.home_institution).await;

    // No medicaid technical rate was ever entered for 99213 at FPA sites
    // (global only there), so price an Article 28 valuation with a payer
    // that has partial coverage by deleting one seeded rate first.
    let rates = services::list_rates(&repo, Some("99213")).await.unwrap();
    let medicaid_technical = rates
        .iter()
        .find(|r| {
            r.payer_type == PayerType::Medicaid
                && r.site_type == SiteType::Article28
                && r.component == rvumod::models::catalog::RateComponent::Technical
        })
        .unwrap();
    services::delete_rate(&repo, medicaid_technical.id.unwrap())
        .await
        .unwrap();

    let id = services::create_valuation(
        &repo,
        &valuation(
            provider_id,
            Some(seeded.hospital_site),
            user_owner(),
            vec![visit_activity(10)],
        ),
    )
    .await
    .unwrap();

    let summary = get_valuation_summary(&repo, id, PayerType::Medicaid)
        .await
        .unwrap();

    assert_eq!(summary.missing_rate_count, 1);
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.total_technical_revenue, Decimal::ZERO);
    // Professional side still prices normally
    assert_eq!(summary.total_professional_revenue, dec!(300.00)); // 10 * $30
}

#[tokio::test]
async fn test_scenario_comparison_end_to_end() {
    let repo = LocalRepository::new();
    seed_catalog(&repo).await;

    let id = services::create_scenario(
        &repo,
        &Scenario {
            id: None,
            provider_name: "Dr. Mix".to_string(),
            monthly_patients: 200,
            payer_mix: PayerMix::new(40, 40, 20),
            site_type: SiteType::Fpa,
            rate_mode: RateMode::Manual,
            created_at: chrono::Utc::now(),
            procedures: vec![ScenarioProcedure {
                cpt_code: "99213".to_string(),
                quantity: 1,
            }],
        },
    )
    .await
    .unwrap();

    let comparison = get_scenario_comparison(&repo, id).await.unwrap();

    // Global: 80*0.4 + 134*0.4 + 98*0.2 = 105.20
    // Professional: 40*0.4 + 60*0.4 + 30*0.2 = 46.00
    // Technical: 20*0.4 + 30*0.4 + 15*0.2 = 23.00
    assert_eq!(comparison.fpa_total, dec!(105.20));
    assert_eq!(comparison.article28_total, dec!(69.00));
    assert_eq!(comparison.difference, dec!(-36.20));
    assert_eq!(comparison.percent_difference.round_dp(2), dec!(-34.41));
    assert_eq!(comparison.missing_rate_count, 0);
}

#[tokio::test]
async fn test_scenario_calculated_mode_end_to_end() {
    let repo = LocalRepository::new();
    seed_catalog(&repo).await;

    let id = services::create_scenario(
        &repo,
        &Scenario {
            id: None,
            provider_name: "Dr. Derived".to_string(),
            monthly_patients: 100,
            payer_mix: PayerMix::new(0, 100, 0),
            site_type: SiteType::Article28,
            rate_mode: RateMode::Calculated,
            created_at: chrono::Utc::now(),
            procedures: vec![ScenarioProcedure {
                cpt_code: "70450".to_string(),
                quantity: 2,
            }],
        },
    )
    .await
    .unwrap();

    let comparison = get_scenario_comparison(&repo, id).await.unwrap();

    // Commercial technical is derived: $110 medicare * 1.45 = $159.50.
    // Professional stays at the stored commercial $65.
    assert_eq!(comparison.lines[0].article28_technical_rate, dec!(159.50));
    assert_eq!(comparison.lines[0].article28_professional_rate, dec!(65.00));
    assert_eq!(comparison.article28_total, dec!(449.00));
    assert_eq!(comparison.fpa_total, dec!(400.00)); // stored commercial global $200 * 2
    assert_eq!(comparison.difference, dec!(49.00));
}

#[tokio::test]
async fn test_guest_session_expiry_removes_valuations() {
    use rvumod::services::guest_sessions::GuestSessionStore;
    use std::time::Duration;

    let repo = LocalRepository::new();
    let seeded = seed_catalog(&repo).await;
    let provider_id = seed_provider(&repo, ProviderType::Type1, seeded.home_institution).await;

    let store = GuestSessionStore::new(Duration::from_secs(60));
    let token = store.create_session();

    let id = services::create_valuation(
        &repo,
        &valuation(
            provider_id,
            None,
            ValuationOwner::Guest(token.clone()),
            vec![visit_activity(5)],
        ),
    )
    .await
    .unwrap();
    store.register_valuation(&token, id);

    // Simulate the sweep firing after the TTL has elapsed
    let later = chrono::Utc::now() + chrono::Duration::seconds(120);
    let orphaned = store.purge_expired(later);
    assert_eq!(orphaned, vec![id]);
    for orphan in orphaned {
        services::delete_valuation(&repo, orphan).await.unwrap();
    }

    assert!(services::get_valuation(&repo, id).await.is_err());
    assert_eq!(store.session_count(), 0);
}
