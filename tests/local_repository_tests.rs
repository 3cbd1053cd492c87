//! Behavior tests for the in-memory repository's integrity rules.

mod support;

use rvumod::api::InstitutionId;
use rvumod::db::repositories::LocalRepository;
use rvumod::db::repository::{CatalogRepository, RepositoryError, ScenarioRepository};
use rvumod::db::services;
use rvumod::models::catalog::{
    PayerType, Provider, ProviderType, Rate, RateComponent, Site, SiteType,
};
use rvumod::models::scenario::{PayerMix, RateMode, Scenario, ScenarioProcedure};

use support::seed_catalog;

#[tokio::test]
async fn test_provider_requires_existing_institution() {
    let repo = LocalRepository::new();
    let result = repo
        .store_provider(&Provider {
            id: None,
            name: "Dr. Nowhere".to_string(),
            provider_type: ProviderType::Type1,
            home_institution_id: InstitutionId::new(404),
        })
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::ValidationError { .. })
    ));
}

#[tokio::test]
async fn test_site_requires_existing_institution() {
    let repo = LocalRepository::new();
    let result = repo
        .store_site(&Site {
            id: None,
            name: "Orphan Site".to_string(),
            site_type: SiteType::Fpa,
            institution_id: InstitutionId::new(404),
        })
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::ValidationError { .. })
    ));
}

#[tokio::test]
async fn test_rate_requires_existing_cpt_code() {
    let repo = LocalRepository::new();
    let result = repo
        .upsert_rate(&Rate {
            id: None,
            cpt_code: "00000".to_string(),
            payer_type: PayerType::Medicare,
            site_type: SiteType::Fpa,
            component: RateComponent::Global,
            amount_cents: 100,
        })
        .await;
    assert!(matches!(
        result,
        Err(RepositoryError::ValidationError { .. })
    ));
}

#[tokio::test]
async fn test_cpt_delete_restricted_while_rates_reference_it() {
    let repo = LocalRepository::new();
    seed_catalog(&repo).await;

    let result = repo.delete_cpt_code("99213").await;
    assert!(matches!(
        result,
        Err(RepositoryError::ValidationError { .. })
    ));

    // Removing the rates first unblocks the delete
    for rate in services::list_rates(&repo, Some("99213")).await.unwrap() {
        repo.delete_rate(rate.id.unwrap()).await.unwrap();
    }
    assert_eq!(repo.delete_cpt_code("99213").await.unwrap(), 1);
}

#[tokio::test]
async fn test_scenario_store_validates_mix_and_cpt_refs() {
    let repo = LocalRepository::new();
    seed_catalog(&repo).await;

    let mut scenario = Scenario {
        id: None,
        provider_name: "Dr. S".to_string(),
        monthly_patients: 10,
        payer_mix: PayerMix::new(50, 50, 0),
        site_type: SiteType::Fpa,
        rate_mode: RateMode::Manual,
        created_at: chrono::Utc::now(),
        procedures: vec![ScenarioProcedure {
            cpt_code: "99213".to_string(),
            quantity: 1,
        }],
    };
    let id = repo.store_scenario(&scenario).await.unwrap();
    assert_eq!(repo.get_scenario(id).await.unwrap().procedures.len(), 1);

    scenario.procedures[0].cpt_code = "does-not-exist".to_string();
    assert!(repo.store_scenario(&scenario).await.is_err());

    scenario.procedures[0].cpt_code = "99213".to_string();
    scenario.payer_mix = PayerMix::new(50, 50, 50);
    assert!(repo.store_scenario(&scenario).await.is_err());
}

#[tokio::test]
async fn test_scenario_delete_cascades_procedures() {
    let repo = LocalRepository::new();
    seed_catalog(&repo).await;

    let scenario = Scenario {
        id: None,
        provider_name: "Dr. S".to_string(),
        monthly_patients: 10,
        payer_mix: PayerMix::new(100, 0, 0),
        site_type: SiteType::Fpa,
        rate_mode: RateMode::Manual,
        created_at: chrono::Utc::now(),
        procedures: vec![
            ScenarioProcedure {
                cpt_code: "99213".to_string(),
                quantity: 1,
            },
            ScenarioProcedure {
                cpt_code: "70450".to_string(),
                quantity: 2,
            },
        ],
    };
    let id = repo.store_scenario(&scenario).await.unwrap();

    assert_eq!(repo.delete_scenario(id).await.unwrap(), 1);
    assert!(repo.get_scenario(id).await.is_err());
    // The CPT codes the procedures referenced are untouched
    assert_eq!(repo.list_cpt_codes().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_multiplier_upsert_replaces_existing() {
    let repo = LocalRepository::new();
    seed_catalog(&repo).await;

    let mut multiplier = repo
        .get_payer_multiplier(PayerType::Commercial)
        .await
        .unwrap();
    assert_eq!(multiplier.technical_ratio, 145);

    multiplier.technical_ratio = 150;
    repo.upsert_payer_multiplier(&multiplier).await.unwrap();

    let reloaded = repo
        .get_payer_multiplier(PayerType::Commercial)
        .await
        .unwrap();
    assert_eq!(reloaded.technical_ratio, 150);
    assert_eq!(repo.list_payer_multipliers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unhealthy_repository_fails_operations() {
    let repo = LocalRepository::new();
    seed_catalog(&repo).await;
    repo.set_healthy(false);

    assert!(matches!(
        repo.list_cpt_codes().await,
        Err(RepositoryError::ConnectionError { .. })
    ));
    assert!(!repo.health_check().await.unwrap());

    repo.set_healthy(true);
    assert!(repo.list_cpt_codes().await.is_ok());
}
