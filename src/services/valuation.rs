//! Valuation engine.
//!
//! Converts a valuation's monthly procedure volumes into RVU and revenue
//! totals, split by payment component (professional/technical/global) and
//! by earned vs. attributed recipient according to the provider-type
//! attribution policy:
//!
//! - Type1 providers earn and are attributed every component at their home
//!   institution.
//! - Type2 (visiting) providers earn professional credit from the reads
//!   they perform; attributed professional revenue follows the order volume
//!   and books to the home institution, while technical revenue books to
//!   the hosting facility.
//! - Type3 (referring) providers earn nothing; their order volume generates
//!   technical revenue for the hosting facility.
//!
//! Imaging codes are quantified by reads (earned) and orders (attributed);
//! procedure and visit codes by performs on both sides. Missing rate rows
//! contribute $0 and are surfaced through `missing_rate_count`/`warnings`
//! instead of failing the calculation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::{InstitutionId, ValuationId};
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::models::catalog::{
    CptCode, PayerType, ProcedureType, Provider, ProviderType, RateComponent, RateTable, Site,
    SiteType,
};
use crate::models::valuation::ValuationActivity;

/// Per-activity calculation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityBreakdown {
    pub cpt_code: String,
    pub description: String,
    pub procedure_type: ProcedureType,
    pub monthly_orders: i32,
    pub monthly_reads: i32,
    pub monthly_performs: i32,
    pub earned_rvus: Decimal,
    pub attributed_rvus: Decimal,
    pub earned_professional: Decimal,
    pub attributed_professional: Decimal,
    pub earned_technical: Decimal,
    pub attributed_technical: Decimal,
    pub earned_global: Decimal,
    pub attributed_global: Decimal,
    /// Institution the attributed professional revenue books to
    pub professional_recipient: Option<InstitutionId>,
    /// Institution the technical/global revenue books to
    pub facility_recipient: Option<InstitutionId>,
}

/// Valuation calculation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub valuation_id: Option<ValuationId>,
    pub provider_type: ProviderType,
    pub site_type: SiteType,
    pub payer_type: PayerType,
    pub total_rvus: Decimal,
    pub total_attributed_rvus: Decimal,
    pub total_professional_revenue: Decimal,
    pub total_attributed_professional_revenue: Decimal,
    pub total_technical_revenue: Decimal,
    pub total_attributed_technical_revenue: Decimal,
    pub total_global_revenue: Decimal,
    pub total_attributed_global_revenue: Decimal,
    /// Number of rate lookups that found no matching row
    pub missing_rate_count: usize,
    pub warnings: Vec<String>,
    pub activities: Vec<ActivityBreakdown>,
}

impl ValuationSummary {
    fn empty(
        valuation_id: Option<ValuationId>,
        provider_type: ProviderType,
        site_type: SiteType,
        payer_type: PayerType,
    ) -> Self {
        Self {
            valuation_id,
            provider_type,
            site_type,
            payer_type,
            total_rvus: Decimal::ZERO,
            total_attributed_rvus: Decimal::ZERO,
            total_professional_revenue: Decimal::ZERO,
            total_attributed_professional_revenue: Decimal::ZERO,
            total_technical_revenue: Decimal::ZERO,
            total_attributed_technical_revenue: Decimal::ZERO,
            total_global_revenue: Decimal::ZERO,
            total_attributed_global_revenue: Decimal::ZERO,
            missing_rate_count: 0,
            warnings: Vec::new(),
            activities: Vec::new(),
        }
    }
}

/// Look up a component rate, booking $0 with a warning when no row matches.
fn component_rate(
    rates: &RateTable,
    cpt_code: &str,
    payer: PayerType,
    site_type: SiteType,
    component: RateComponent,
    missing_rate_count: &mut usize,
    warnings: &mut Vec<String>,
) -> Decimal {
    match rates.lookup(cpt_code, payer, site_type, component) {
        Some(rate) => rate,
        None => {
            *missing_rate_count += 1;
            warnings.push(format!(
                "No {} {} rate for CPT {} at {} sites; contribution booked as $0",
                payer.as_str(),
                component.as_str(),
                cpt_code,
                site_type.as_str()
            ));
            Decimal::ZERO
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn calculate_activity(
    provider_type: ProviderType,
    home_institution: InstitutionId,
    host_institution: InstitutionId,
    site_type: SiteType,
    payer: PayerType,
    activity: &ValuationActivity,
    cpt: &CptCode,
    rates: &RateTable,
    missing_rate_count: &mut usize,
    warnings: &mut Vec<String>,
) -> ActivityBreakdown {
    // Imaging volume is measured by reads (performed interpretations) on
    // the earned side and orders (studies sent to the facility) on the
    // attributed side; non-imaging volume by performs on both.
    let (earned_units, attributed_units) = if cpt.procedure_type.is_imaging() {
        (activity.monthly_reads, activity.monthly_orders)
    } else {
        (activity.monthly_performs, activity.monthly_performs)
    };
    let earned_qty = Decimal::from(earned_units);
    let attributed_qty = Decimal::from(attributed_units);
    let work_rvu = cpt.work_rvu.unwrap_or(Decimal::ZERO);

    let mut earned_professional = Decimal::ZERO;
    let mut attributed_professional = Decimal::ZERO;
    let mut technical = Decimal::ZERO;
    let mut earned_global = Decimal::ZERO;
    let mut attributed_global = Decimal::ZERO;

    match site_type {
        SiteType::Article28 => {
            let professional_rate = component_rate(
                rates,
                &cpt.code,
                payer,
                site_type,
                RateComponent::Professional,
                missing_rate_count,
                warnings,
            );
            let technical_rate = component_rate(
                rates,
                &cpt.code,
                payer,
                site_type,
                RateComponent::Technical,
                missing_rate_count,
                warnings,
            );
            earned_professional = professional_rate * earned_qty;
            attributed_professional = professional_rate * attributed_qty;
            // The facility performs the studies that were ordered there.
            technical = technical_rate * attributed_qty;
        }
        SiteType::Fpa => {
            let global_rate = component_rate(
                rates,
                &cpt.code,
                payer,
                site_type,
                RateComponent::Global,
                missing_rate_count,
                warnings,
            );
            earned_global = global_rate * earned_qty;
            attributed_global = global_rate * attributed_qty;
        }
    }

    let base = ActivityBreakdown {
        cpt_code: cpt.code.clone(),
        description: cpt.description.clone(),
        procedure_type: cpt.procedure_type,
        monthly_orders: activity.monthly_orders,
        monthly_reads: activity.monthly_reads,
        monthly_performs: activity.monthly_performs,
        earned_rvus: work_rvu * earned_qty,
        attributed_rvus: work_rvu * attributed_qty,
        earned_professional,
        attributed_professional,
        earned_technical: technical,
        attributed_technical: technical,
        earned_global,
        attributed_global,
        professional_recipient: Some(home_institution),
        facility_recipient: Some(home_institution),
    };

    match provider_type {
        // Home-institution provider at their own site: earns and is
        // attributed everything at home.
        ProviderType::Type1 => base,
        // Visiting provider: professional credit books home, technical to
        // the hosting facility, and the visitor earns no technical share.
        ProviderType::Type2 => ActivityBreakdown {
            earned_technical: Decimal::ZERO,
            professional_recipient: Some(home_institution),
            facility_recipient: Some(host_institution),
            ..base
        },
        // Referring provider: no direct patient care credit at all; the
        // ordered volume generates facility revenue only.
        ProviderType::Type3 => ActivityBreakdown {
            earned_rvus: Decimal::ZERO,
            attributed_rvus: Decimal::ZERO,
            earned_professional: Decimal::ZERO,
            attributed_professional: Decimal::ZERO,
            earned_technical: Decimal::ZERO,
            earned_global: Decimal::ZERO,
            professional_recipient: None,
            facility_recipient: Some(host_institution),
            ..base
        },
    }
}

/// Compute the full summary for a set of activities.
///
/// Pure function over already-loaded data; `calculate` requests are
/// idempotent for as long as the inputs do not change.
pub fn calculate_valuation(
    valuation_id: Option<ValuationId>,
    provider: &Provider,
    site: Option<&Site>,
    payer: PayerType,
    activities: &[(ValuationActivity, CptCode)],
    rates: &RateTable,
) -> ValuationSummary {
    // No site means a freestanding-office context at the home institution.
    let site_type = site.map(|s| s.site_type).unwrap_or(SiteType::Fpa);
    let host_institution = site
        .map(|s| s.institution_id)
        .unwrap_or(provider.home_institution_id);

    let mut summary =
        ValuationSummary::empty(valuation_id, provider.provider_type, site_type, payer);

    for (activity, cpt) in activities {
        let breakdown = calculate_activity(
            provider.provider_type,
            provider.home_institution_id,
            host_institution,
            site_type,
            payer,
            activity,
            cpt,
            rates,
            &mut summary.missing_rate_count,
            &mut summary.warnings,
        );

        summary.total_rvus += breakdown.earned_rvus;
        summary.total_attributed_rvus += breakdown.attributed_rvus;
        summary.total_professional_revenue += breakdown.earned_professional;
        summary.total_attributed_professional_revenue += breakdown.attributed_professional;
        summary.total_technical_revenue += breakdown.earned_technical;
        summary.total_attributed_technical_revenue += breakdown.attributed_technical;
        summary.total_global_revenue += breakdown.earned_global;
        summary.total_attributed_global_revenue += breakdown.attributed_global;
        summary.activities.push(breakdown);
    }

    summary
}

/// Fetch a valuation and its referenced data, then compute the summary.
pub async fn get_valuation_summary(
    repo: &dyn FullRepository,
    valuation_id: ValuationId,
    payer: PayerType,
) -> RepositoryResult<ValuationSummary> {
    let valuation = repo.get_valuation(valuation_id).await?;
    let provider = repo.get_provider(valuation.provider_id).await?;
    let site = match valuation.site_id {
        Some(site_id) => Some(repo.get_site(site_id).await?),
        None => None,
    };

    let mut codes = Vec::with_capacity(valuation.activities.len());
    let mut joined = Vec::with_capacity(valuation.activities.len());
    for activity in &valuation.activities {
        let cpt = repo.get_cpt_code(&activity.cpt_code).await?;
        codes.push(cpt.code.clone());
        joined.push((activity.clone(), cpt));
    }

    let rates = repo.fetch_rates_for_cpt_codes(&codes).await?;
    let rate_table = RateTable::from_rates(&rates);

    Ok(calculate_valuation(
        valuation.id,
        &provider,
        site.as_ref(),
        payer,
        &joined,
        &rate_table,
    ))
}
