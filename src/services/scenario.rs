//! Scenario engine: payer-mix weighted FPA vs. Article 28 comparison.
//!
//! For every procedure line the engine blends the three payer rates by the
//! scenario's percentage mix, producing a single blended rate per payment
//! component. The Freestanding Office total uses the Global component; the
//! Article 28 total sums the Professional and Technical components. The
//! difference metric is `article28_total - fpa_total`.
//!
//! In calculated rate mode the Medicare technical rate is ground truth:
//! Commercial and Medicaid technical rates are derived from it through the
//! payer multipliers (ratio 100 = 1.00x). Professional and Global rates
//! always come from storage, in both modes.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::api::ScenarioId;
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::models::catalog::{
    CptCode, PayerMultiplier, PayerType, RateComponent, RateTable, SiteType,
};
use crate::models::scenario::{PayerMix, RateMode, Scenario};

/// Per-procedure-line comparison result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioLine {
    pub cpt_code: String,
    pub description: String,
    pub quantity: i32,
    /// Blended Global rate at FPA sites
    pub fpa_rate: Decimal,
    /// Blended Professional rate at Article 28 sites
    pub article28_professional_rate: Decimal,
    /// Blended Technical rate at Article 28 sites
    pub article28_technical_rate: Decimal,
    pub fpa_revenue: Decimal,
    pub article28_revenue: Decimal,
    pub difference: Decimal,
}

/// Scenario calculation result: the FPA vs. Article 28 comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub scenario_id: Option<ScenarioId>,
    pub provider_name: String,
    pub payer_mix: PayerMix,
    pub rate_mode: RateMode,
    pub fpa_total: Decimal,
    pub article28_total: Decimal,
    /// `article28_total - fpa_total`
    pub difference: Decimal,
    /// `difference / fpa_total * 100`, zero when the FPA total is zero
    pub percent_difference: Decimal,
    pub missing_rate_count: usize,
    pub warnings: Vec<String>,
    pub lines: Vec<ScenarioLine>,
}

/// Resolve the rate for one payer and component under the given rate mode.
///
/// Returns `None` when the required stored rate is absent (the Medicare
/// technical base in calculated mode, or the payer's own row otherwise).
#[allow(clippy::too_many_arguments)]
fn resolve_rate(
    rates: &RateTable,
    multipliers: &HashMap<PayerType, PayerMultiplier>,
    mode: RateMode,
    cpt_code: &str,
    site_type: SiteType,
    component: RateComponent,
    payer: PayerType,
    warnings: &mut Vec<String>,
) -> Option<Decimal> {
    let derive = mode == RateMode::Calculated
        && component == RateComponent::Technical
        && payer != PayerType::Medicare;

    if !derive {
        return rates.lookup(cpt_code, payer, site_type, component);
    }

    let medicare_technical = rates.lookup(
        cpt_code,
        PayerType::Medicare,
        site_type,
        RateComponent::Technical,
    )?;
    let factor = match multipliers.get(&payer) {
        Some(multiplier) => multiplier.technical_factor(),
        None => {
            warnings.push(format!(
                "No multiplier for payer {}; using 1.00x for derived technical rates",
                payer.as_str()
            ));
            dec!(1.00)
        }
    };
    Some(medicare_technical * factor)
}

/// Blend one component's rate across the payer mix.
#[allow(clippy::too_many_arguments)]
fn blended_component_rate(
    rates: &RateTable,
    multipliers: &HashMap<PayerType, PayerMultiplier>,
    mode: RateMode,
    mix: &PayerMix,
    cpt_code: &str,
    site_type: SiteType,
    component: RateComponent,
    missing_rate_count: &mut usize,
    warnings: &mut Vec<String>,
) -> Decimal {
    let mut blended = Decimal::ZERO;
    for payer in PayerType::ALL {
        // Payers with a zero share contribute nothing; skip the lookup so
        // their missing rows are not reported.
        if mix.percent(payer) == 0 {
            continue;
        }
        let rate = match resolve_rate(
            rates, multipliers, mode, cpt_code, site_type, component, payer, warnings,
        ) {
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
        };
        blended += rate * mix.weight(payer);
    }
    blended
}

/// Compute the FPA vs. Article 28 comparison for a scenario.
///
/// Pure function over already-loaded data. The scenario's own site type is
/// descriptive only; both sides of the comparison are always produced.
pub fn calculate_scenario(
    scenario: &Scenario,
    cpt_codes: &HashMap<String, CptCode>,
    rates: &RateTable,
    multipliers: &[PayerMultiplier],
) -> ScenarioComparison {
    let multipliers: HashMap<PayerType, PayerMultiplier> = multipliers
        .iter()
        .map(|m| (m.payer_type, m.clone()))
        .collect();

    let mut comparison = ScenarioComparison {
        scenario_id: scenario.id,
        provider_name: scenario.provider_name.clone(),
        payer_mix: scenario.payer_mix,
        rate_mode: scenario.rate_mode,
        fpa_total: Decimal::ZERO,
        article28_total: Decimal::ZERO,
        difference: Decimal::ZERO,
        percent_difference: Decimal::ZERO,
        missing_rate_count: 0,
        warnings: Vec::new(),
        lines: Vec::with_capacity(scenario.procedures.len()),
    };

    for procedure in &scenario.procedures {
        let description = cpt_codes
            .get(&procedure.cpt_code)
            .map(|cpt| cpt.description.clone())
            .unwrap_or_default();
        let quantity = Decimal::from(procedure.quantity);

        let fpa_rate = blended_component_rate(
            rates,
            &multipliers,
            scenario.rate_mode,
            &scenario.payer_mix,
            &procedure.cpt_code,
            SiteType::Fpa,
            RateComponent::Global,
            &mut comparison.missing_rate_count,
            &mut comparison.warnings,
        );
        let professional_rate = blended_component_rate(
            rates,
            &multipliers,
            scenario.rate_mode,
            &scenario.payer_mix,
            &procedure.cpt_code,
            SiteType::Article28,
            RateComponent::Professional,
            &mut comparison.missing_rate_count,
            &mut comparison.warnings,
        );
        let technical_rate = blended_component_rate(
            rates,
            &multipliers,
            scenario.rate_mode,
            &scenario.payer_mix,
            &procedure.cpt_code,
            SiteType::Article28,
            RateComponent::Technical,
            &mut comparison.missing_rate_count,
            &mut comparison.warnings,
        );

        let fpa_revenue = fpa_rate * quantity;
        let article28_revenue = (professional_rate + technical_rate) * quantity;

        comparison.fpa_total += fpa_revenue;
        comparison.article28_total += article28_revenue;
        comparison.lines.push(ScenarioLine {
            cpt_code: procedure.cpt_code.clone(),
            description,
            quantity: procedure.quantity,
            fpa_rate,
            article28_professional_rate: professional_rate,
            article28_technical_rate: technical_rate,
            fpa_revenue,
            article28_revenue,
            difference: article28_revenue - fpa_revenue,
        });
    }

    comparison.difference = comparison.article28_total - comparison.fpa_total;
    comparison.percent_difference = if comparison.fpa_total.is_zero() {
        Decimal::ZERO
    } else {
        comparison.difference / comparison.fpa_total * dec!(100)
    };

    comparison
}

/// Fetch a scenario and its referenced data, then compute the comparison.
pub async fn get_scenario_comparison(
    repo: &dyn FullRepository,
    scenario_id: ScenarioId,
) -> RepositoryResult<ScenarioComparison> {
    let scenario = repo.get_scenario(scenario_id).await?;

    let codes: Vec<String> = scenario
        .procedures
        .iter()
        .map(|p| p.cpt_code.clone())
        .collect();
    let mut cpt_codes = HashMap::with_capacity(codes.len());
    for code in &codes {
        let cpt = repo.get_cpt_code(code).await?;
        cpt_codes.insert(cpt.code.clone(), cpt);
    }

    let rates = repo.fetch_rates_for_cpt_codes(&codes).await?;
    let rate_table = RateTable::from_rates(&rates);
    let multipliers = repo.list_payer_multipliers().await?;

    Ok(calculate_scenario(
        &scenario,
        &cpt_codes,
        &rate_table,
        &multipliers,
    ))
}
