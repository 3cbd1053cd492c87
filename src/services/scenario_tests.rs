#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::models::catalog::{
        CptCode, PayerMultiplier, PayerType, ProcedureType, Rate, RateComponent, RateTable,
        SiteType,
    };
    use crate::models::scenario::{PayerMix, RateMode, Scenario, ScenarioProcedure};
    use crate::services::scenario::calculate_scenario;

    fn rate(code: &str, payer: PayerType, site: SiteType, component: RateComponent, cents: i64) -> Rate {
        Rate {
            id: None,
            cpt_code: code.to_string(),
            payer_type: payer,
            site_type: site,
            component,
            amount_cents: cents,
        }
    }

    fn cpt_map(codes: &[&str]) -> HashMap<String, CptCode> {
        codes
            .iter()
            .map(|code| {
                (
                    code.to_string(),
                    CptCode {
                        code: code.to_string(),
                        description: format!("test {}", code),
                        work_rvu: Some(dec!(1.00)),
                        procedure_type: ProcedureType::Procedure,
                    },
                )
            })
            .collect()
    }

    fn scenario(
        mix: PayerMix,
        rate_mode: RateMode,
        procedures: Vec<ScenarioProcedure>,
    ) -> Scenario {
        Scenario {
            id: None,
            provider_name: "Dr. Test".to_string(),
            monthly_patients: 100,
            payer_mix: mix,
            site_type: SiteType::Fpa,
            rate_mode,
            created_at: Utc::now(),
            procedures,
        }
    }

    fn line(code: &str, quantity: i32) -> ScenarioProcedure {
        ScenarioProcedure {
            cpt_code: code.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_blended_global_rate_40_40_20() {
        // Medicare $80, Commercial $134, Medicaid $98 at 40/40/20
        // -> 80*0.4 + 134*0.4 + 98*0.2 = 105.20
        let rates = RateTable::from_rates(&[
            rate("99213", PayerType::Medicare, SiteType::Fpa, RateComponent::Global, 8000),
            rate("99213", PayerType::Commercial, SiteType::Fpa, RateComponent::Global, 13400),
            rate("99213", PayerType::Medicaid, SiteType::Fpa, RateComponent::Global, 9800),
        ]);
        let s = scenario(
            PayerMix::new(40, 40, 20),
            RateMode::Manual,
            vec![line("99213", 1)],
        );

        let comparison = calculate_scenario(&s, &cpt_map(&["99213"]), &rates, &[]);

        assert_eq!(comparison.lines.len(), 1);
        assert_eq!(comparison.lines[0].fpa_rate, dec!(105.20));
        assert_eq!(comparison.lines[0].fpa_revenue, dec!(105.20));
        assert_eq!(comparison.fpa_total, dec!(105.20));
    }

    #[test]
    fn test_article28_sums_professional_and_technical() {
        let rates = RateTable::from_rates(&[
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Professional, 4000),
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 11000),
            rate("70450", PayerType::Medicare, SiteType::Fpa, RateComponent::Global, 12000),
        ]);
        let s = scenario(
            PayerMix::new(100, 0, 0),
            RateMode::Manual,
            vec![line("70450", 10)],
        );

        let comparison = calculate_scenario(&s, &cpt_map(&["70450"]), &rates, &[]);

        assert_eq!(comparison.fpa_total, dec!(1200.00));
        assert_eq!(comparison.article28_total, dec!(1500.00)); // (40 + 110) * 10
        assert_eq!(comparison.difference, dec!(300.00));
        assert_eq!(comparison.percent_difference, dec!(25.00));
    }

    #[test]
    fn test_percent_difference_zero_when_fpa_total_zero() {
        // Only Article 28 rates exist; the FPA side blends to zero
        let rates = RateTable::from_rates(&[
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Professional, 4000),
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 11000),
        ]);
        let s = scenario(
            PayerMix::new(100, 0, 0),
            RateMode::Manual,
            vec![line("70450", 1)],
        );

        let comparison = calculate_scenario(&s, &cpt_map(&["70450"]), &rates, &[]);

        assert_eq!(comparison.fpa_total, Decimal::ZERO);
        assert_eq!(comparison.percent_difference, Decimal::ZERO);
        assert!(comparison.missing_rate_count > 0);
    }

    #[test]
    fn test_calculated_mode_derives_technical_from_medicare() {
        // Commercial technical = Medicare technical * 1.45; the stored
        // commercial technical row must be ignored in calculated mode.
        let rates = RateTable::from_rates(&[
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 10000),
            rate("70450", PayerType::Commercial, SiteType::Article28, RateComponent::Technical, 99900),
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Professional, 4000),
            rate("70450", PayerType::Commercial, SiteType::Article28, RateComponent::Professional, 6000),
        ]);
        let multipliers = vec![PayerMultiplier {
            payer_type: PayerType::Commercial,
            professional_ratio: 120,
            technical_ratio: 145,
            global_ratio: 100,
        }];
        let s = scenario(
            PayerMix::new(0, 100, 0),
            RateMode::Calculated,
            vec![line("70450", 1)],
        );

        let comparison = calculate_scenario(&s, &cpt_map(&["70450"]), &rates, &multipliers);

        // Professional stays stored ($60); technical = $100 * 1.45 = $145
        assert_eq!(comparison.lines[0].article28_professional_rate, dec!(60.00));
        assert_eq!(comparison.lines[0].article28_technical_rate, dec!(145.00));
    }

    #[test]
    fn test_manual_mode_uses_stored_technical() {
        let rates = RateTable::from_rates(&[
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 10000),
            rate("70450", PayerType::Commercial, SiteType::Article28, RateComponent::Technical, 16000),
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Professional, 4000),
            rate("70450", PayerType::Commercial, SiteType::Article28, RateComponent::Professional, 6000),
        ]);
        let s = scenario(
            PayerMix::new(0, 100, 0),
            RateMode::Manual,
            vec![line("70450", 1)],
        );

        let comparison = calculate_scenario(&s, &cpt_map(&["70450"]), &rates, &[]);

        assert_eq!(comparison.lines[0].article28_technical_rate, dec!(160.00));
    }

    #[test]
    fn test_calculated_mode_missing_multiplier_falls_back_to_identity() {
        let rates = RateTable::from_rates(&[
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 10000),
            rate("70450", PayerType::Medicaid, SiteType::Article28, RateComponent::Professional, 3000),
        ]);
        let s = scenario(
            PayerMix::new(0, 0, 100),
            RateMode::Calculated,
            vec![line("70450", 1)],
        );

        let comparison = calculate_scenario(&s, &cpt_map(&["70450"]), &rates, &[]);

        // Derived medicaid technical = medicare technical * 1.00
        assert_eq!(comparison.lines[0].article28_technical_rate, dec!(100.00));
        assert!(comparison
            .warnings
            .iter()
            .any(|w| w.contains("multiplier")));
    }

    #[test]
    fn test_zero_share_payers_do_not_report_missing_rates() {
        // Only Medicare rates exist, but commercial/medicaid have 0% share,
        // so nothing is missing.
        let rates = RateTable::from_rates(&[
            rate("99213", PayerType::Medicare, SiteType::Fpa, RateComponent::Global, 8000),
            rate("99213", PayerType::Medicare, SiteType::Article28, RateComponent::Professional, 4000),
            rate("99213", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 2000),
        ]);
        let s = scenario(
            PayerMix::new(100, 0, 0),
            RateMode::Manual,
            vec![line("99213", 5)],
        );

        let comparison = calculate_scenario(&s, &cpt_map(&["99213"]), &rates, &[]);

        assert_eq!(comparison.missing_rate_count, 0);
        assert!(comparison.warnings.is_empty());
    }

    #[test]
    fn test_totals_accumulate_across_lines() {
        let rates = RateTable::from_rates(&[
            rate("99213", PayerType::Medicare, SiteType::Fpa, RateComponent::Global, 8000),
            rate("99213", PayerType::Medicare, SiteType::Article28, RateComponent::Professional, 4000),
            rate("99213", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 2000),
            rate("70450", PayerType::Medicare, SiteType::Fpa, RateComponent::Global, 12000),
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Professional, 4000),
            rate("70450", PayerType::Medicare, SiteType::Article28, RateComponent::Technical, 11000),
        ]);
        let s = scenario(
            PayerMix::new(100, 0, 0),
            RateMode::Manual,
            vec![line("99213", 2), line("70450", 3)],
        );

        let comparison = calculate_scenario(&s, &cpt_map(&["99213", "70450"]), &rates, &[]);

        // FPA: 80*2 + 120*3 = 520; A28: 60*2 + 150*3 = 570
        assert_eq!(comparison.fpa_total, dec!(520.00));
        assert_eq!(comparison.article28_total, dec!(570.00));
        assert_eq!(comparison.difference, dec!(50.00));
        assert_eq!(comparison.lines.len(), 2);
    }
}
