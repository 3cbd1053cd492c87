#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::api::{InstitutionId, ProviderId, SiteId};
    use crate::models::catalog::{
        CptCode, PayerType, ProcedureType, Provider, ProviderType, Rate, RateComponent, RateTable,
        Site, SiteType,
    };
    use crate::models::valuation::ValuationActivity;
    use crate::services::valuation::calculate_valuation;

    const HOME: InstitutionId = InstitutionId(10);
    const HOST: InstitutionId = InstitutionId(20);

    fn cpt(code: &str, work_rvu: Option<Decimal>, procedure_type: ProcedureType) -> CptCode {
        CptCode {
            code: code.to_string(),
            description: format!("test {}", code),
            work_rvu,
            procedure_type,
        }
    }

    fn provider(provider_type: ProviderType) -> Provider {
        Provider {
            id: Some(ProviderId::new(1)),
            name: "Dr. Test".to_string(),
            provider_type,
            home_institution_id: HOME,
        }
    }

    fn host_site(site_type: SiteType) -> Site {
        Site {
            id: Some(SiteId::new(2)),
            name: "Host Site".to_string(),
            site_type,
            institution_id: HOST,
        }
    }

    fn activity(code: &str, orders: i32, reads: i32, performs: i32) -> ValuationActivity {
        ValuationActivity {
            cpt_code: code.to_string(),
            monthly_orders: orders,
            monthly_reads: reads,
            monthly_performs: performs,
        }
    }

    fn rate(code: &str, site_type: SiteType, component: RateComponent, cents: i64) -> Rate {
        Rate {
            id: None,
            cpt_code: code.to_string(),
            payer_type: PayerType::Medicare,
            site_type,
            component,
            amount_cents: cents,
        }
    }

    #[test]
    fn test_visit_rvus_from_performs() {
        // 99213 at 0.97 work RVUs, 50 performs -> 48.5 RVUs
        let cpt_99213 = cpt("99213", Some(dec!(0.97)), ProcedureType::Visit);
        let activities = vec![(activity("99213", 0, 0, 50), cpt_99213)];
        let rates = RateTable::from_rates(&[]);

        let summary = calculate_valuation(
            None,
            &provider(ProviderType::Type1),
            None,
            PayerType::Medicare,
            &activities,
            &rates,
        );

        assert_eq!(summary.total_rvus, dec!(48.50));
        assert_eq!(summary.total_attributed_rvus, dec!(48.50));
        assert_eq!(summary.activities.len(), 1);
    }

    #[test]
    fn test_zero_quantities_contribute_nothing() {
        let code = cpt("99213", Some(dec!(0.97)), ProcedureType::Visit);
        let activities = vec![(activity("99213", 0, 0, 0), code)];
        let rates = RateTable::from_rates(&[rate(
            "99213",
            SiteType::Fpa,
            RateComponent::Global,
            8000,
        )]);

        let summary = calculate_valuation(
            None,
            &provider(ProviderType::Type1),
            None,
            PayerType::Medicare,
            &activities,
            &rates,
        );

        assert_eq!(summary.total_rvus, Decimal::ZERO);
        assert_eq!(summary.total_global_revenue, Decimal::ZERO);
        assert_eq!(summary.total_professional_revenue, Decimal::ZERO);
        assert_eq!(summary.total_technical_revenue, Decimal::ZERO);
    }

    #[test]
    fn test_no_activities_yields_zero_totals() {
        let rates = RateTable::from_rates(&[]);
        let summary = calculate_valuation(
            None,
            &provider(ProviderType::Type1),
            None,
            PayerType::Medicare,
            &[],
            &rates,
        );

        assert_eq!(summary.total_rvus, Decimal::ZERO);
        assert_eq!(summary.total_attributed_professional_revenue, Decimal::ZERO);
        assert!(summary.activities.is_empty());
        assert_eq!(summary.missing_rate_count, 0);
    }

    #[test]
    fn test_missing_rate_is_zero_and_counted() {
        let code = cpt("70450", Some(dec!(0.85)), ProcedureType::Imaging);
        let activities = vec![(activity("70450", 10, 10, 0), code)];
        // Professional rate present, technical missing
        let rates = RateTable::from_rates(&[rate(
            "70450",
            SiteType::Article28,
            RateComponent::Professional,
            4000,
        )]);

        let summary = calculate_valuation(
            None,
            &provider(ProviderType::Type1),
            Some(&host_site(SiteType::Article28)),
            PayerType::Medicare,
            &activities,
            &rates,
        );

        assert_eq!(summary.total_professional_revenue, dec!(400.00));
        assert_eq!(summary.total_technical_revenue, Decimal::ZERO);
        assert_eq!(summary.missing_rate_count, 1);
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("technical"));
        // RVUs are unaffected by missing rates
        assert_eq!(summary.total_rvus, dec!(8.50));
    }

    #[test]
    fn test_type2_imaging_orders_reads_split() {
        // Visiting provider reads 25 of 30 ordered studies at an Article 28
        // host: earned professional follows the reads, attributed follows
        // the orders and books to the home institution, technical books to
        // the host.
        let code = cpt("70450", Some(dec!(1.00)), ProcedureType::Imaging);
        let activities = vec![(activity("70450", 30, 25, 0), code)];
        let rates = RateTable::from_rates(&[
            rate("70450", SiteType::Article28, RateComponent::Professional, 4000),
            rate("70450", SiteType::Article28, RateComponent::Technical, 11000),
        ]);

        let summary = calculate_valuation(
            None,
            &provider(ProviderType::Type2),
            Some(&host_site(SiteType::Article28)),
            PayerType::Medicare,
            &activities,
            &rates,
        );

        assert_eq!(summary.total_professional_revenue, dec!(1000.00)); // 25 * 40
        assert_eq!(summary.total_attributed_professional_revenue, dec!(1200.00)); // 30 * 40
        assert_eq!(summary.total_technical_revenue, Decimal::ZERO);
        assert_eq!(summary.total_attributed_technical_revenue, dec!(3300.00)); // 30 * 110
        assert_eq!(summary.total_rvus, dec!(25.00));
        assert_eq!(summary.total_attributed_rvus, dec!(30.00));

        let line = &summary.activities[0];
        assert_eq!(line.professional_recipient, Some(HOME));
        assert_eq!(line.facility_recipient, Some(HOST));
    }

    #[test]
    fn test_type1_orders_equal_reads_earned_equals_attributed() {
        let code = cpt("70450", Some(dec!(1.00)), ProcedureType::Imaging);
        let activities = vec![(activity("70450", 20, 20, 0), code)];
        let rates = RateTable::from_rates(&[
            rate("70450", SiteType::Article28, RateComponent::Professional, 4000),
            rate("70450", SiteType::Article28, RateComponent::Technical, 11000),
        ]);

        let summary = calculate_valuation(
            None,
            &provider(ProviderType::Type1),
            Some(&host_site(SiteType::Article28)),
            PayerType::Medicare,
            &activities,
            &rates,
        );

        assert_eq!(
            summary.total_professional_revenue,
            summary.total_attributed_professional_revenue
        );
        assert_eq!(
            summary.total_technical_revenue,
            summary.total_attributed_technical_revenue
        );
        assert_eq!(summary.total_rvus, summary.total_attributed_rvus);

        // Type1 books everything at home, even when hosted elsewhere
        let line = &summary.activities[0];
        assert_eq!(line.professional_recipient, Some(HOME));
        assert_eq!(line.facility_recipient, Some(HOME));
    }

    #[test]
    fn test_type3_earns_nothing() {
        let code = cpt("70450", Some(dec!(1.00)), ProcedureType::Imaging);
        // Referring provider orders 30 studies, reads none
        let activities = vec![(activity("70450", 30, 0, 0), code)];
        let rates = RateTable::from_rates(&[
            rate("70450", SiteType::Article28, RateComponent::Professional, 4000),
            rate("70450", SiteType::Article28, RateComponent::Technical, 11000),
        ]);

        let summary = calculate_valuation(
            None,
            &provider(ProviderType::Type3),
            Some(&host_site(SiteType::Article28)),
            PayerType::Medicare,
            &activities,
            &rates,
        );

        assert_eq!(summary.total_rvus, Decimal::ZERO);
        assert_eq!(summary.total_attributed_rvus, Decimal::ZERO);
        assert_eq!(summary.total_professional_revenue, Decimal::ZERO);
        assert_eq!(summary.total_attributed_professional_revenue, Decimal::ZERO);
        assert_eq!(summary.total_attributed_technical_revenue, dec!(3300.00));

        let line = &summary.activities[0];
        assert_eq!(line.professional_recipient, None);
        assert_eq!(line.facility_recipient, Some(HOST));
    }

    #[test]
    fn test_fpa_site_uses_global_component_only() {
        let code = cpt("99213", Some(dec!(0.97)), ProcedureType::Visit);
        let activities = vec![(activity("99213", 0, 0, 1), code)];
        let rates = RateTable::from_rates(&[
            rate("99213", SiteType::Fpa, RateComponent::Global, 8000),
            // Article 28 rows must not leak into an FPA calculation
            rate("99213", SiteType::Article28, RateComponent::Professional, 4000),
        ]);

        let summary = calculate_valuation(
            None,
            &provider(ProviderType::Type1),
            None,
            PayerType::Medicare,
            &activities,
            &rates,
        );

        assert_eq!(summary.site_type, SiteType::Fpa);
        assert_eq!(summary.total_global_revenue, dec!(80.00));
        assert_eq!(summary.total_attributed_global_revenue, dec!(80.00));
        assert_eq!(summary.total_professional_revenue, Decimal::ZERO);
        assert_eq!(summary.missing_rate_count, 0);
    }

    #[test]
    fn test_unset_work_rvu_counts_as_zero() {
        let code = cpt("99213", None, ProcedureType::Visit);
        let activities = vec![(activity("99213", 0, 0, 50), code)];
        let rates = RateTable::from_rates(&[rate(
            "99213",
            SiteType::Fpa,
            RateComponent::Global,
            8000,
        )]);

        let summary = calculate_valuation(
            None,
            &provider(ProviderType::Type1),
            None,
            PayerType::Medicare,
            &activities,
            &rates,
        );

        assert_eq!(summary.total_rvus, Decimal::ZERO);
        // Revenue is still payable even without an RVU weight
        assert_eq!(summary.total_global_revenue, dec!(4000.00));
    }

    #[test]
    fn test_calculation_is_deterministic() {
        let code = cpt("70450", Some(dec!(0.85)), ProcedureType::Imaging);
        let activities = vec![(activity("70450", 30, 25, 0), code)];
        let rates = RateTable::from_rates(&[
            rate("70450", SiteType::Article28, RateComponent::Professional, 4000),
            rate("70450", SiteType::Article28, RateComponent::Technical, 11000),
        ]);
        let site = host_site(SiteType::Article28);
        let doc = provider(ProviderType::Type2);

        let first = calculate_valuation(
            None,
            &doc,
            Some(&site),
            PayerType::Medicare,
            &activities,
            &rates,
        );
        let second = calculate_valuation(
            None,
            &doc,
            Some(&site),
            PayerType::Medicare,
            &activities,
            &rates,
        );

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
