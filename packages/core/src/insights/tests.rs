//! Cross-module tests for the insights pipeline
//!
//! Property-based checks on the statistics primitives, detector, trend
//! analyzer, forecaster and story assembly, plus a few worked examples
//! that pin exact numbers.

#[cfg(test)]
mod tests {
    use crate::insights::{
        calculator::{expected_value, index_regression, linear_regression, mean, std_dev, z_score},
        config::{AnomalyConfig, ForecastConfig, TrendConfig},
        detector::AnomalyDetector,
        engine::{importance_from_change, InsightGenerator},
        forecast::{FixedJitter, Forecaster},
        personalization::{personalize_insights, InsightRanking},
        trend::{TrendAnalyzer, REGISTRATIONS, REVENUE},
        types::*,
    };
    use chrono::{Datelike, Days, Duration, NaiveDate, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn day(offset: usize) -> NaiveDate {
        start().checked_add_days(Days::new(offset as u64)).unwrap()
    }

    fn series(values: &[f64]) -> Vec<MetricPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricPoint::new(day(i), *v))
            .collect()
    }

    // Test data generators
    fn revenue_strategy() -> impl Strategy<Value = Vec<CasinoRevenueItem>> {
        prop::collection::vec(0.0f64..50_000.0, 0..30).prop_map(|values| {
            values
                .into_iter()
                .enumerate()
                .map(|(i, revenue)| CasinoRevenueItem { date: day(i), revenue })
                .collect()
        })
    }

    fn registration_strategy() -> impl Strategy<Value = Vec<PlayerRegistrationItem>> {
        prop::collection::vec((0u32..500, 0u32..200), 0..30).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (registrations, ftd))| PlayerRegistrationItem {
                    date: day(i),
                    registrations,
                    first_time_depositors: ftd.min(registrations),
                })
                .collect()
        })
    }

    fn games_strategy() -> impl Strategy<Value = Vec<TopGameItem>> {
        prop::collection::vec(
            (
                "[A-Z][a-z]{2,8}",
                prop::sample::select(vec!["NetEnt", "Evolution", "Pragmatic"]),
                prop::sample::select(vec!["Slots", "Table", "Live"]),
                0.0f64..20_000.0,
            ),
            0..12,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .map(|(name, provider, game_type, revenue)| TopGameItem {
                    game_name: name,
                    provider: provider.to_string(),
                    game_type: game_type.to_string(),
                    revenue,
                })
                .collect()
        })
    }

    fn transactions_strategy() -> impl Strategy<Value = Vec<RecentTransactionItem>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["Deposit", "Withdrawal", "Bonus"]),
                1.0f64..5_000.0,
                prop::sample::select(vec!["Completed", "Pending", "Failed"]),
                prop::sample::select(vec!["Web", "Mobile", "Desktop"]),
            ),
            0..40,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (kind, amount, status, platform))| RecentTransactionItem {
                    transaction_id: format!("tx-{}", i),
                    transaction_date: Utc::now() - Duration::minutes(i as i64),
                    transaction_type: kind.to_string(),
                    amount,
                    status: status.to_string(),
                    platform: platform.to_string(),
                })
                .collect()
        })
    }

    fn dashboard_strategy() -> impl Strategy<Value = DashboardData> {
        (
            (0.0f64..100_000.0, -100.0f64..100.0, 0u32..1_000, -100.0f64..100.0),
            (0u32..300, -100.0f64..100.0, 0.0f64..50_000.0, 0.0f64..50_000.0),
            revenue_strategy(),
            registration_strategy(),
            games_strategy(),
            transactions_strategy(),
        )
            .prop_map(
                |(
                    (revenue, revenue_change, registrations, registrations_change),
                    (ftd, ftd_change, deposits, cashouts),
                    casino_revenue,
                    player_registrations,
                    top_games,
                    recent_transactions,
                )| DashboardData {
                    summary: DashboardSummary {
                        date: start(),
                        revenue,
                        revenue_change,
                        registrations,
                        registrations_change,
                        ftd,
                        ftd_change,
                        deposits,
                        cashouts,
                    },
                    casino_revenue,
                    player_registrations,
                    top_games,
                    recent_transactions,
                },
            )
    }

    // =============================================================================
    // WORKED EXAMPLES
    // =============================================================================

    #[test]
    fn regression_on_unit_line() {
        let (slope, intercept) = linear_regression(&[0.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 4.0]);
        assert!((slope - 1.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn revenue_example_flags_the_spike() {
        let values = [100.0, 102.0, 98.0, 101.0, 99.0, 250.0, 103.0];
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        assert_eq!(detector.detect(&values, 2.0), vec![5]);

        let expected = expected_value(&values, 5, 3);
        assert!((expected - 100.25).abs() < 1e-9);

        let revenue: Vec<CasinoRevenueItem> = values
            .iter()
            .enumerate()
            .map(|(i, r)| CasinoRevenueItem { date: day(i), revenue: *r })
            .collect();
        let anomalies = detector.detect_revenue_anomalies(&revenue);
        assert_eq!(anomalies.len(), 1);
        assert!((anomalies[0].deviation_percentage - 149.376).abs() < 0.01);
        assert_eq!(anomalies[0].severity, 5);
    }

    #[test]
    fn weekday_weekend_alternation_is_seasonal() {
        let values: Vec<f64> = (0..21)
            .map(|i| if day(i).weekday().number_from_monday() >= 6 { 200.0 } else { 100.0 })
            .collect();
        let result = TrendAnalyzer::new(TrendConfig::default()).analyze_series(
            &series(&values),
            REVENUE,
            TrendAnalysisOptions::default(),
        );

        assert!(result.seasonality_detected);
        assert_eq!(result.seasonal_cycle_days, Some(7));
    }

    #[test]
    fn seven_rising_registrations_form_one_run() {
        let values = [100.0, 104.0, 109.0, 111.0, 115.0, 118.0, 125.0];
        let result = TrendAnalyzer::new(TrendConfig::default()).analyze_series(
            &series(&values),
            REGISTRATIONS,
            TrendAnalysisOptions::default(),
        );

        let runs: Vec<&TrendPattern> = result
            .identified_patterns
            .iter()
            .filter(|p| p.pattern_type == PatternType::ConsistentIncrease)
            .collect();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].is_significant);
        assert_eq!(result.trend_direction, TrendDirection::Increasing);
    }

    // =============================================================================
    // PROPERTY TESTS
    // =============================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_short_series_never_flag_anomalies(
            values in prop::collection::vec(-1e6f64..1e6, 0..3),
            threshold in 0.0f64..5.0,
        ) {
            let detector = AnomalyDetector::default();
            prop_assert!(detector.detect(&values, threshold).is_empty());
        }

        #[test]
        fn prop_constant_series_never_flag_anomalies(
            value in -1_000i32..1_000,
            len in 3usize..60,
            threshold in 0.01f64..10.0,
        ) {
            let values = vec![f64::from(value); len];
            let detector = AnomalyDetector::default();
            prop_assert!(detector.detect(&values, threshold).is_empty());
        }

        #[test]
        fn prop_z_score_is_antisymmetric(
            centre in -1e4f64..1e4,
            offset in 0.0f64..1e4,
            sigma in 0.001f64..1e3,
        ) {
            let above = z_score(centre + offset, centre, sigma);
            let below = z_score(centre - offset, centre, sigma);
            prop_assert!((above + below).abs() < 1e-6);
        }

        #[test]
        fn prop_regression_recovers_exact_lines(
            slope in -100.0f64..100.0,
            intercept in -1_000.0f64..1_000.0,
            len in 2usize..40,
        ) {
            let values: Vec<f64> = (0..len).map(|i| intercept + slope * i as f64).collect();
            let (fitted_slope, fitted_intercept) = index_regression(&values);
            prop_assert!((fitted_slope - slope).abs() < 1e-6);
            prop_assert!((fitted_intercept - intercept).abs() < 1e-6);
        }

        #[test]
        fn prop_std_dev_is_non_negative(values in prop::collection::vec(-1e6f64..1e6, 0..50)) {
            let sigma = std_dev(&values);
            prop_assert!(sigma >= 0.0);
            if values.is_empty() {
                prop_assert_eq!(mean(&values), 0.0);
            }
        }

        #[test]
        fn prop_forecast_band_widens_with_horizon(
            values in prop::collection::vec(1.0f64..10_000.0, 7..40),
            days in 2u32..30,
            jitter in -0.05f64..0.05,
        ) {
            let history: Vec<DataPoint> = values
                .iter()
                .enumerate()
                .map(|(i, v)| DataPoint::single(day(i), "Revenue", *v))
                .collect();
            let forecaster = Forecaster::with_jitter(ForecastConfig::default(), Arc::new(FixedJitter(jitter)));

            let forecast = forecaster.generate_forecast("Revenue", &history, days);

            prop_assert_eq!(forecast.len(), days as usize);
            for pair in forecast.windows(2) {
                prop_assert!(pair[1].confidence_interval < pair[0].confidence_interval);
                prop_assert!(pair[1].interval_width() > pair[0].interval_width());
                prop_assert!(pair[1].point.timestamp > pair[0].point.timestamp);
            }
        }

        #[test]
        fn prop_trend_direction_respects_stable_band(change in -200.0f64..200.0) {
            let analyzer = TrendAnalyzer::new(TrendConfig::default());
            let direction = analyzer.direction(change);
            if change > 5.0 {
                prop_assert_eq!(direction, TrendDirection::Increasing);
            } else if change < -5.0 {
                prop_assert_eq!(direction, TrendDirection::Decreasing);
            } else {
                prop_assert_eq!(direction, TrendDirection::Stable);
            }
        }

        #[test]
        fn prop_importance_stays_between_bounds(change in -500.0f64..500.0, low in 1u8..5, spread in 1u8..6) {
            let high = low + spread;
            let importance = importance_from_change(change, high, low);
            prop_assert!(importance >= low && importance <= high);
        }

        #[test]
        fn prop_story_respects_caps(data in dashboard_strategy()) {
            let story = InsightGenerator::default().dashboard_story(&data);

            prop_assert!(story.key_insights.len() <= 5);
            prop_assert!(story.recommended_actions.len() <= 3);
            prop_assert!(story.key_insights.windows(2).all(|w| w[0].importance >= w[1].importance));
            prop_assert!(story.key_insights.iter().all(|i| (1..=10).contains(&i.importance)));
        }

        #[test]
        fn prop_personalization_filters_and_caps(
            data in dashboard_strategy(),
            threshold in 1u8..10,
            rank in 0u32..30,
        ) {
            let insights = InsightGenerator::default().summary_insights(&data.summary);
            let ranks: BTreeMap<String, u32> = ["Revenue", "Registrations", "FTD"]
                .iter()
                .map(|k| (k.to_string(), rank))
                .collect();
            let ranking = InsightRanking::new(threshold, ranks);

            let personalized = personalize_insights(insights.clone(), &ranking);

            prop_assert!(personalized.len() <= insights.len());
            prop_assert!(personalized.iter().all(|i| i.importance >= threshold && i.importance <= 10));
            prop_assert!(personalized.windows(2).all(|w| w[0].importance >= w[1].importance));
        }
    }
}
