//! Anomaly Detection
//!
//! Flags points whose z-score against the whole series exceeds a threshold
//! and turns them into [`DataAnomaly`] records for each dashboard domain.
//! Every public method is fail-soft: invalid input yields an empty list.

use chrono::{NaiveDate, Utc};

use crate::insights::{
    calculator::{expected_value, mean, percentage_change, std_dev, z_score},
    config::AnomalyConfig,
    error::{ensure_finite, safely, InsightsError},
    format,
    types::*,
};

/// Indices of `values` whose |z-score| is strictly greater than `threshold`.
///
/// Series shorter than `min_points` and constant series produce no indices.
pub fn z_score_outliers(values: &[f64], threshold: f64, min_points: usize) -> Vec<usize> {
    if values.len() < min_points {
        return Vec::new();
    }
    let avg = mean(values);
    let sd = std_dev(values);

    values
        .iter()
        .enumerate()
        .filter(|(_, v)| z_score(**v, avg, sd).abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Templated explanation of why a metric moved in the given direction
pub fn potential_cause(metric_key: &str, deviation_percentage: f64) -> String {
    let cause = if deviation_percentage >= 0.0 {
        match metric_key {
            "Revenue" => "Possible causes include successful promotions, new game releases, or increased player activity.",
            "Registrations" => "Possible causes include successful marketing campaigns, promotions, or seasonal effects.",
            "FTD" => "Possible causes include effective welcome bonuses, improved onboarding, or targeted promotions.",
            _ => "Investigating potential causes for this positive change.",
        }
    } else {
        match metric_key {
            "Revenue" => "Possible causes include technical issues, decreased player activity, or competitive pressures.",
            "Registrations" => "Possible causes include marketing issues, website problems, or seasonal effects.",
            "FTD" => "Possible causes include payment processing issues, onboarding problems, or less attractive welcome offers.",
            _ => "Investigating potential causes for this negative change.",
        }
    };
    cause.to_string()
}

fn higher_or_lower(deviation_percentage: f64) -> &'static str {
    if deviation_percentage >= 0.0 {
        "higher"
    } else {
        "lower"
    }
}

/// Static text describing one metric series for anomaly records
struct SeriesLabels<'a> {
    title: &'a str,
    noun: &'a str,
    category: &'a str,
    metric_key: &'a str,
    actions: [&'a str; 2],
    money: bool,
}

/// Anomaly detector for dashboard data
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Public z-score contract: flagged indices for `values` at `threshold`.
    pub fn detect(&self, values: &[f64], threshold: f64) -> Vec<usize> {
        safely(
            "detect",
            || {
                ensure_finite(values, "detect")?;
                Ok(z_score_outliers(values, threshold, self.config.min_points))
            },
            Vec::new,
        )
    }

    /// Detect anomalies in daily revenue
    pub fn detect_revenue_anomalies(&self, revenue: &[CasinoRevenueItem]) -> Vec<DataAnomaly> {
        safely(
            "detect_revenue_anomalies",
            || {
                let points: Vec<MetricPoint> = revenue
                    .iter()
                    .map(|r| MetricPoint::new(r.date, r.revenue))
                    .collect();
                self.series_anomalies(
                    &points,
                    &SeriesLabels {
                        title: "Revenue",
                        noun: "Revenue",
                        category: "Revenue",
                        metric_key: "Revenue",
                        actions: ["Monitor for continued pattern", "Review recent promotions"],
                        money: true,
                    },
                )
            },
            Vec::new,
        )
    }

    /// Detect anomalies in daily registrations and first-time depositors
    pub fn detect_registration_anomalies(
        &self,
        registrations: &[PlayerRegistrationItem],
    ) -> Vec<DataAnomaly> {
        safely(
            "detect_registration_anomalies",
            || {
                let reg_points: Vec<MetricPoint> = registrations
                    .iter()
                    .map(|r| MetricPoint::new(r.date, f64::from(r.registrations)))
                    .collect();
                let ftd_points: Vec<MetricPoint> = registrations
                    .iter()
                    .map(|r| MetricPoint::new(r.date, f64::from(r.first_time_depositors)))
                    .collect();

                let mut anomalies = self.series_anomalies(
                    &reg_points,
                    &SeriesLabels {
                        title: "Registration",
                        noun: "Registrations",
                        category: "Registration",
                        metric_key: "Registrations",
                        actions: ["Review marketing campaigns", "Check registration process"],
                        money: false,
                    },
                )?;
                anomalies.extend(self.series_anomalies(
                    &ftd_points,
                    &SeriesLabels {
                        title: "First Time Depositor",
                        noun: "First time depositors",
                        category: "Registration",
                        metric_key: "FTD",
                        actions: ["Review deposit bonuses", "Check payment processing"],
                        money: false,
                    },
                )?);
                Ok(anomalies)
            },
            Vec::new,
        )
    }

    /// Detect games whose revenue is far from the average of the list.
    ///
    /// The expected value is the overall mean, not a neighbour window, since
    /// the list has no time order.
    pub fn detect_game_performance_anomalies(&self, games: &[TopGameItem]) -> Vec<DataAnomaly> {
        safely(
            "detect_game_performance_anomalies",
            || {
                let revenues: Vec<f64> = games.iter().map(|g| g.revenue).collect();
                ensure_finite(&revenues, "detect_game_performance_anomalies")?;

                let flagged =
                    z_score_outliers(&revenues, self.config.z_threshold, self.config.min_points);
                let avg = mean(&revenues);
                let today = Utc::now().date_naive();

                Ok(flagged
                    .into_iter()
                    .map(|i| {
                        let game = &games[i];
                        let deviation = percentage_change(avg, game.revenue);
                        let (cause, action) = if deviation > 0.0 {
                            (
                                format!("{} is performing exceptionally well.", game.game_name),
                                "Consider featuring it more prominently.",
                            )
                        } else {
                            (
                                format!("{} is underperforming.", game.game_name),
                                "Check for technical issues or player feedback.",
                            )
                        };

                        DataAnomaly {
                            title: format!("Unusual Performance: {}", game.game_name),
                            description: format!(
                                "{} has {:.1}% {} revenue than average.",
                                game.game_name,
                                deviation.abs(),
                                higher_or_lower(deviation)
                            ),
                            category: "Game".to_string(),
                            metric_key: "GameRevenue".to_string(),
                            detected_at: Utc::now(),
                            date: today,
                            actual_value: game.revenue,
                            expected_value: avg,
                            deviation_percentage: deviation,
                            severity: self.config.game_severity.classify(deviation),
                            possible_causes: vec![cause],
                            recommended_actions: vec![action.to_string()],
                        }
                    })
                    .collect())
            },
            Vec::new,
        )
    }

    /// Detect unusual transaction amounts and an elevated failure rate
    pub fn detect_transaction_anomalies(
        &self,
        transactions: &[RecentTransactionItem],
    ) -> Vec<DataAnomaly> {
        safely(
            "detect_transaction_anomalies",
            || {
                if transactions.len() < self.config.min_points {
                    return Ok(Vec::new());
                }

                let amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();
                ensure_finite(&amounts, "detect_transaction_anomalies")?;

                let avg = mean(&amounts);
                let mut anomalies: Vec<DataAnomaly> = z_score_outliers(
                    &amounts,
                    self.config.transaction_z_threshold,
                    self.config.min_points,
                )
                .into_iter()
                .map(|i| {
                    let tx = &transactions[i];
                    let deviation = percentage_change(avg, tx.amount);
                    DataAnomaly {
                        title: "Unusual Transaction Amount".to_string(),
                        description: format!(
                            "Transaction {} has an amount of {}, which is {:.1}% {} than average.",
                            tx.transaction_id,
                            format::currency(tx.amount),
                            deviation.abs(),
                            higher_or_lower(deviation)
                        ),
                        category: "Transaction".to_string(),
                        metric_key: "TransactionAmount".to_string(),
                        detected_at: Utc::now(),
                        date: tx.transaction_date.date_naive(),
                        actual_value: tx.amount,
                        expected_value: avg,
                        deviation_percentage: deviation,
                        severity: self.config.transaction_severity.classify(deviation),
                        possible_causes: vec![format!(
                            "Unusual {} amount detected.",
                            tx.transaction_type.to_lowercase()
                        )],
                        recommended_actions: vec![
                            "Review transaction details".to_string(),
                            "Check for potential fraud".to_string(),
                        ],
                    }
                })
                .collect();

                let failed = transactions
                    .iter()
                    .filter(|t| t.status.eq_ignore_ascii_case("Failed"))
                    .count();
                let failed_rate = failed as f64 / transactions.len() as f64 * 100.0;

                if failed_rate > self.config.failed_rate_threshold {
                    anomalies.push(DataAnomaly {
                        title: "High Transaction Failure Rate".to_string(),
                        description: format!(
                            "{} transactions ({:.1}%) have failed status, which is higher than normal.",
                            failed, failed_rate
                        ),
                        category: "Transaction".to_string(),
                        metric_key: "FailedTransactions".to_string(),
                        detected_at: Utc::now(),
                        date: Utc::now().date_naive(),
                        actual_value: failed_rate,
                        expected_value: self.config.expected_failed_rate,
                        deviation_percentage: failed_rate - self.config.expected_failed_rate,
                        severity: self.config.failed_rate_severity.classify(failed_rate),
                        possible_causes: vec![
                            "High transaction failure rate may indicate payment processing issues or fraud attempts."
                                .to_string(),
                        ],
                        recommended_actions: vec![
                            "Check payment gateway status".to_string(),
                            "Review recent failed transactions".to_string(),
                        ],
                    });
                }

                Ok(anomalies)
            },
            Vec::new,
        )
    }

    /// Flag headline metrics whose day-over-day change is unusually large
    pub fn detect_summary_anomalies(&self, summary: &DashboardSummary) -> Vec<DataAnomaly> {
        safely(
            "detect_summary_anomalies",
            || {
                ensure_finite(
                    &[
                        summary.revenue,
                        summary.revenue_change,
                        summary.registrations_change,
                        summary.ftd_change,
                    ],
                    "detect_summary_anomalies",
                )?;

                let checks = [
                    (
                        "Revenue",
                        "Revenue",
                        "Revenue has",
                        summary.revenue,
                        summary.revenue_change,
                        ["Analyze revenue sources", "Review recent promotions"],
                    ),
                    (
                        "Registration",
                        "Registrations",
                        "Registrations have",
                        f64::from(summary.registrations),
                        summary.registrations_change,
                        ["Review marketing campaigns", "Check registration process"],
                    ),
                    (
                        "First Time Depositor",
                        "FTD",
                        "First time depositors have",
                        f64::from(summary.ftd),
                        summary.ftd_change,
                        ["Review deposit bonuses", "Check payment processing"],
                    ),
                ];

                Ok(checks
                    .into_iter()
                    .filter(|(_, _, _, _, change, _)| {
                        change.abs() > self.config.summary_change_threshold
                    })
                    .map(|(title, metric_key, subject, actual, change, actions)| {
                        self.summary_anomaly(summary.date, title, metric_key, subject, actual, change, actions)
                    })
                    .collect())
            },
            Vec::new,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn summary_anomaly(
        &self,
        date: NaiveDate,
        title: &str,
        metric_key: &str,
        subject: &str,
        actual: f64,
        change: f64,
        actions: [&str; 2],
    ) -> DataAnomaly {
        let verb = if change >= 0.0 { "increased" } else { "decreased" };
        DataAnomaly {
            title: format!("Significant {} Change", title),
            description: format!(
                "{} {} by {}%, which is a significant change.",
                subject,
                verb,
                format::number(change.abs())
            ),
            category: "Summary".to_string(),
            metric_key: metric_key.to_string(),
            detected_at: Utc::now(),
            date,
            actual_value: actual,
            expected_value: 0.0,
            deviation_percentage: change,
            severity: if change.abs() > self.config.summary_critical_change {
                5
            } else {
                4
            },
            possible_causes: vec![potential_cause(metric_key, change)],
            recommended_actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Shared z-score pass for a dated series with neighbour-window expectations
    fn series_anomalies(
        &self,
        points: &[MetricPoint],
        labels: &SeriesLabels<'_>,
    ) -> Result<Vec<DataAnomaly>, InsightsError> {
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        ensure_finite(&values, labels.metric_key)?;

        let flagged = z_score_outliers(&values, self.config.z_threshold, self.config.min_points);
        tracing::debug!(
            metric = labels.metric_key,
            points = values.len(),
            flagged = flagged.len(),
            "z-score pass complete"
        );

        Ok(flagged
            .into_iter()
            .map(|i| {
                let point = points[i];
                let expected = expected_value(&values, i, self.config.expected_value_window);
                let deviation = percentage_change(expected, point.value);
                let shown = if labels.money {
                    format::currency(point.value)
                } else {
                    format::number(point.value)
                };

                DataAnomaly {
                    title: format!("{} Anomaly on {}", labels.title, point.date.format("%Y-%m-%d")),
                    description: format!(
                        "{} of {} is {:.1}% {} than expected.",
                        labels.noun,
                        shown,
                        deviation.abs(),
                        higher_or_lower(deviation)
                    ),
                    category: labels.category.to_string(),
                    metric_key: labels.metric_key.to_string(),
                    detected_at: Utc::now(),
                    date: point.date,
                    actual_value: point.value,
                    expected_value: expected,
                    deviation_percentage: deviation,
                    severity: self.config.series_severity.classify(deviation),
                    possible_causes: vec![potential_cause(labels.metric_key, deviation)],
                    recommended_actions: labels.actions.iter().map(|a| a.to_string()).collect(),
                }
            })
            .collect())
    }
}
