//! Insight generator - central orchestrator for dashboard analysis
//!
//! Runs the detector, trend analyzer and forecaster over each dashboard
//! section, turns their findings into [`DashboardInsight`]s and assembles
//! the [`DashboardStory`] shown at the top of the dashboard.
//!
//! Every public method is fail-soft: a failing section is logged, counted
//! in the stage-failure metric and contributes nothing to the story.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::insights::{
    calculator::percentage_change,
    config::InsightsConfig,
    detector::AnomalyDetector,
    error::{ensure_finite, safely, InsightsError},
    explanation::ExplanationGenerator,
    forecast::Forecaster,
    format::{currency, number, signed},
    personalization::{personalize_insights, InsightRanking},
    trend::TrendAnalyzer,
    types::*,
};
use crate::metrics::InsightsMetrics;

/// Importance of a change-driven insight: `high` at 20% or more, `high - 1`
/// at 10%, `low + 1` at 5%, otherwise `low`.
pub fn importance_from_change(change: f64, high: u8, low: u8) -> u8 {
    let magnitude = change.abs();
    if magnitude >= 20.0 {
        high
    } else if magnitude >= 10.0 {
        high.saturating_sub(1)
    } else if magnitude >= 5.0 {
        low + 1
    } else {
        low
    }
}

fn up_or_down(change: f64) -> &'static str {
    if change >= 0.0 {
        "up"
    } else {
        "down"
    }
}

fn increase_or_decrease(change: f64) -> &'static str {
    if change >= 0.0 {
        "increase"
    } else {
        "decrease"
    }
}

fn higher_or_lower(change: f64) -> &'static str {
    if change >= 0.0 {
        "higher"
    } else {
        "lower"
    }
}

fn changed_by(change: f64) -> String {
    if change >= 0.0 {
        format!("increased by {}%", number(change))
    } else {
        format!("decreased by {}%", number(change.abs()))
    }
}

fn pattern_direction(pattern_type: PatternType) -> InsightDirection {
    match pattern_type {
        PatternType::Spike | PatternType::ConsistentIncrease => InsightDirection::Positive,
        PatternType::Dip | PatternType::ConsistentDecrease => InsightDirection::Negative,
    }
}

fn anomaly_insight(anomaly: &DataAnomaly, category: &str) -> DashboardInsight {
    let direction = if anomaly.is_positive() {
        InsightDirection::Positive
    } else {
        InsightDirection::Negative
    };
    let mut insight = DashboardInsight::pattern(
        anomaly.title.clone(),
        anomaly.description.clone(),
        category,
        anomaly.severity.saturating_mul(2),
        &anomaly.metric_key,
        direction,
    );
    insight.insight_type = InsightType::Anomaly;
    insight
}

fn pattern_insight(pattern: &TrendPattern, title_prefix: &str, category: &str, metric_key: &str) -> DashboardInsight {
    let importance = if pattern.pattern_type.is_point_pattern() { 9 } else { 7 };
    DashboardInsight::pattern(
        format!("{} {}", title_prefix, pattern.pattern_type),
        pattern.description.clone(),
        category,
        importance,
        metric_key,
        pattern_direction(pattern.pattern_type),
    )
    .with_explanation(format!(
        "Pattern detected from {} to {} with a confidence score of {:.0}%.",
        pattern.start_date,
        pattern.end_date,
        pattern.confidence_score * 100.0
    ))
}

/// Running total for one group key, kept in first-seen order
struct Group<'a> {
    key: &'a str,
    total: f64,
    count: usize,
}

fn group_totals<'a, T>(
    items: &'a [T],
    key: impl Fn(&'a T) -> &'a str,
    amount: impl Fn(&T) -> f64,
) -> Vec<Group<'a>> {
    let mut groups: Vec<Group<'a>> = Vec::new();
    for item in items {
        let k = key(item);
        match groups.iter_mut().find(|g| g.key == k) {
            Some(group) => {
                group.total += amount(item);
                group.count += 1;
            }
            None => groups.push(Group {
                key: k,
                total: amount(item),
                count: 1,
            }),
        }
    }
    groups
}

/// First group with the highest value of `by`
fn top_group<'g, 'a>(groups: &'g [Group<'a>], by: impl Fn(&Group<'a>) -> f64) -> Option<&'g Group<'a>> {
    groups.iter().fold(None, |best, group| match best {
        Some(current) if by(current) >= by(group) => Some(current),
        _ => Some(group),
    })
}

/// Insights from one dashboard section plus the anomalies they were built from
#[derive(Debug, Default)]
struct Section {
    insights: Vec<DashboardInsight>,
    anomalies: Vec<DataAnomaly>,
}

impl Section {
    fn promote(&mut self, anomaly: DataAnomaly, insight: DashboardInsight) {
        self.insights.push(insight);
        self.anomalies.push(anomaly);
    }
}

/// Orchestrates anomaly detection, trend analysis and story assembly
pub struct InsightGenerator {
    config: InsightsConfig,
    detector: AnomalyDetector,
    trends: TrendAnalyzer,
    forecaster: Forecaster,
    explanations: ExplanationGenerator,
    metrics: Option<Arc<InsightsMetrics>>,
}

impl fmt::Debug for InsightGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsightGenerator")
            .field("config", &self.config)
            .field("forecaster", &self.forecaster)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self::new(InsightsConfig::default())
    }
}

impl InsightGenerator {
    /// Create a generator whose forecasts use random jitter
    pub fn new(config: InsightsConfig) -> Self {
        let forecaster = Forecaster::new(config.forecast.clone());
        Self::with_forecaster(config, forecaster)
    }

    pub fn with_forecaster(config: InsightsConfig, forecaster: Forecaster) -> Self {
        Self {
            detector: AnomalyDetector::new(config.anomaly.clone()),
            trends: TrendAnalyzer::new(config.trend.clone()),
            forecaster,
            explanations: ExplanationGenerator::new(),
            metrics: None,
            config,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<InsightsMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    pub fn explanations(&self) -> &ExplanationGenerator {
        &self.explanations
    }

    pub fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }

    /// `safely`, plus a stage-failure count when metrics are attached
    fn guarded<T>(
        &self,
        operation: &str,
        work: impl FnOnce() -> Result<T, InsightsError>,
        fallback: impl FnOnce() -> T,
    ) -> T {
        safely(
            operation,
            || {
                work().map_err(|err| {
                    if let Some(metrics) = &self.metrics {
                        metrics.stage_failures_total.with_label_values(&[operation]).inc();
                    }
                    err
                })
            },
            fallback,
        )
    }

    // =========================================================================
    // Per-section insights
    // =========================================================================

    /// Day-over-day insights for the headline numbers
    pub fn summary_insights(&self, summary: &DashboardSummary) -> Vec<DashboardInsight> {
        self.guarded("summary_insights", || self.summary_section(summary), Section::default)
            .insights
    }

    pub fn revenue_insights(&self, revenue: &[CasinoRevenueItem]) -> Vec<DashboardInsight> {
        self.guarded("revenue_insights", || self.revenue_section(revenue), Section::default)
            .insights
    }

    pub fn registration_insights(&self, registrations: &[PlayerRegistrationItem]) -> Vec<DashboardInsight> {
        self.guarded(
            "registration_insights",
            || self.registration_section(registrations),
            Section::default,
        )
        .insights
    }

    pub fn top_games_insights(&self, games: &[TopGameItem]) -> Vec<DashboardInsight> {
        self.guarded("top_games_insights", || self.games_section(games), Section::default)
            .insights
    }

    pub fn transaction_insights(&self, transactions: &[RecentTransactionItem]) -> Vec<DashboardInsight> {
        self.guarded(
            "transaction_insights",
            || self.transaction_section(transactions),
            Section::default,
        )
        .insights
    }

    /// Moderate or stronger relationships between dashboard metrics
    pub fn correlation_insights(&self, data: &DashboardData) -> Vec<DashboardInsight> {
        self.guarded("correlation_insights", || self.correlation_section(data), Section::default)
            .insights
    }

    fn summary_section(&self, summary: &DashboardSummary) -> Result<Section, InsightsError> {
        ensure_finite(
            &[
                summary.revenue,
                summary.revenue_change,
                summary.registrations_change,
                summary.ftd_change,
                summary.deposits,
                summary.cashouts,
            ],
            "summary_insights",
        )?;

        let mut section = Section::default();

        if summary.revenue > 0.0 {
            let change = summary.revenue_change;
            let mut insight = DashboardInsight::pattern(
                "Revenue Performance",
                format!(
                    "Revenue is {} by {}% compared to yesterday.",
                    up_or_down(change),
                    number(change.abs())
                ),
                "Summary",
                importance_from_change(change, 10, 5),
                "Revenue",
                InsightDirection::from_change(change),
            );
            if change.abs() >= 15.0 {
                insight = insight.with_explanation(format!(
                    "This represents a significant {} in revenue that warrants attention.",
                    increase_or_decrease(change)
                ));
                insight = insight.with_action(if change >= 0.0 {
                    "Consider analyzing which games or promotions are driving this increase."
                } else {
                    "Investigate potential causes for the revenue decline and consider targeted promotions."
                });
            }
            section.insights.push(insight);
        }

        if summary.registrations > 0 {
            let change = summary.registrations_change;
            section.insights.push(DashboardInsight::pattern(
                "Player Acquisition",
                format!(
                    "New registrations are {} by {}% compared to yesterday.",
                    up_or_down(change),
                    number(change.abs())
                ),
                "Summary",
                importance_from_change(change, 8, 4),
                "Registrations",
                InsightDirection::from_change(change),
            ));
        }

        if summary.ftd > 0 {
            let change = summary.ftd_change;
            section.insights.push(DashboardInsight::pattern(
                "First Time Depositors",
                format!(
                    "First time depositors are {} by {}% compared to yesterday.",
                    up_or_down(change),
                    number(change.abs())
                ),
                "Summary",
                importance_from_change(change, 9, 5),
                "FTD",
                InsightDirection::from_change(change),
            ));
        }

        if summary.deposits > 0.0 && summary.cashouts > 0.0 {
            let ratio = (summary.deposits / summary.cashouts * 100.0).round() / 100.0;
            let quality = if ratio > 1.5 {
                "healthy"
            } else if ratio > 1.0 {
                "balanced"
            } else {
                "concerning"
            };
            let healthy = ratio >= 1.0;
            let mut insight = DashboardInsight::pattern(
                "Deposit to Withdrawal Ratio",
                format!("The deposit to withdrawal ratio is {} which is {}.", number(ratio), quality),
                "Summary",
                if healthy { 5 } else { 8 },
                "DepositWithdrawalRatio",
                if healthy {
                    InsightDirection::Positive
                } else {
                    InsightDirection::Negative
                },
            );
            if !healthy {
                insight = insight.with_action("Review player withdrawal patterns and consider retention strategies.");
            }
            section.insights.push(insight);
        }

        let anomalies = self.detector.detect_summary_anomalies(summary);
        for anomaly in anomalies.into_iter().filter(|a| a.severity >= 3).take(2) {
            let mut insight = anomaly_insight(&anomaly, "Summary").with_explanation(format!(
                "Expected value: {}, Actual value: {}, Deviation: {}%",
                number(anomaly.expected_value),
                number(anomaly.actual_value),
                number(anomaly.deviation_percentage)
            ));
            if let Some(cause) = anomaly.primary_cause() {
                insight = insight.with_action(cause);
            }
            section.promote(anomaly, insight);
        }

        Ok(section)
    }

    fn revenue_section(&self, revenue: &[CasinoRevenueItem]) -> Result<Section, InsightsError> {
        let mut section = Section::default();
        if revenue.len() < 2 {
            return Ok(section);
        }
        let values: Vec<f64> = revenue.iter().map(|r| r.revenue).collect();
        ensure_finite(&values, "revenue_insights")?;

        let trend = self
            .trends
            .analyze_revenue_trends(revenue, TrendAnalysisOptions::default());
        let change = trend.percentage_change;

        section.insights.push(DashboardInsight::pattern(
            "Revenue Trend",
            format!(
                "The overall revenue trend is {} with a {}% {} over the period.",
                trend.trend_direction.to_string().to_lowercase(),
                number(change.abs()),
                increase_or_decrease(change)
            ),
            "Revenue",
            importance_from_change(change, 8, 4),
            "Revenue",
            InsightDirection::from_change(change),
        ));

        for pattern in trend.significant_patterns().take(2) {
            section
                .insights
                .push(pattern_insight(pattern, "Revenue", "Revenue", "Revenue"));
        }

        let anomalies = self.detector.detect_revenue_anomalies(revenue);
        for anomaly in anomalies.into_iter().filter(|a| a.severity >= 3).take(2) {
            let mut insight = anomaly_insight(&anomaly, "Revenue").with_explanation(format!(
                "On {}, revenue was {}% {} than expected.",
                anomaly.date,
                number(anomaly.deviation_percentage.abs()),
                higher_or_lower(anomaly.deviation_percentage)
            ));
            if let Some(cause) = anomaly.primary_cause() {
                insight = insight.with_action(cause);
            }
            section.promote(anomaly, insight);
        }

        if let (true, Some(cycle)) = (trend.seasonality_detected, trend.seasonal_cycle_days) {
            section.insights.push(
                DashboardInsight::pattern(
                    "Revenue Seasonality",
                    format!("A {}-day seasonality pattern has been detected in revenue data.", cycle),
                    "Revenue",
                    7,
                    "Revenue",
                    InsightDirection::Neutral,
                )
                .with_explanation(
                    "Understanding this pattern can help with forecasting and planning promotional activities.",
                )
                .with_action("Consider aligning promotional campaigns with expected seasonal peaks."),
            );
        }

        Ok(section)
    }

    fn registration_section(&self, registrations: &[PlayerRegistrationItem]) -> Result<Section, InsightsError> {
        let mut section = Section::default();
        if registrations.len() < 2 {
            return Ok(section);
        }

        let trend = self
            .trends
            .analyze_registration_trends(registrations, TrendAnalysisOptions::default());
        let change = trend.percentage_change;

        section.insights.push(DashboardInsight::pattern(
            "Registration Trend",
            format!(
                "Player registrations are {} with a {}% {} over the period.",
                trend.trend_direction.to_string().to_lowercase(),
                number(change.abs()),
                increase_or_decrease(change)
            ),
            "Registration",
            importance_from_change(change, 7, 4),
            "Registrations",
            InsightDirection::from_change(change),
        ));

        let total_registrations: u64 = registrations.iter().map(|r| u64::from(r.registrations)).sum();
        let total_ftd: u64 = registrations
            .iter()
            .map(|r| u64::from(r.first_time_depositors))
            .sum();

        if total_registrations > 0 {
            let rate = total_ftd as f64 / total_registrations as f64 * 100.0;
            let quality = if rate >= 25.0 {
                "excellent"
            } else if rate >= 15.0 {
                "good"
            } else if rate >= 10.0 {
                "average"
            } else {
                "below average"
            };
            let direction = if rate >= 15.0 {
                InsightDirection::Positive
            } else if rate >= 10.0 {
                InsightDirection::Neutral
            } else {
                InsightDirection::Negative
            };
            let mut insight = DashboardInsight::pattern(
                "Registration Conversion Rate",
                format!(
                    "The conversion rate from registration to first deposit is {:.1}%, which is {}.",
                    rate, quality
                ),
                "Registration",
                if rate < 10.0 { 9 } else { 6 },
                "ConversionRate",
                direction,
            );
            if rate < 15.0 {
                insight = insight
                    .with_action("Consider optimizing the registration to deposit journey and welcome bonuses.");
            }
            section.insights.push(insight);
        }

        for pattern in trend.significant_patterns().take(2) {
            section.insights.push(pattern_insight(
                pattern,
                "Registration",
                "Registration",
                "Registrations",
            ));
        }

        let anomalies = self.detector.detect_registration_anomalies(registrations);
        for anomaly in anomalies.into_iter().filter(|a| a.severity >= 3).take(2) {
            let mut insight = anomaly_insight(&anomaly, "Registration").with_explanation(format!(
                "On {}, {} was {}% {} than expected.",
                anomaly.date,
                anomaly.metric_key,
                number(anomaly.deviation_percentage.abs()),
                higher_or_lower(anomaly.deviation_percentage)
            ));
            if let Some(cause) = anomaly.primary_cause() {
                insight = insight.with_action(cause);
            }
            section.promote(anomaly, insight);
        }

        Ok(section)
    }

    fn games_section(&self, games: &[TopGameItem]) -> Result<Section, InsightsError> {
        let mut section = Section::default();
        if games.is_empty() {
            return Ok(section);
        }
        let revenues: Vec<f64> = games.iter().map(|g| g.revenue).collect();
        ensure_finite(&revenues, "top_games_insights")?;

        let top_game = games
            .iter()
            .fold(None::<&TopGameItem>, |best, game| match best {
                Some(current) if current.revenue >= game.revenue => Some(current),
                _ => Some(game),
            })
            .ok_or_else(|| InsightsError::insufficient_data("top_games_insights"))?;

        section.insights.push(
            DashboardInsight::pattern(
                "Top Performing Game",
                format!(
                    "{} is the top performing game with {} in revenue.",
                    top_game.game_name,
                    currency(top_game.revenue)
                ),
                "Game",
                7,
                "TopGame",
                InsightDirection::Positive,
            )
            .with_explanation(format!(
                "Provided by {}, this game has generated significant revenue today.",
                top_game.provider
            )),
        );

        let providers = group_totals(games, |g| g.provider.as_str(), |g| g.revenue);
        if let Some(provider) = top_group(&providers, |g| g.total) {
            section.insights.push(DashboardInsight::pattern(
                "Top Game Provider",
                format!(
                    "{} is the top performing provider with {} in revenue across {} games.",
                    provider.key,
                    currency(provider.total),
                    provider.count
                ),
                "Game",
                6,
                "TopProvider",
                InsightDirection::Positive,
            ));
        }

        let game_types = group_totals(games, |g| g.game_type.as_str(), |g| g.revenue);
        if let Some(game_type) = top_group(&game_types, |g| g.total) {
            section.insights.push(DashboardInsight::pattern(
                "Popular Game Type",
                format!(
                    "{} games are generating the most revenue with {} across {} games.",
                    game_type.key,
                    currency(game_type.total),
                    game_type.count
                ),
                "Game",
                5,
                "GameType",
                InsightDirection::Positive,
            ));
        }

        let anomalies = self.detector.detect_game_performance_anomalies(games);
        for anomaly in anomalies.into_iter().filter(|a| a.severity >= 4).take(2) {
            let mut insight = anomaly_insight(&anomaly, "Game").with_action(if anomaly.is_positive() {
                "Consider featuring this game more prominently on the platform."
            } else {
                "Investigate potential technical or player experience issues with this game."
            });
            if let Some(cause) = anomaly.primary_cause() {
                insight = insight.with_explanation(cause);
            }
            section.promote(anomaly, insight);
        }

        Ok(section)
    }

    fn correlation_section(&self, data: &DashboardData) -> Result<Section, InsightsError> {
        let mut section = Section::default();
        for correlation in self.trends.analyze_metric_correlations(data) {
            let importance = match correlation.strength.as_str() {
                "Very Strong" => 8,
                "Strong" => 7,
                "Moderate" => 6,
                _ => continue,
            };
            let direction = if correlation.correlation_coefficient >= 0.0 {
                InsightDirection::Positive
            } else {
                InsightDirection::Negative
            };
            let mut insight = DashboardInsight::pattern(
                format!("{} and {} Correlation", correlation.metric_a, correlation.metric_b),
                correlation.description,
                "Correlation",
                importance,
                &correlation.metric_a,
                direction,
            );
            insight.insight_type = InsightType::Correlation;
            let explanation = self.explanations.insight_explanation(&insight);
            section.insights.push(insight.with_explanation(explanation));
        }
        Ok(section)
    }

    fn transaction_section(&self, transactions: &[RecentTransactionItem]) -> Result<Section, InsightsError> {
        let mut section = Section::default();
        if transactions.is_empty() {
            return Ok(section);
        }
        let amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();
        ensure_finite(&amounts, "transaction_insights")?;

        let by_type = group_totals(transactions, |t| t.transaction_type.as_str(), |t| t.amount);
        if let Some(top_type) = top_group(&by_type, |g| g.total) {
            section.insights.push(DashboardInsight::pattern(
                "Transaction Patterns",
                format!(
                    "{} is the most common transaction type with {} transactions totaling {}.",
                    top_type.key,
                    top_type.count,
                    currency(top_type.total)
                ),
                "Transaction",
                5,
                "TransactionType",
                InsightDirection::Neutral,
            ));
        }

        let total = transactions.len() as f64;
        let failed = transactions
            .iter()
            .filter(|t| t.status.eq_ignore_ascii_case("failed"))
            .count();
        let failed_pct = failed as f64 / total * 100.0;
        if failed_pct > 5.0 {
            section.insights.push(
                DashboardInsight::pattern(
                    "Failed Transactions",
                    format!("{} transactions ({:.1}%) have failed status.", failed, failed_pct),
                    "Transaction",
                    if failed_pct > 10.0 { 9 } else { 7 },
                    "FailedTransactions",
                    InsightDirection::Negative,
                )
                .with_action(
                    "Investigate payment processing systems and player communication regarding failed transactions.",
                ),
            );
        }

        let by_platform = group_totals(transactions, |t| t.platform.as_str(), |_| 1.0);
        if by_platform.len() > 1 {
            if let Some(platform) = top_group(&by_platform, |g| g.count as f64) {
                section.insights.push(DashboardInsight::pattern(
                    "Platform Usage",
                    format!(
                        "{} is the most used platform with {:.1}% of transactions.",
                        platform.key,
                        platform.count as f64 / total * 100.0
                    ),
                    "Transaction",
                    5,
                    "Platform",
                    InsightDirection::Neutral,
                ));
            }
        }

        let anomalies = self.detector.detect_transaction_anomalies(transactions);
        for anomaly in anomalies.into_iter().filter(|a| a.severity >= 4).take(1) {
            let mut insight = anomaly_insight(&anomaly, "Transaction");
            if let Some(cause) = anomaly.primary_cause() {
                insight = insight.with_explanation(cause);
            }
            section.promote(anomaly, insight);
        }

        Ok(section)
    }

    // =========================================================================
    // Story assembly
    // =========================================================================

    /// Build the full dashboard story; any failure yields a placeholder story
    pub fn dashboard_story(&self, data: &DashboardData) -> DashboardStory {
        self.guarded(
            "dashboard_story",
            || self.build_story(data, |insights| insights),
            DashboardStory::placeholder,
        )
    }

    /// Build the story from insights re-ranked for one user
    pub fn personalized_story(&self, data: &DashboardData, ranking: &InsightRanking) -> DashboardStory {
        self.guarded(
            "personalized_story",
            || self.build_story(data, |insights| personalize_insights(insights, ranking)),
            DashboardStory::placeholder,
        )
    }

    fn sections(&self, data: &DashboardData) -> Vec<(&'static str, Section)> {
        vec![
            (
                "summary",
                self.guarded("summary_insights", || self.summary_section(&data.summary), Section::default),
            ),
            (
                "revenue",
                self.guarded(
                    "revenue_insights",
                    || self.revenue_section(&data.casino_revenue),
                    Section::default,
                ),
            ),
            (
                "registrations",
                self.guarded(
                    "registration_insights",
                    || self.registration_section(&data.player_registrations),
                    Section::default,
                ),
            ),
            (
                "correlations",
                self.guarded("correlation_insights", || self.correlation_section(data), Section::default),
            ),
            (
                "games",
                self.guarded("top_games_insights", || self.games_section(&data.top_games), Section::default),
            ),
            (
                "transactions",
                self.guarded(
                    "transaction_insights",
                    || self.transaction_section(&data.recent_transactions),
                    Section::default,
                ),
            ),
        ]
    }

    fn build_story(
        &self,
        data: &DashboardData,
        rank: impl FnOnce(Vec<DashboardInsight>) -> Vec<DashboardInsight>,
    ) -> Result<DashboardStory, InsightsError> {
        let started = Instant::now();
        let summary = &data.summary;
        ensure_finite(
            &[
                summary.revenue,
                summary.revenue_change,
                summary.registrations_change,
                summary.ftd_change,
            ],
            "dashboard_story",
        )?;

        let mut all_insights = Vec::new();
        let mut anomalies = Vec::new();
        for (domain, section) in self.sections(data) {
            if let Some(metrics) = &self.metrics {
                metrics
                    .insights_generated_total
                    .with_label_values(&[domain])
                    .inc_by(section.insights.len() as f64);
                metrics
                    .anomalies_detected_total
                    .with_label_values(&[domain])
                    .inc_by(section.anomalies.len() as f64);
            }
            tracing::debug!(
                domain,
                insights = section.insights.len(),
                anomalies = section.anomalies.len(),
                "Section analysed"
            );
            all_insights.extend(section.insights);
            anomalies.extend(section.anomalies);
        }

        let ranked = rank(all_insights);
        let insight_count = ranked.len();
        let story = self.compose_story(data, ranked, anomalies);

        let elapsed = started.elapsed().as_secs_f64();
        if let Some(metrics) = &self.metrics {
            metrics.stories_generated_total.inc();
            metrics.story_duration_seconds.observe(elapsed);
        }
        tracing::debug!(
            insights = insight_count,
            key_insights = story.key_insights.len(),
            anomalies = story.significant_anomalies.len(),
            elapsed_ms = elapsed * 1000.0,
            "Dashboard story assembled"
        );

        Ok(story)
    }

    /// Order `insights` by importance and cut them into the story's parts
    fn compose_story(
        &self,
        data: &DashboardData,
        mut ranked: Vec<DashboardInsight>,
        anomalies: Vec<DataAnomaly>,
    ) -> DashboardStory {
        let summary = &data.summary;
        ranked.sort_by(|a, b| b.importance.cmp(&a.importance));

        let story_config = &self.config.story;
        let key_insights: Vec<DashboardInsight> = ranked
            .iter()
            .take(story_config.max_key_insights)
            .cloned()
            .collect();

        DashboardStory {
            title: format!("Dashboard Insights for {}", summary.date),
            summary: story_summary(summary, &key_insights),
            generated_at: chrono::Utc::now(),
            significant_anomalies: anomalies,
            highlights: self.highlights(data, &ranked),
            business_context: business_context(summary),
            opportunity_analysis: self.direction_analysis(
                &ranked,
                InsightDirection::Positive,
                story_config.opportunity_importance,
                "No significant opportunities identified based on current data.",
            ),
            risk_analysis: self.direction_analysis(
                &ranked,
                InsightDirection::Negative,
                story_config.risk_importance,
                "No significant risks identified based on current data.",
            ),
            recommended_actions: ranked
                .iter()
                .filter_map(|i| i.recommended_action.clone())
                .filter(|action| !action.is_empty())
                .take(story_config.max_recommended_actions)
                .collect(),
            key_insights,
        }
    }

    /// Headline numbers followed by the most important non-summary findings.
    /// `ranked` must already be sorted by importance.
    fn highlights(&self, data: &DashboardData, ranked: &[DashboardInsight]) -> Vec<String> {
        let summary = &data.summary;
        let mut highlights = Vec::new();

        if summary.revenue > 0.0 {
            highlights.push(format!(
                "Total revenue: {} ({}% vs yesterday)",
                currency(summary.revenue),
                signed(summary.revenue_change)
            ));
        }
        highlights.push(format!(
            "New registrations: {} ({}% vs yesterday)",
            summary.registrations,
            signed(summary.registrations_change)
        ));
        highlights.push(format!(
            "First time depositors: {} ({}% vs yesterday)",
            summary.ftd,
            signed(summary.ftd_change)
        ));

        let top_game = data.top_games.iter().fold(None::<&TopGameItem>, |best, game| match best {
            Some(current) if current.revenue >= game.revenue => Some(current),
            _ => Some(game),
        });
        if let Some(game) = top_game {
            highlights.push(format!(
                "Top performing game: {} ({})",
                game.game_name,
                currency(game.revenue)
            ));
        }

        highlights.extend(
            ranked
                .iter()
                .filter(|i| i.importance >= self.config.story.highlight_importance && i.category != "Summary")
                .take(self.config.story.max_highlight_insights)
                .map(|i| i.description.clone()),
        );

        highlights
    }

    fn direction_analysis(
        &self,
        ranked: &[DashboardInsight],
        direction: InsightDirection,
        min_importance: u8,
        none_found: &str,
    ) -> String {
        let descriptions: Vec<&str> = ranked
            .iter()
            .filter(|i| i.trend_direction == direction && i.importance >= min_importance)
            .take(self.config.story.max_analysis_insights)
            .map(|i| i.description.as_str())
            .collect();

        if descriptions.is_empty() {
            none_found.to_string()
        } else {
            descriptions.join(" ")
        }
    }

    // =========================================================================
    // Forecasts
    // =========================================================================

    /// Summarise a forecast of `metric_key` as a single insight.
    ///
    /// `None` when there is not enough history to forecast.
    pub fn forecast_insight(&self, metric_key: &str, history: &[DataPoint], days: u32) -> Option<DashboardInsight> {
        let forecast = self.forecaster.generate_forecast(metric_key, history, days);
        self.summarize_forecast(metric_key, history, &forecast)
    }

    /// Same as [`forecast_insight`](Self::forecast_insight) for a forecast the caller already holds
    pub fn summarize_forecast(
        &self,
        metric_key: &str,
        history: &[DataPoint],
        forecast: &[ForecastPoint],
    ) -> Option<DashboardInsight> {
        self.guarded(
            "forecast_insight",
            || self.build_forecast_insight(metric_key, history, forecast),
            || None,
        )
    }

    fn build_forecast_insight(
        &self,
        metric_key: &str,
        history: &[DataPoint],
        forecast: &[ForecastPoint],
    ) -> Result<Option<DashboardInsight>, InsightsError> {
        let Some(final_point) = forecast.last() else {
            return Ok(None);
        };
        let days = forecast.len();

        let last_observed = history
            .iter()
            .filter_map(|p| p.value(metric_key).map(|v| (p.timestamp, v)))
            .max_by_key(|(date, _)| *date)
            .map(|(_, value)| value)
            .ok_or_else(|| InsightsError::insufficient_data("forecast_insight"))?;
        let projected = final_point
            .point
            .value(metric_key)
            .ok_or_else(|| InsightsError::calculation_error("forecast point is missing its metric"))?;

        let change = percentage_change(last_observed, projected);
        let movement = if change.abs() < 0.5 {
            "hold steady".to_string()
        } else if change > 0.0 {
            format!("rise by {}%", number(change.abs()))
        } else {
            format!("fall by {}%", number(change.abs()))
        };

        let mut insight = DashboardInsight::pattern(
            format!("{} Forecast", metric_key),
            format!(
                "{} is projected to {} over the next {} days, reaching {} by {}.",
                metric_key,
                movement,
                days,
                number(projected),
                final_point.point.timestamp
            ),
            "Forecast",
            importance_from_change(change, 8, 4),
            metric_key,
            InsightDirection::from_change(change),
        )
        .with_explanation(format!(
            "{} The projected range on {} is {} to {} at {:.0}% confidence.",
            self.explanations.short_description(metric_key),
            final_point.point.timestamp,
            number(final_point.lower_bound),
            number(final_point.upper_bound),
            final_point.confidence_interval * 100.0
        ));
        insight.insight_type = InsightType::Forecast;

        tracing::debug!(metric_key, days, change, "Forecast insight generated");
        Ok(Some(insight))
    }
}

fn story_summary(summary: &DashboardSummary, key_insights: &[DashboardInsight]) -> String {
    let mut text = format!(
        "Today's summary shows that registrations have {}, first time depositors have {}, and revenue has {} compared to yesterday.",
        changed_by(summary.registrations_change),
        changed_by(summary.ftd_change),
        changed_by(summary.revenue_change)
    );
    if let Some(first) = key_insights.first() {
        text.push_str(" Key insights include: ");
        text.push_str(&first.description);
    }
    text
}

fn business_context(summary: &DashboardSummary) -> String {
    let performance = if summary.revenue_change >= 5.0 {
        "strong"
    } else if summary.revenue_change >= 0.0 {
        "stable"
    } else if summary.revenue_change >= -5.0 {
        "slight underperformance"
    } else {
        "significant underperformance"
    };

    format!(
        "Today's data shows {} compared to yesterday across key metrics. Player acquisition is {} and monetization is {}.",
        performance,
        if summary.registrations_change >= 0.0 { "growing" } else { "declining" },
        if summary.revenue_change >= 0.0 { "improving" } else { "declining" }
    )
}
