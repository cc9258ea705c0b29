//! Core data types for dashboard insights
//!
//! Input rows mirror what the reporting backend already fetched from the
//! database; output types are serialised with camelCase field names so the
//! dashboard frontend can consume them unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Inputs
// =============================================================================

/// Daily casino revenue row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasinoRevenueItem {
    pub date: NaiveDate,
    pub revenue: f64,
}

/// Daily player registration row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRegistrationItem {
    pub date: NaiveDate,
    pub registrations: u32,
    pub first_time_depositors: u32,
}

/// A game in today's top games list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopGameItem {
    pub game_name: String,
    pub provider: String,
    pub game_type: String,
    pub revenue: f64,
}

/// A recent deposit / withdrawal / bet transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTransactionItem {
    pub transaction_id: String,
    pub transaction_date: DateTime<Utc>,
    pub transaction_type: String,
    pub amount: f64,
    pub status: String,
    pub platform: String,
}

/// Headline numbers for the dashboard date, with day-over-day change in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub revenue: f64,
    pub revenue_change: f64,
    pub registrations: u32,
    pub registrations_change: f64,
    pub ftd: u32,
    pub ftd_change: f64,
    #[serde(default)]
    pub deposits: f64,
    #[serde(default)]
    pub cashouts: f64,
}

/// Everything the story pipeline needs for one dashboard request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub summary: DashboardSummary,
    #[serde(default)]
    pub casino_revenue: Vec<CasinoRevenueItem>,
    #[serde(default)]
    pub player_registrations: Vec<PlayerRegistrationItem>,
    #[serde(default)]
    pub top_games: Vec<TopGameItem>,
    #[serde(default)]
    pub recent_transactions: Vec<RecentTransactionItem>,
}

/// A single (date, value) observation of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl MetricPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

// =============================================================================
// Anomalies
// =============================================================================

/// A value that deviates significantly from what was expected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAnomaly {
    pub title: String,
    pub description: String,
    pub category: String,
    pub metric_key: String,
    pub detected_at: DateTime<Utc>,
    pub date: NaiveDate,
    pub actual_value: f64,
    pub expected_value: f64,
    pub deviation_percentage: f64,
    /// 1 (informational) to 5 (critical)
    pub severity: u8,
    pub possible_causes: Vec<String>,
    pub recommended_actions: Vec<String>,
}

impl DataAnomaly {
    pub fn is_positive(&self) -> bool {
        self.deviation_percentage >= 0.0
    }

    pub fn primary_cause(&self) -> Option<&str> {
        self.possible_causes.first().map(String::as_str)
    }
}

// =============================================================================
// Trends
// =============================================================================

/// Overall direction of a metric over the analysed period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "Increasing"),
            TrendDirection::Decreasing => write!(f, "Decreasing"),
            TrendDirection::Stable => write!(f, "Stable"),
        }
    }
}

/// Shape of a detected pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternType {
    Spike,
    Dip,
    #[serde(rename = "Consistent Increase")]
    ConsistentIncrease,
    #[serde(rename = "Consistent Decrease")]
    ConsistentDecrease,
}

impl PatternType {
    pub fn is_point_pattern(&self) -> bool {
        matches!(self, PatternType::Spike | PatternType::Dip)
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternType::Spike => write!(f, "Spike"),
            PatternType::Dip => write!(f, "Dip"),
            PatternType::ConsistentIncrease => write!(f, "Consistent Increase"),
            PatternType::ConsistentDecrease => write!(f, "Consistent Decrease"),
        }
    }
}

/// A pattern found inside a metric series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPattern {
    pub pattern_type: PatternType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
    pub is_significant: bool,
    /// 0.0 to 1.0
    pub confidence_score: f64,
}

/// A labelled point carrying one or more metric values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub label: String,
    pub timestamp: NaiveDate,
    pub metrics: BTreeMap<String, f64>,
}

impl DataPoint {
    /// Point labelled with its ISO date, carrying a single metric
    pub fn single(date: NaiveDate, metric_key: &str, value: f64) -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(metric_key.to_string(), value);
        Self {
            label: date.format("%Y-%m-%d").to_string(),
            timestamp: date,
            metrics,
        }
    }

    pub fn value(&self, metric_key: &str) -> Option<f64> {
        self.metrics.get(metric_key).copied()
    }
}

/// A projected point with its uncertainty band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    #[serde(flatten)]
    pub point: DataPoint,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_interval: f64,
}

impl ForecastPoint {
    /// Half the distance between the bounds
    pub fn interval_width(&self) -> f64 {
        (self.upper_bound - self.lower_bound) / 2.0
    }
}

/// Result of analysing one metric series
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysisResult {
    pub metric_key: String,
    pub trend_direction: TrendDirection,
    pub percentage_change: f64,
    pub overall_trend_slope: f64,
    pub identified_patterns: Vec<TrendPattern>,
    pub outlier_points: Vec<DataPoint>,
    pub seasonality_detected: bool,
    pub seasonal_cycle_days: Option<u32>,
    pub segment_growth_rates: BTreeMap<String, f64>,
    pub additional_metrics: BTreeMap<String, serde_json::Value>,
}

impl TrendAnalysisResult {
    /// Zeroed result of the expected shape
    pub fn empty(metric_key: &str) -> Self {
        Self {
            metric_key: metric_key.to_string(),
            ..Self::default()
        }
    }

    pub fn significant_patterns(&self) -> impl Iterator<Item = &TrendPattern> {
        self.identified_patterns.iter().filter(|p| p.is_significant)
    }
}

/// Linear relationship between two dashboard metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCorrelation {
    pub metric_a: String,
    pub metric_b: String,
    /// -1.0 to 1.0
    pub correlation_coefficient: f64,
    pub strength: String,
    /// "Positive" or "Negative"
    pub direction: String,
    pub description: String,
}

/// Switches for the optional passes of trend analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysisOptions {
    pub detect_patterns: bool,
    pub detect_outliers: bool,
    pub include_seasonality: bool,
}

impl Default for TrendAnalysisOptions {
    fn default() -> Self {
        Self {
            detect_patterns: true,
            detect_outliers: true,
            include_seasonality: true,
        }
    }
}

// =============================================================================
// Insights and stories
// =============================================================================

/// Whether an insight is good news, bad news or neither
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightDirection {
    Positive,
    Negative,
    Neutral,
}

impl InsightDirection {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            InsightDirection::Positive
        } else if change < 0.0 {
            InsightDirection::Negative
        } else {
            InsightDirection::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightType {
    Pattern,
    Anomaly,
    Correlation,
    Forecast,
}

/// A single narrative finding shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardInsight {
    pub title: String,
    pub description: String,
    pub category: String,
    /// 1 to 10
    pub importance: u8,
    pub generated_at: DateTime<Utc>,
    pub metric_key: String,
    pub trend_direction: InsightDirection,
    pub insight_type: InsightType,
    pub detailed_explanation: Option<String>,
    pub recommended_action: Option<String>,
}

impl DashboardInsight {
    /// Pattern insight with no explanation or action attached
    pub fn pattern(
        title: impl Into<String>,
        description: impl Into<String>,
        category: &str,
        importance: u8,
        metric_key: &str,
        trend_direction: InsightDirection,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category: category.to_string(),
            importance: importance.min(10),
            generated_at: Utc::now(),
            metric_key: metric_key.to_string(),
            trend_direction,
            insight_type: InsightType::Pattern,
            detailed_explanation: None,
            recommended_action: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.detailed_explanation = Some(explanation.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.recommended_action = Some(action.into());
        self
    }
}

/// Narrative assembled from every dashboard section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStory {
    pub title: String,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
    pub key_insights: Vec<DashboardInsight>,
    pub significant_anomalies: Vec<DataAnomaly>,
    pub highlights: Vec<String>,
    pub business_context: String,
    pub opportunity_analysis: String,
    pub risk_analysis: String,
    pub recommended_actions: Vec<String>,
}

impl DashboardStory {
    /// Story returned when the pipeline could not run
    pub fn placeholder() -> Self {
        Self {
            title: "Dashboard Story".to_string(),
            summary: "Unable to generate complete dashboard story at this time.".to_string(),
            generated_at: Utc::now(),
            key_insights: Vec::new(),
            significant_anomalies: Vec::new(),
            highlights: Vec::new(),
            business_context: String::new(),
            opportunity_analysis: String::new(),
            risk_analysis: String::new(),
            recommended_actions: Vec::new(),
        }
    }
}
