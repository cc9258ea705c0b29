//! Trend Analysis
//!
//! Direction, regression slope, spike/dip and consistent-run patterns,
//! 3σ outliers and a weekly seasonality heuristic for one metric series,
//! plus the pairwise correlation between revenue and registrations.

use chrono::Datelike;
use std::collections::BTreeMap;

use crate::insights::{
    calculator::{
        correlation_strength, index_regression, mean, pearson_correlation, percentage_change,
        std_dev,
    },
    config::TrendConfig,
    error::{ensure_finite, safely, InsightsError},
    format,
    types::*,
};

/// How a series is named in pattern descriptions
#[derive(Debug, Clone, Copy)]
pub struct SeriesLabel<'a> {
    pub metric_key: &'a str,
    /// Lower-case noun used in prose, e.g. "revenue"
    pub noun: &'a str,
    pub money: bool,
}

impl<'a> SeriesLabel<'a> {
    pub const fn new(metric_key: &'a str, noun: &'a str, money: bool) -> Self {
        Self { metric_key, noun, money }
    }

    fn show(&self, value: f64) -> String {
        if self.money {
            format::currency(value)
        } else {
            format::number(value)
        }
    }
}

pub const REVENUE: SeriesLabel<'static> = SeriesLabel::new("Revenue", "revenue", true);
pub const REGISTRATIONS: SeriesLabel<'static> =
    SeriesLabel::new("Registrations", "registration", false);

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn correlation(metric_a: &str, metric_b: &str, coefficient: f64) -> MetricCorrelation {
    let strength = correlation_strength(coefficient);
    let direction = if coefficient >= 0.0 { "Positive" } else { "Negative" };
    MetricCorrelation {
        metric_a: metric_a.to_string(),
        metric_b: metric_b.to_string(),
        correlation_coefficient: coefficient,
        strength: strength.to_string(),
        direction: direction.to_string(),
        description: format!(
            "There is a {} {} correlation ({:.2}) between {} and {}.",
            strength.to_lowercase(),
            direction.to_lowercase(),
            coefficient,
            metric_a,
            metric_b
        ),
    }
}

/// Trend analyzer for dashboard time series
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Analyze daily revenue
    pub fn analyze_revenue_trends(
        &self,
        revenue: &[CasinoRevenueItem],
        options: TrendAnalysisOptions,
    ) -> TrendAnalysisResult {
        let points: Vec<MetricPoint> = revenue
            .iter()
            .map(|r| MetricPoint::new(r.date, r.revenue))
            .collect();
        self.analyze_series(&points, REVENUE, options)
    }

    /// Analyze daily registrations, including the FTD conversion-rate sub-trend
    pub fn analyze_registration_trends(
        &self,
        registrations: &[PlayerRegistrationItem],
        options: TrendAnalysisOptions,
    ) -> TrendAnalysisResult {
        safely(
            "analyze_registration_trends",
            || {
                let points: Vec<MetricPoint> = registrations
                    .iter()
                    .map(|r| MetricPoint::new(r.date, f64::from(r.registrations)))
                    .collect();
                let mut result = self.analyze(&points, REGISTRATIONS, options)?;
                if registrations.len() < self.config.min_points {
                    return Ok(result);
                }

                let mut sorted: Vec<&PlayerRegistrationItem> = registrations.iter().collect();
                sorted.sort_by_key(|r| r.date);

                let rates: Vec<f64> = sorted
                    .iter()
                    .filter(|r| r.registrations > 0)
                    .map(|r| f64::from(r.first_time_depositors) / f64::from(r.registrations) * 100.0)
                    .collect();

                if let [first, .., last] = rates.as_slice() {
                    result
                        .segment_growth_rates
                        .insert("ConversionRate".to_string(), percentage_change(*first, *last));
                    result.additional_metrics.insert(
                        "AverageConversionRate".to_string(),
                        serde_json::json!(mean(&rates)),
                    );
                }

                Ok(result)
            },
            || TrendAnalysisResult::empty(REGISTRATIONS.metric_key),
        )
    }

    /// Revenue against registrations on the days both were recorded.
    ///
    /// Empty when fewer than three days line up.
    pub fn analyze_metric_correlations(&self, data: &DashboardData) -> Vec<MetricCorrelation> {
        safely(
            "analyze_metric_correlations",
            || {
                let pairs: Vec<(f64, f64)> = data
                    .casino_revenue
                    .iter()
                    .flat_map(|revenue| {
                        data.player_registrations
                            .iter()
                            .filter(move |registrations| registrations.date == revenue.date)
                            .map(move |registrations| (revenue.revenue, f64::from(registrations.registrations)))
                    })
                    .collect();
                if pairs.len() < 3 {
                    return Ok(Vec::new());
                }

                let (revenue, registrations): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
                ensure_finite(&revenue, "analyze_metric_correlations")?;

                Ok(vec![correlation(
                    REVENUE.metric_key,
                    REGISTRATIONS.metric_key,
                    pearson_correlation(&revenue, &registrations),
                )])
            },
            Vec::new,
        )
    }

    /// Analyze any dated series; failures yield a zeroed result for `label.metric_key`
    pub fn analyze_series(
        &self,
        points: &[MetricPoint],
        label: SeriesLabel<'_>,
        options: TrendAnalysisOptions,
    ) -> TrendAnalysisResult {
        safely(
            "analyze_series",
            || self.analyze(points, label, options),
            || TrendAnalysisResult::empty(label.metric_key),
        )
    }

    fn analyze(
        &self,
        points: &[MetricPoint],
        label: SeriesLabel<'_>,
        options: TrendAnalysisOptions,
    ) -> Result<TrendAnalysisResult, InsightsError> {
        let mut result = TrendAnalysisResult::empty(label.metric_key);
        if points.len() < self.config.min_points {
            return Ok(result);
        }

        let mut sorted = points.to_vec();
        sorted.sort_by_key(|p| p.date);
        let values: Vec<f64> = sorted.iter().map(|p| p.value).collect();
        ensure_finite(&values, label.metric_key)?;

        let (first, last) = match (values.first(), values.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(InsightsError::insufficient_data("analyze_series")),
        };
        result.percentage_change = percentage_change(first, last);
        result.trend_direction = self.direction(result.percentage_change);
        result.overall_trend_slope = index_regression(&values).0;

        if options.detect_patterns {
            result.identified_patterns = self.identify_patterns(&sorted, label);
        }
        if options.detect_outliers {
            result.outlier_points = self.detect_outliers(&sorted, label.metric_key);
        }
        if options.include_seasonality && sorted.len() >= self.config.seasonality_min_points {
            if let Some(cycle) = self.detect_seasonality(&sorted) {
                result.seasonality_detected = true;
                result.seasonal_cycle_days = Some(cycle);
            }
        }

        tracing::debug!(
            metric = label.metric_key,
            points = sorted.len(),
            patterns = result.identified_patterns.len(),
            outliers = result.outlier_points.len(),
            direction = %result.trend_direction,
            "Trend analysis complete"
        );

        Ok(result)
    }

    /// Increasing / Decreasing outside the stable band, Stable inside it
    pub fn direction(&self, percentage_change: f64) -> TrendDirection {
        if percentage_change > self.config.stable_band {
            TrendDirection::Increasing
        } else if percentage_change < -self.config.stable_band {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    /// Spike/dip scan over interior points plus a consistent run check on the
    /// trailing window. `points` must be sorted by date.
    fn identify_patterns(&self, points: &[MetricPoint], label: SeriesLabel<'_>) -> Vec<TrendPattern> {
        let mut patterns = Vec::new();
        if points.len() < self.config.min_points_for_spikes {
            return patterns;
        }

        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let avg = mean(&values);
        let threshold = self.config.spike_sigma * std_dev(&values);

        for window in points.windows(3) {
            let (prev, curr, next) = (window[0].value, window[1].value, window[2].value);
            let date = window[1].date;

            let pattern_type = if curr > prev + threshold && curr > next + threshold {
                PatternType::Spike
            } else if curr < prev - threshold && curr < next - threshold {
                PatternType::Dip
            } else {
                continue;
            };

            let distance = percentage_change(avg, curr).abs();
            let (kind, relation) = match pattern_type {
                PatternType::Spike => ("spike", "above"),
                _ => ("dip", "below"),
            };

            patterns.push(TrendPattern {
                pattern_type,
                start_date: date,
                end_date: date,
                description: format!(
                    "{} {} of {} on {}, which is {:.1}% {} average.",
                    capitalize(label.noun),
                    kind,
                    label.show(curr),
                    date.format("%Y-%m-%d"),
                    distance,
                    relation
                ),
                is_significant: true,
                confidence_score: self.config.spike_confidence,
            });
        }

        if let Some(run) = self.consistent_run(points, label) {
            patterns.push(run);
        }

        patterns
    }

    fn consistent_run(&self, points: &[MetricPoint], label: SeriesLabel<'_>) -> Option<TrendPattern> {
        let length = self.config.consistent_run_length;
        if points.len() < length {
            return None;
        }

        let run = &points[points.len() - length..];
        let increasing = run.windows(2).all(|w| w[1].value > w[0].value);
        let decreasing = run.windows(2).all(|w| w[1].value < w[0].value);
        if !increasing && !decreasing {
            return None;
        }

        let start = run[0];
        let end = run[run.len() - 1];
        let change = percentage_change(start.value, end.value);

        let (pattern_type, description) = if increasing {
            (
                PatternType::ConsistentIncrease,
                format!(
                    "Consistent daily {} increase over the past week, with total growth of {:.1}%.",
                    label.noun, change
                ),
            )
        } else {
            (
                PatternType::ConsistentDecrease,
                format!(
                    "Consistent daily {} decrease over the past week, with total decline of {:.1}%.",
                    label.noun,
                    change.abs()
                ),
            )
        };

        Some(TrendPattern {
            pattern_type,
            start_date: start.date,
            end_date: end.date,
            description,
            is_significant: change.abs() > self.config.significant_run_change,
            confidence_score: self.config.run_confidence,
        })
    }

    fn detect_outliers(&self, points: &[MetricPoint], metric_key: &str) -> Vec<DataPoint> {
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let avg = mean(&values);
        let threshold = self.config.outlier_sigma * std_dev(&values);

        points
            .iter()
            .filter(|p| (p.value - avg).abs() > threshold)
            .map(|p| DataPoint::single(p.date, metric_key, p.value))
            .collect()
    }

    /// Weekly cycle length when per-weekday averages differ enough, relative
    /// to their overall average
    fn detect_seasonality(&self, points: &[MetricPoint]) -> Option<u32> {
        let mut by_weekday: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for point in points {
            let entry = by_weekday
                .entry(point.date.weekday().num_days_from_monday())
                .or_insert((0.0, 0));
            entry.0 += point.value;
            entry.1 += 1;
        }

        let averages: Vec<f64> = by_weekday
            .values()
            .map(|(sum, count)| sum / *count as f64)
            .collect();
        let overall = mean(&averages);
        if overall == 0.0 {
            return None;
        }

        let max = averages.iter().copied().fold(f64::MIN, f64::max);
        let min = averages.iter().copied().fold(f64::MAX, f64::min);
        let relative_range = (max - min) / overall;

        (relative_range > self.config.seasonality_relative_range)
            .then_some(self.config.seasonal_cycle_days)
    }
}
