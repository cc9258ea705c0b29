//! Regression Forecasts
//!
//! Extrapolates a least-squares line over the history, perturbs each value by
//! a small relative jitter and attaches a band that widens with the horizon.

use chrono::Days;
use rand::Rng;
use std::sync::Arc;

use crate::insights::{
    calculator::index_regression,
    config::ForecastConfig,
    error::{ensure_finite, safely, InsightsError},
    types::{DataPoint, ForecastPoint},
};

/// Source of the multiplicative factor applied to each forecast value
pub trait JitterSource: Send + Sync {
    /// Factor in `[1 - max_jitter, 1 + max_jitter]`
    fn factor(&self, max_jitter: f64) -> f64;
}

/// Uniform random jitter from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn factor(&self, max_jitter: f64) -> f64 {
        if max_jitter <= 0.0 {
            return 1.0;
        }
        1.0 + rand::thread_rng().gen_range(-max_jitter..=max_jitter)
    }
}

/// Always applies the same relative offset, clamped to the allowed jitter
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn factor(&self, max_jitter: f64) -> f64 {
        1.0 + self.0.clamp(-max_jitter.abs(), max_jitter.abs())
    }
}

/// Linear-regression forecaster
#[derive(Clone)]
pub struct Forecaster {
    config: ForecastConfig,
    jitter: Arc<dyn JitterSource>,
}

impl std::fmt::Debug for Forecaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forecaster")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

impl Forecaster {
    /// Forecaster with random jitter
    pub fn new(config: ForecastConfig) -> Self {
        Self::with_jitter(config, Arc::new(RandomJitter))
    }

    pub fn with_jitter(config: ForecastConfig, jitter: Arc<dyn JitterSource>) -> Self {
        Self { config, jitter }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast `days` points past the last dated value of `metric_key`.
    ///
    /// Points without the metric are ignored. Fewer than the configured
    /// minimum history, or `days == 0`, gives an empty forecast.
    pub fn generate_forecast(
        &self,
        metric_key: &str,
        history: &[DataPoint],
        days: u32,
    ) -> Vec<ForecastPoint> {
        safely(
            "generate_forecast",
            || self.forecast(metric_key, history, days),
            Vec::new,
        )
    }

    fn forecast(
        &self,
        metric_key: &str,
        history: &[DataPoint],
        days: u32,
    ) -> Result<Vec<ForecastPoint>, InsightsError> {
        if days == 0 {
            return Ok(Vec::new());
        }

        let mut observed: Vec<(chrono::NaiveDate, f64)> = history
            .iter()
            .filter_map(|p| p.value(metric_key).map(|v| (p.timestamp, v)))
            .collect();
        if observed.len() < self.config.min_history {
            return Ok(Vec::new());
        }
        observed.sort_by_key(|(date, _)| *date);

        let values: Vec<f64> = observed.iter().map(|(_, v)| *v).collect();
        ensure_finite(&values, metric_key)?;

        let (slope, intercept) = index_regression(&values);
        let n = values.len() as f64;
        let (last_date, last_value) = *observed
            .last()
            .ok_or_else(|| InsightsError::insufficient_data("generate_forecast"))?;

        let mut forecast = Vec::with_capacity(days as usize);
        for i in 1..=days {
            let step = f64::from(i);
            let date = last_date
                .checked_add_days(Days::new(u64::from(i)))
                .ok_or_else(|| {
                    InsightsError::calculation_error(format!(
                        "forecast date overflow {} days after {}",
                        i, last_date
                    ))
                })?;

            let value = (intercept + slope * (n + step - 1.0)) * self.jitter.factor(self.config.jitter);
            let confidence = self.config.base_confidence - self.config.confidence_decay * step;
            let width = last_value.abs()
                * (self.config.base_interval_width + self.config.interval_growth * step);

            forecast.push(ForecastPoint {
                point: DataPoint::single(date, metric_key, value),
                lower_bound: value - width,
                upper_bound: value + width,
                confidence_interval: confidence,
            });
        }

        tracing::debug!(metric = metric_key, history = values.len(), days, "Forecast generated");
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn history(values: &[f64]) -> Vec<DataPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DataPoint::single(start + Duration::days(i as i64), "Revenue", *v))
            .collect()
    }

    fn steady() -> Forecaster {
        Forecaster::with_jitter(ForecastConfig::default(), Arc::new(FixedJitter(0.0)))
    }

    #[test]
    fn needs_seven_points_of_history() {
        let forecaster = steady();
        assert!(forecaster
            .generate_forecast("Revenue", &history(&[1.0; 6]), 5)
            .is_empty());
    }

    #[test]
    fn zero_minimum_history_with_no_points_gives_empty_forecast() {
        let forecaster = Forecaster::with_jitter(
            ForecastConfig {
                min_history: 0,
                ..ForecastConfig::default()
            },
            Arc::new(FixedJitter(0.0)),
        );
        assert!(forecaster.generate_forecast("Revenue", &[], 3).is_empty());
    }

    #[test]
    fn zero_days_gives_empty_forecast() {
        assert!(steady()
            .generate_forecast("Revenue", &history(&[1.0; 10]), 0)
            .is_empty());
    }

    #[test]
    fn other_metric_keys_are_ignored() {
        assert!(steady()
            .generate_forecast("FTD", &history(&[1.0; 10]), 3)
            .is_empty());
    }

    #[test]
    fn extrapolates_regression_line() {
        let values: Vec<f64> = (0..7).map(|i| 100.0 + 10.0 * i as f64).collect();
        let forecast = steady().generate_forecast("Revenue", &history(&values), 3);

        assert_eq!(forecast.len(), 3);
        assert!((forecast[0].point.value("Revenue").unwrap() - 170.0).abs() < 1e-9);
        assert!((forecast[2].point.value("Revenue").unwrap() - 190.0).abs() < 1e-9);
        assert_eq!(forecast[0].point.label, "2024-05-08");
        assert_eq!(forecast[2].point.timestamp, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
    }

    #[test]
    fn band_widens_and_confidence_drops() {
        let values: Vec<f64> = (0..7).map(|i| 100.0 + i as f64).collect();
        let forecast = steady().generate_forecast("Revenue", &history(&values), 5);

        // last value 106, day 1 width = 106 * 0.11
        assert!((forecast[0].interval_width() - 11.66).abs() < 1e-9);
        assert!((forecast[0].confidence_interval - 0.78).abs() < 1e-9);
        for pair in forecast.windows(2) {
            assert!(pair[1].confidence_interval < pair[0].confidence_interval);
            assert!(pair[1].interval_width() > pair[0].interval_width());
        }
    }

    #[test]
    fn fixed_jitter_scales_values() {
        let forecaster = Forecaster::with_jitter(ForecastConfig::default(), Arc::new(FixedJitter(0.05)));
        let forecast = forecaster.generate_forecast("Revenue", &history(&[100.0; 7]), 1);
        assert!((forecast[0].point.value("Revenue").unwrap() - 105.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_jitter_is_clamped_to_configured_range() {
        assert!((FixedJitter(0.5).factor(0.05) - 1.05).abs() < 1e-12);
        assert!((FixedJitter(-0.5).factor(0.05) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn random_jitter_stays_in_range() {
        for _ in 0..200 {
            let factor = RandomJitter.factor(0.05);
            assert!((0.95..=1.05).contains(&factor));
        }
        assert_eq!(RandomJitter.factor(0.0), 1.0);
    }
}
