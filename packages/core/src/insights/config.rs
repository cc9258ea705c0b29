//! Configuration for the insights pipeline
//!
//! Every threshold used by the detector, trend analyzer, forecaster and
//! story builder lives here so it can be tuned from one place.

use serde::{Deserialize, Serialize};

use crate::insights::error::InsightsError;

/// Configuration for the insight generator and its components
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InsightsConfig {
    pub anomaly: AnomalyConfig,
    pub trend: TrendConfig,
    pub forecast: ForecastConfig,
    pub story: StoryConfig,
}

/// Severity buckets on |deviation %|: 5 above `critical`, 4 above `major`, else 3
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBands {
    pub critical: f64,
    pub major: f64,
}

impl SeverityBands {
    pub const fn new(critical: f64, major: f64) -> Self {
        Self { critical, major }
    }

    pub fn classify(&self, deviation_percentage: f64) -> u8 {
        let magnitude = deviation_percentage.abs();
        if magnitude > self.critical {
            5
        } else if magnitude > self.major {
            4
        } else {
            3
        }
    }
}

/// Configuration for anomaly detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Minimum series length before z-scores are computed
    pub min_points: usize,
    /// z-score threshold for revenue, registrations, FTD and games
    pub z_threshold: f64,
    /// z-score threshold for individual transaction amounts
    pub transaction_z_threshold: f64,
    /// Neighbours on each side averaged into the expected value
    pub expected_value_window: usize,
    pub series_severity: SeverityBands,
    pub game_severity: SeverityBands,
    pub transaction_severity: SeverityBands,
    /// Failed share of transactions (percent) above which an anomaly is raised
    pub failed_rate_threshold: f64,
    /// Failure rate (percent) considered normal
    pub expected_failed_rate: f64,
    pub failed_rate_severity: SeverityBands,
    /// Day-over-day change (percent) that makes a summary metric anomalous
    pub summary_change_threshold: f64,
    pub summary_critical_change: f64,
}

/// Configuration for trend analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// |percentage change| at or below which a trend is Stable
    pub stable_band: f64,
    pub min_points: usize,
    pub min_points_for_spikes: usize,
    pub spike_sigma: f64,
    pub outlier_sigma: f64,
    pub consistent_run_length: usize,
    /// Cumulative change (percent) that makes a consistent run significant
    pub significant_run_change: f64,
    pub spike_confidence: f64,
    pub run_confidence: f64,
    pub seasonality_min_points: usize,
    pub seasonality_relative_range: f64,
    pub seasonal_cycle_days: u32,
}

/// Configuration for regression forecasts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub min_history: usize,
    /// Relative jitter applied to each forecast value (0.05 = ±5%)
    pub jitter: f64,
    pub base_confidence: f64,
    pub confidence_decay: f64,
    pub base_interval_width: f64,
    pub interval_growth: f64,
}

/// Configuration for story assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryConfig {
    pub max_key_insights: usize,
    pub max_recommended_actions: usize,
    pub highlight_importance: u8,
    pub max_highlight_insights: usize,
    pub opportunity_importance: u8,
    pub risk_importance: u8,
    pub max_analysis_insights: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_points: 3,
            z_threshold: 2.0,
            transaction_z_threshold: 3.0,
            expected_value_window: 3,
            series_severity: SeverityBands::new(30.0, 20.0),
            game_severity: SeverityBands::new(50.0, 30.0),
            transaction_severity: SeverityBands::new(100.0, 50.0),
            failed_rate_threshold: 10.0,
            expected_failed_rate: 5.0,
            failed_rate_severity: SeverityBands::new(20.0, 15.0),
            summary_change_threshold: 20.0,
            summary_critical_change: 30.0,
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            stable_band: 5.0,
            min_points: 2,
            min_points_for_spikes: 5,
            spike_sigma: 2.0,
            outlier_sigma: 3.0,
            consistent_run_length: 7,
            significant_run_change: 10.0,
            spike_confidence: 0.9,
            run_confidence: 0.8,
            seasonality_min_points: 14,
            seasonality_relative_range: 0.2,
            seasonal_cycle_days: 7,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_history: 7,
            jitter: 0.05,
            base_confidence: 0.8,
            confidence_decay: 0.02,
            base_interval_width: 0.1,
            interval_growth: 0.01,
        }
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            max_key_insights: 5,
            max_recommended_actions: 3,
            highlight_importance: 8,
            max_highlight_insights: 2,
            opportunity_importance: 6,
            risk_importance: 7,
            max_analysis_insights: 2,
        }
    }
}

impl InsightsConfig {
    /// Check the configuration for values that would make the pipeline meaningless
    pub fn validate(&self) -> Result<(), InsightsError> {
        let thresholds = [
            ("anomaly.z_threshold", self.anomaly.z_threshold),
            ("anomaly.transaction_z_threshold", self.anomaly.transaction_z_threshold),
            ("trend.spike_sigma", self.trend.spike_sigma),
            ("trend.outlier_sigma", self.trend.outlier_sigma),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(InsightsError::config_error(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        let minimums = [
            ("anomaly.min_points", self.anomaly.min_points, 3),
            ("trend.min_points", self.trend.min_points, 2),
            ("forecast.min_history", self.forecast.min_history, 2),
        ];
        for (name, value, floor) in minimums {
            if value < floor {
                return Err(InsightsError::config_error(format!(
                    "{} must be at least {}, got {}",
                    name, floor, value
                )));
            }
        }

        if self.trend.consistent_run_length < 2 {
            return Err(InsightsError::config_error(
                "trend.consistent_run_length must be at least 2",
            ));
        }

        if !(0.0..1.0).contains(&self.forecast.jitter) {
            return Err(InsightsError::config_error(
                "forecast.jitter must be in [0, 1)",
            ));
        }

        if self.story.max_key_insights == 0 {
            return Err(InsightsError::config_error(
                "story.max_key_insights must be greater than zero",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(InsightsConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_z_threshold_is_rejected() {
        let mut config = InsightsConfig::default();
        config.anomaly.z_threshold = 0.0;
        assert!(matches!(
            config.validate(),
            Err(InsightsError::ConfigError { .. })
        ));
    }

    #[test]
    fn anomaly_min_points_below_three_is_rejected() {
        let mut config = InsightsConfig::default();
        config.anomaly.min_points = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("anomaly.min_points must be at least 3"));
    }

    #[test]
    fn empty_trend_and_forecast_minimums_are_rejected() {
        let mut config = InsightsConfig::default();
        config.trend.min_points = 0;
        assert!(config.validate().is_err());

        let mut config = InsightsConfig::default();
        config.forecast.min_history = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn jitter_of_one_is_rejected() {
        let mut config = InsightsConfig::default();
        config.forecast.jitter = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn severity_bands_are_exclusive_at_the_boundary() {
        let bands = SeverityBands::new(30.0, 20.0);
        assert_eq!(bands.classify(30.0), 4);
        assert_eq!(bands.classify(30.1), 5);
        assert_eq!(bands.classify(-25.0), 4);
        assert_eq!(bands.classify(20.0), 3);
    }
}
