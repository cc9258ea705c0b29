//! Dashboard Insights Module
//!
//! Statistical insight pipeline over casino dashboard data: anomaly
//! detection, trend analysis, regression forecasts, canned explanations
//! and the narrative dashboard story, plus the personalization and
//! annotation services that sit beside it.

pub mod annotations;
pub mod calculator;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod explanation;
pub mod forecast;
pub mod format;
pub mod personalization;
pub mod trend;
pub mod types;

mod tests;

pub use annotations::{AnnotationService, DataAnnotation, NewAnnotation};
pub use config::InsightsConfig;
pub use detector::AnomalyDetector;
pub use engine::InsightGenerator;
pub use error::InsightsError;
pub use explanation::{ExplanationGenerator, UserRole};
pub use forecast::{FixedJitter, Forecaster, JitterSource, RandomJitter};
pub use personalization::{
    ColorSchemePreference, InMemoryPreferencesRepository, InsightRanking, PersonalizationService,
    PreferencesRepository,
};
pub use trend::TrendAnalyzer;
pub use types::*;
