//! Prometheus metrics registry for the insights pipeline.
//!
//! [`InsightsMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and hand it to
//! the insight generator.
//!
//! The binary prints the registry in Prometheus text exposition format
//! when run with `--metrics`.

use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry};

/// All pipeline-level Prometheus metrics.
pub struct InsightsMetrics {
    /// Total number of dashboard stories assembled.
    pub stories_generated_total: Counter,
    /// Insights produced, labelled by dashboard domain.
    pub insights_generated_total: CounterVec,
    /// Anomalies promoted to insights, labelled by dashboard domain.
    pub anomalies_detected_total: CounterVec,
    /// Pipeline stages that failed and fell back, labelled by operation.
    pub stage_failures_total: CounterVec,
    /// Story assembly latency histogram in seconds.
    pub story_duration_seconds: Histogram,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl InsightsMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let stories_generated_total = Counter::with_opts(Opts::new(
            "dashboard_insights_stories_generated_total",
            "Dashboard stories assembled",
        ))?;

        let insights_generated_total = CounterVec::new(
            Opts::new(
                "dashboard_insights_insights_generated_total",
                "Insights produced by domain",
            ),
            &["domain"],
        )?;

        let anomalies_detected_total = CounterVec::new(
            Opts::new(
                "dashboard_insights_anomalies_detected_total",
                "Anomalies promoted to insights by domain",
            ),
            &["domain"],
        )?;

        let stage_failures_total = CounterVec::new(
            Opts::new(
                "dashboard_insights_stage_failures_total",
                "Pipeline stages that failed and returned a fallback",
            ),
            &["operation"],
        )?;

        let story_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "dashboard_insights_story_duration_seconds",
                "Story assembly latency in seconds",
            )
            .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
        )?;

        registry.register(Box::new(stories_generated_total.clone()))?;
        registry.register(Box::new(insights_generated_total.clone()))?;
        registry.register(Box::new(anomalies_detected_total.clone()))?;
        registry.register(Box::new(stage_failures_total.clone()))?;
        registry.register(Box::new(story_duration_seconds.clone()))?;

        Ok(Self {
            stories_generated_total,
            insights_generated_total,
            anomalies_detected_total,
            stage_failures_total,
            story_duration_seconds,
            registry,
        })
    }

    /// Render all metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metrics_register_without_error() {
        let metrics = InsightsMetrics::new();
        assert!(metrics.is_ok(), "InsightsMetrics::new() failed: {:?}", metrics.err());
    }

    #[test]
    fn render_produces_non_empty_output_after_increment() {
        let metrics = InsightsMetrics::new().unwrap();
        metrics.stories_generated_total.inc();
        let output = metrics.render().unwrap();
        assert!(output.contains("dashboard_insights_stories_generated_total 1"));
    }

    #[test]
    fn domain_counters_are_labelled() {
        let metrics = InsightsMetrics::new().unwrap();
        metrics
            .insights_generated_total
            .with_label_values(&["revenue"])
            .inc_by(3.0);
        metrics
            .anomalies_detected_total
            .with_label_values(&["games"])
            .inc();

        let revenue = metrics
            .insights_generated_total
            .with_label_values(&["revenue"])
            .get();
        assert!((revenue - 3.0).abs() < f64::EPSILON);

        let output = metrics.render().unwrap();
        assert!(output.contains("domain=\"games\""));
    }

    #[test]
    fn histogram_records_observations() {
        let metrics = InsightsMetrics::new().unwrap();
        metrics.story_duration_seconds.observe(0.002);
        assert_eq!(metrics.story_duration_seconds.get_sample_count(), 1);
    }
}
