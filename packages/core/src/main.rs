use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use serde::Serialize;

use dashboard_insights::cli::Cli;
use dashboard_insights::config::Config;
use dashboard_insights::error::AppError;
use dashboard_insights::insights::{
    explanation::MetricExplanation, DashboardData, DashboardInsight, DashboardStory, DataPoint,
    ForecastPoint, InMemoryPreferencesRepository, InsightGenerator, InsightsConfig,
    PersonalizationService,
};
use dashboard_insights::logging::init_logging;
use dashboard_insights::metrics::InsightsMetrics;

/// Everything the binary prints to stdout
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    story: DashboardStory,
    revenue_forecast: Vec<ForecastPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    forecast_insight: Option<DashboardInsight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanations: Option<BTreeMap<String, MetricExplanation>>,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    let config = Config::from_env()
        .and_then(|config| config.with_overrides(&cli))
        .map_err(AppError::Config)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });

    tracing::info!("Generating dashboard insights with config: {:?}", config);

    if let Err(err) = run(&cli, &config).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, config: &Config) -> Result<(), AppError> {
    let raw = fs::read_to_string(&cli.input)
        .map_err(|e| AppError::Input(format!("{}: {}", cli.input.display(), e)))?;
    let data: DashboardData = serde_json::from_str(&raw)
        .map_err(|e| AppError::Input(format!("{}: {}", cli.input.display(), e)))?;

    let insights_config = InsightsConfig::default();
    insights_config
        .validate()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let metrics = Arc::new(InsightsMetrics::new().map_err(|e| AppError::Config(e.to_string()))?);
    let generator = InsightGenerator::new(insights_config).with_metrics(metrics.clone());

    let story = match &cli.user {
        Some(user_id) => {
            let personalization =
                PersonalizationService::new(Arc::new(InMemoryPreferencesRepository::new()));
            match personalization.insight_ranking(user_id, config.user_role).await {
                Ok(ranking) => generator.personalized_story(&data, &ranking),
                Err(err) => {
                    tracing::warn!(user_id = %user_id, error = %err, "Falling back to the unpersonalized story");
                    generator.dashboard_story(&data)
                }
            }
        }
        None => generator.dashboard_story(&data),
    };

    let history: Vec<DataPoint> = data
        .casino_revenue
        .iter()
        .map(|r| DataPoint::single(r.date, "Revenue", r.revenue))
        .collect();
    let revenue_forecast = generator
        .forecaster()
        .generate_forecast("Revenue", &history, config.forecast_days);
    let forecast_insight = generator.summarize_forecast("Revenue", &history, &revenue_forecast);

    let explanations = cli.explain.then(|| {
        generator
            .explanations()
            .summary_metric_explanations(config.user_role, config.experience_level)
    });

    tracing::info!(
        key_insights = story.key_insights.len(),
        anomalies = story.significant_anomalies.len(),
        forecast_days = revenue_forecast.len(),
        "Dashboard story ready"
    );

    let report = Report {
        story,
        revenue_forecast,
        forecast_insight,
        explanations,
    };
    let json = serde_json::to_string_pretty(&report).map_err(|e| AppError::Output(e.to_string()))?;
    println!("{}", json);

    if cli.metrics {
        let rendered = metrics.render().map_err(|e| AppError::Output(e.to_string()))?;
        eprintln!("{}", rendered);
    }

    Ok(())
}
