use std::path::PathBuf;

use clap::Parser;

/// Dashboard insights CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "dashboard-insights",
    version,
    about = "Narrative insights, anomalies and forecasts for casino dashboard data"
)]
pub struct Cli {
    /// JSON file holding the dashboard data (summary, revenue, registrations, games, transactions)
    #[arg(long)]
    pub input: PathBuf,

    /// Audience for explanations (Executive, Finance, Marketing, Admin, General)
    #[arg(long)]
    pub role: Option<String>,

    /// Reader experience level from 1 (beginner) to 5 (expert)
    #[arg(long)]
    pub experience_level: Option<u8>,

    /// Days of revenue to forecast
    #[arg(long)]
    pub forecast_days: Option<u32>,

    /// Re-rank the story for this user's saved preferences
    #[arg(long)]
    pub user: Option<String>,

    /// Include explanations of the summary metrics
    #[arg(long)]
    pub explain: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    pub metrics: bool,
}
