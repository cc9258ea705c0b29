//! Dashboard personalization
//!
//! Per-user preferences behind an async repository seam, a per-user TTL
//! cache in front of it, interaction tracking, and the metric rankings that
//! re-weight insights for a particular user.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::cache::TtlCache;
use crate::insights::{
    error::InsightsError,
    explanation::UserRole,
    types::DashboardInsight,
};
use crate::store::{InteractionLog, UserInteraction};

/// How long a user's preferences stay cached
pub const PREFERENCES_TTL: Duration = Duration::from_secs(15 * 60);

/// Interactions older than this no longer influence rankings
pub const INTERACTION_WINDOW_DAYS: i64 = 30;

const PINNED_METRIC_BONUS: u32 = 3;
const INTERACTION_BONUS: u32 = 1;
const RECOMMENDED_COMPONENTS: usize = 3;

const DEFAULT_DENSITY: &str = "medium";

/// Dashboard colours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSchemePreference {
    pub theme_name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub background_color: String,
    pub text_color: String,
    pub chart_colors: Vec<String>,
}

impl Default for ColorSchemePreference {
    fn default() -> Self {
        Self {
            theme_name: "default".to_string(),
            primary_color: "#1976d2".to_string(),
            secondary_color: "#dc004e".to_string(),
            background_color: "#f5f5f5".to_string(),
            text_color: "#333333".to_string(),
            chart_colors: ["#1976d2", "#dc004e", "#388e3c", "#f57c00", "#7b1fa2"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// A user's saved dashboard layout and filtering choices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPreferences {
    pub user_id: String,
    pub pinned_metrics: Vec<String>,
    /// Insights below this importance are hidden from the user
    pub insight_importance_threshold: u8,
    pub show_insights: bool,
    pub show_anomalies: bool,
    pub show_forecasts: bool,
    pub show_annotations: bool,
    pub information_density: String,
    #[serde(default)]
    pub color_scheme: ColorSchemePreference,
    pub default_time_range: String,
    pub default_data_granularity: u32,
    pub preferred_chart_types: BTreeMap<String, String>,
    pub component_visibility: BTreeMap<String, bool>,
    pub last_updated: chrono::DateTime<Utc>,
}

impl DashboardPreferences {
    /// Preferences used for users who never saved any
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            pinned_metrics: vec!["Revenue".into(), "Registrations".into(), "FTD".into()],
            insight_importance_threshold: 4,
            show_insights: true,
            show_anomalies: true,
            show_forecasts: true,
            show_annotations: true,
            information_density: DEFAULT_DENSITY.to_string(),
            color_scheme: ColorSchemePreference::default(),
            default_time_range: "week".to_string(),
            default_data_granularity: 7,
            preferred_chart_types: default_chart_types(),
            component_visibility: default_component_visibility(),
            last_updated: Utc::now(),
        }
    }
}

fn default_chart_types() -> BTreeMap<String, String> {
    [
        ("revenue", "line"),
        ("registrations", "bar"),
        ("topGames", "bar"),
        ("transactions", "table"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_component_visibility() -> BTreeMap<String, bool> {
    [
        "summary",
        "revenueChart",
        "registrationsChart",
        "topGames",
        "recentTransactions",
        "insights",
    ]
    .into_iter()
    .map(|k| (k.to_string(), true))
    .collect()
}

/// Baseline metric importance for a role, before pins and interactions
pub fn default_metric_rankings(role: UserRole) -> BTreeMap<String, u32> {
    let ranks: [(&str, u32); 7] = match role {
        UserRole::Admin => [
            ("Revenue", 10),
            ("Registrations", 8),
            ("FTD", 9),
            ("Deposits", 7),
            ("Cashouts", 6),
            ("Bets", 5),
            ("Wins", 4),
        ],
        UserRole::Marketing => [
            ("Revenue", 8),
            ("Registrations", 10),
            ("FTD", 9),
            ("Deposits", 7),
            ("Cashouts", 5),
            ("Bets", 6),
            ("Wins", 4),
        ],
        _ => [
            ("Revenue", 10),
            ("Registrations", 9),
            ("FTD", 8),
            ("Deposits", 7),
            ("Cashouts", 6),
            ("Bets", 5),
            ("Wins", 4),
        ],
    };
    ranks.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Threshold and metric weights used to re-rank insights for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRanking {
    pub importance_threshold: u8,
    pub metric_ranks: BTreeMap<String, u32>,
}

impl InsightRanking {
    pub fn new(importance_threshold: u8, metric_ranks: BTreeMap<String, u32>) -> Self {
        Self {
            importance_threshold,
            metric_ranks,
        }
    }

    pub fn rank(&self, metric_key: &str) -> u32 {
        self.metric_ranks.get(metric_key).copied().unwrap_or(0)
    }
}

impl Default for InsightRanking {
    fn default() -> Self {
        Self::new(4, default_metric_rankings(UserRole::General))
    }
}

/// Drop insights below the threshold, boost by half the metric rank (capped
/// at 10) and sort by the adjusted importance, highest first.
pub fn personalize_insights(
    insights: Vec<DashboardInsight>,
    ranking: &InsightRanking,
) -> Vec<DashboardInsight> {
    let mut kept: Vec<DashboardInsight> = insights
        .into_iter()
        .filter(|i| i.importance >= ranking.importance_threshold)
        .map(|mut insight| {
            let boosted = u32::from(insight.importance) + ranking.rank(&insight.metric_key) / 2;
            insight.importance = boosted.min(10) as u8;
            insight
        })
        .collect();
    kept.sort_by(|a, b| b.importance.cmp(&a.importance));
    kept
}

/// A dashboard widget suggested to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecommendation {
    pub component_id: String,
    pub component_type: String,
    pub title: String,
    pub description: String,
    /// Metric rank divided by 10
    pub relevance_score: f64,
    pub recommendation_reason: String,
    pub related_metrics: Vec<String>,
    pub target_user_role: UserRole,
    pub visualization_type: String,
    pub configuration: BTreeMap<String, serde_json::Value>,
}

/// Storage seam for saved preferences
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<DashboardPreferences>, InsightsError>;

    async fn save(&self, preferences: DashboardPreferences) -> Result<(), InsightsError>;
}

/// Process-local preferences store
#[derive(Debug, Default)]
pub struct InMemoryPreferencesRepository {
    records: RwLock<HashMap<String, DashboardPreferences>>,
}

impl InMemoryPreferencesRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferencesRepository for InMemoryPreferencesRepository {
    async fn find(&self, user_id: &str) -> Result<Option<DashboardPreferences>, InsightsError> {
        Ok(self.records.read().await.get(user_id).cloned())
    }

    async fn save(&self, preferences: DashboardPreferences) -> Result<(), InsightsError> {
        self.records
            .write()
            .await
            .insert(preferences.user_id.clone(), preferences);
        Ok(())
    }
}

/// Personalizes the dashboard for individual users
pub struct PersonalizationService {
    repository: Arc<dyn PreferencesRepository>,
    cache: RwLock<TtlCache<String, DashboardPreferences>>,
    interactions: RwLock<InteractionLog>,
}

impl PersonalizationService {
    pub fn new(repository: Arc<dyn PreferencesRepository>) -> Self {
        Self::with_ttl(repository, PREFERENCES_TTL)
    }

    pub fn with_ttl(repository: Arc<dyn PreferencesRepository>, ttl: Duration) -> Self {
        Self {
            repository,
            cache: RwLock::new(TtlCache::new(ttl)),
            interactions: RwLock::new(InteractionLog::default()),
        }
    }

    /// Saved preferences, or defaults for users who have none
    pub async fn preferences(&self, user_id: &str) -> Result<DashboardPreferences, InsightsError> {
        if let Some(cached) = self.cache.read().await.get(&user_id.to_string()) {
            return Ok(cached);
        }

        let preferences = self
            .repository
            .find(user_id)
            .await?
            .unwrap_or_else(|| DashboardPreferences::defaults_for(user_id));

        self.cache
            .write()
            .await
            .insert(user_id.to_string(), preferences.clone());
        Ok(preferences)
    }

    pub async fn save_preferences(
        &self,
        user_id: &str,
        mut preferences: DashboardPreferences,
    ) -> Result<(), InsightsError> {
        if user_id.trim().is_empty() {
            return Err(InsightsError::invalid_data("user id must not be empty"));
        }

        preferences.user_id = user_id.to_string();
        preferences.last_updated = Utc::now();
        self.repository.save(preferences).await?;
        self.cache.write().await.invalidate(&user_id.to_string());

        tracing::info!(user_id, "Saved dashboard preferences");
        Ok(())
    }

    pub async fn track_interaction(&self, interaction: UserInteraction) -> Result<(), InsightsError> {
        if interaction.user_id.trim().is_empty() || interaction.component_id.trim().is_empty() {
            return Err(InsightsError::invalid_data(
                "interaction needs a user id and a component id",
            ));
        }

        tracing::info!(
            user_id = %interaction.user_id,
            component_id = %interaction.component_id,
            "Tracked user interaction"
        );
        self.interactions.write().await.push(interaction);
        Ok(())
    }

    /// Role baseline, +3 per pinned metric and +1 per recent interaction
    pub async fn metric_importance_rankings(
        &self,
        user_id: &str,
        role: UserRole,
    ) -> Result<BTreeMap<String, u32>, InsightsError> {
        let preferences = self.preferences(user_id).await?;
        let since = Utc::now() - ChronoDuration::days(INTERACTION_WINDOW_DAYS);
        let recent = self.interactions.read().await.for_user_since(user_id, since);

        let mut rankings = default_metric_rankings(role);
        for metric in &preferences.pinned_metrics {
            if let Some(rank) = rankings.get_mut(metric) {
                *rank += PINNED_METRIC_BONUS;
            }
        }
        for metric in recent.iter().filter_map(|i| i.metric_key.as_deref()) {
            if let Some(rank) = rankings.get_mut(metric) {
                *rank += INTERACTION_BONUS;
            }
        }

        Ok(rankings)
    }

    /// Threshold plus rankings, ready for [`personalize_insights`]
    pub async fn insight_ranking(
        &self,
        user_id: &str,
        role: UserRole,
    ) -> Result<InsightRanking, InsightsError> {
        let preferences = self.preferences(user_id).await?;
        let ranks = self.metric_importance_rankings(user_id, role).await?;
        Ok(InsightRanking::new(preferences.insight_importance_threshold, ranks))
    }

    /// Chart components for the three highest-ranked metrics
    pub async fn recommended_components(
        &self,
        user_id: &str,
        role: UserRole,
    ) -> Result<Vec<ComponentRecommendation>, InsightsError> {
        let preferences = self.preferences(user_id).await?;
        let mut ranked: Vec<(String, u32)> = self
            .metric_importance_rankings(user_id, role)
            .await?
            .into_iter()
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(ranked
            .into_iter()
            .take(RECOMMENDED_COMPONENTS)
            .map(|(metric, rank)| {
                let lower = metric.to_lowercase();
                let configuration = BTreeMap::from([
                    ("metric".to_string(), serde_json::json!(metric)),
                    ("timeRange".to_string(), serde_json::json!(preferences.default_time_range)),
                    ("granularity".to_string(), serde_json::json!(preferences.default_data_granularity)),
                ]);
                ComponentRecommendation {
                    component_id: format!("{}-chart", lower),
                    component_type: "Chart".to_string(),
                    title: format!("{} Trend", metric),
                    description: format!("Shows the trend of {} over time", lower),
                    relevance_score: f64::from(rank) / 10.0,
                    recommendation_reason: format!(
                        "Based on your role and interaction history, {} is an important metric for you",
                        lower
                    ),
                    related_metrics: vec![metric.clone()],
                    target_user_role: role,
                    visualization_type: visualization_for(&metric, &preferences),
                    configuration,
                }
            })
            .collect())
    }

    pub async fn preferred_visualizations(
        &self,
        user_id: &str,
    ) -> Result<BTreeMap<String, String>, InsightsError> {
        let preferences = self.preferences(user_id).await?;
        if preferences.preferred_chart_types.is_empty() {
            Ok(default_chart_types())
        } else {
            Ok(preferences.preferred_chart_types)
        }
    }

    /// Saved information density; `"medium"` when it cannot be read
    pub async fn density_preference(&self, user_id: &str) -> String {
        if user_id.trim().is_empty() {
            return DEFAULT_DENSITY.to_string();
        }
        match self.preferences(user_id).await {
            Ok(preferences) => preferences.information_density,
            Err(err) => {
                tracing::error!(user_id, error = %err, "Failed to read density preference");
                DEFAULT_DENSITY.to_string()
            }
        }
    }

    /// Saved colour scheme; the default palette when it cannot be read
    pub async fn color_scheme(&self, user_id: &str) -> ColorSchemePreference {
        if user_id.trim().is_empty() {
            return ColorSchemePreference::default();
        }
        match self.preferences(user_id).await {
            Ok(preferences) => preferences.color_scheme,
            Err(err) => {
                tracing::error!(user_id, error = %err, "Failed to read colour scheme");
                ColorSchemePreference::default()
            }
        }
    }

    /// Re-rank `insights` for `user_id`; on any failure the input comes back unchanged
    pub async fn personalized_insights(
        &self,
        user_id: &str,
        insights: Vec<DashboardInsight>,
    ) -> Vec<DashboardInsight> {
        if insights.is_empty() {
            return insights;
        }
        match self.insight_ranking(user_id, UserRole::General).await {
            Ok(ranking) => personalize_insights(insights, &ranking),
            Err(err) => {
                tracing::error!(user_id, error = %err, "Failed to personalize insights, returning them unchanged");
                insights
            }
        }
    }
}

fn visualization_for(metric_key: &str, preferences: &DashboardPreferences) -> String {
    let lower = metric_key.to_lowercase();
    if let Some(chart) = preferences.preferred_chart_types.get(&lower) {
        return chart.clone();
    }
    match lower.as_str() {
        "registrations" | "ftd" => "bar",
        _ => "line",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::types::InsightDirection;

    struct FailingRepository;

    #[async_trait]
    impl PreferencesRepository for FailingRepository {
        async fn find(&self, _user_id: &str) -> Result<Option<DashboardPreferences>, InsightsError> {
            Err(InsightsError::storage_error("database unavailable"))
        }

        async fn save(&self, _preferences: DashboardPreferences) -> Result<(), InsightsError> {
            Err(InsightsError::storage_error("database unavailable"))
        }
    }

    fn service() -> PersonalizationService {
        PersonalizationService::new(Arc::new(InMemoryPreferencesRepository::new()))
    }

    fn insight(metric: &str, importance: u8) -> DashboardInsight {
        DashboardInsight::pattern(metric, "desc", "Summary", importance, metric, InsightDirection::Neutral)
    }

    fn click(user: &str, metric: &str) -> UserInteraction {
        UserInteraction {
            user_id: user.to_string(),
            component_id: format!("{}-chart", metric.to_lowercase()),
            interaction_type: "click".to_string(),
            metric_key: Some(metric.to_string()),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unknown_user_gets_defaults() {
        let prefs = service().preferences("u1").await.unwrap();
        assert_eq!(prefs.user_id, "u1");
        assert_eq!(prefs.insight_importance_threshold, 4);
        assert_eq!(prefs.pinned_metrics, vec!["Revenue", "Registrations", "FTD"]);
    }

    #[tokio::test]
    async fn saving_invalidates_only_that_users_cache_entry() {
        let service = service();
        let _ = service.preferences("alice").await.unwrap();
        let bob_before = service.preferences("bob").await.unwrap();

        let mut updated = DashboardPreferences::defaults_for("alice");
        updated.insight_importance_threshold = 7;
        service.save_preferences("alice", updated).await.unwrap();

        assert_eq!(service.preferences("alice").await.unwrap().insight_importance_threshold, 7);
        assert_eq!(service.preferences("bob").await.unwrap(), bob_before);
    }

    #[tokio::test]
    async fn save_rejects_empty_user_id() {
        let result = service()
            .save_preferences("  ", DashboardPreferences::defaults_for("x"))
            .await;
        assert!(matches!(result, Err(InsightsError::InvalidData { .. })));
    }

    #[tokio::test]
    async fn rankings_add_pins_and_recent_interactions() {
        let service = service();
        service.track_interaction(click("u1", "Bets")).await.unwrap();
        service.track_interaction(click("u1", "Bets")).await.unwrap();
        service.track_interaction(click("u2", "Wins")).await.unwrap();

        let ranks = service.metric_importance_rankings("u1", UserRole::General).await.unwrap();

        assert_eq!(ranks["Revenue"], 13);
        assert_eq!(ranks["Registrations"], 12);
        assert_eq!(ranks["FTD"], 11);
        assert_eq!(ranks["Bets"], 7);
        assert_eq!(ranks["Wins"], 4);
    }

    #[tokio::test]
    async fn marketing_recommendations_follow_role_baseline() {
        let recs = service()
            .recommended_components("u1", UserRole::Marketing)
            .await
            .unwrap();

        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].component_id, "registrations-chart");
        assert_eq!(recs[0].visualization_type, "bar");
        assert!((recs[0].relevance_score - 1.3).abs() < 1e-9);
        assert_eq!(recs[1].title, "FTD Trend");
        assert_eq!(recs[2].visualization_type, "line");
    }

    #[tokio::test]
    async fn track_interaction_requires_component() {
        let mut interaction = click("u1", "Revenue");
        interaction.component_id.clear();
        assert!(service().track_interaction(interaction).await.is_err());
    }

    #[tokio::test]
    async fn personalized_insights_filter_and_boost() {
        let insights = vec![insight("Revenue", 5), insight("Wins", 3), insight("GameType", 6)];
        let result = service().personalized_insights("u1", insights).await;

        assert_eq!(result.len(), 2);
        // Revenue rank 13 adds 6, capped at 10
        assert_eq!(result[0].metric_key, "Revenue");
        assert_eq!(result[0].importance, 10);
        assert_eq!(result[1].metric_key, "GameType");
        assert_eq!(result[1].importance, 6);
    }

    #[tokio::test]
    async fn personalized_insights_return_input_when_storage_fails() {
        let service = PersonalizationService::new(Arc::new(FailingRepository));
        let insights = vec![insight("Wins", 1)];
        let result = service.personalized_insights("u1", insights.clone()).await;
        assert_eq!(result, insights);
    }

    #[tokio::test]
    async fn density_and_colours_follow_saved_preferences() {
        let service = service();
        let mut prefs = DashboardPreferences::defaults_for("u1");
        prefs.information_density = "compact".to_string();
        prefs.color_scheme.theme_name = "dark".to_string();
        service.save_preferences("u1", prefs).await.unwrap();

        assert_eq!(service.density_preference("u1").await, "compact");
        assert_eq!(service.color_scheme("u1").await.theme_name, "dark");
        assert_eq!(service.density_preference("u2").await, "medium");
        assert_eq!(service.color_scheme("u2").await, ColorSchemePreference::default());
    }

    #[tokio::test]
    async fn density_and_colours_fall_back_when_storage_fails() {
        let service = PersonalizationService::new(Arc::new(FailingRepository));
        assert_eq!(service.density_preference("u1").await, "medium");
        assert_eq!(service.color_scheme("u1").await, ColorSchemePreference::default());
        assert_eq!(service.density_preference("").await, "medium");
    }

    #[test]
    fn personalize_insights_is_stable_for_equal_importance() {
        let ranking = InsightRanking::new(0, BTreeMap::new());
        let result = personalize_insights(vec![insight("A", 5), insight("B", 5)], &ranking);
        assert_eq!(result[0].metric_key, "A");
        assert_eq!(result[1].metric_key, "B");
    }
}
