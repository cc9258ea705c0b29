//! Contextual explanations for metrics, insights and anomalies
//!
//! Static lookup tables keyed by metric and user role. Unknown metrics get a
//! generic sentence built from the key; unknown roles are treated as General.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::insights::types::{DashboardInsight, DataAnomaly, InsightDirection, InsightType};

/// Dashboard audience, used to pick the business framing of explanations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum UserRole {
    Executive,
    Finance,
    Marketing,
    Admin,
    #[default]
    General,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Executive => "Executive",
            UserRole::Finance => "Finance",
            UserRole::Marketing => "Marketing",
            UserRole::Admin => "Admin",
            UserRole::General => "General",
        }
    }

    fn is_financial(&self) -> bool {
        matches!(self, UserRole::Finance | UserRole::Executive)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = std::convert::Infallible;

    /// Case-insensitive; anything unrecognised is General
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = match s.trim().to_ascii_lowercase().as_str() {
            "executive" => UserRole::Executive,
            "finance" => UserRole::Finance,
            "marketing" => UserRole::Marketing,
            "admin" => UserRole::Admin,
            _ => UserRole::General,
        };
        Ok(role)
    }
}

/// Experience levels at or below this get the beginner elaboration
pub const BEGINNER_MAX_LEVEL: u8 = 2;

/// Metrics shown in the dashboard summary strip
pub const SUMMARY_METRICS: [&str; 4] = ["Revenue", "Registrations", "FTD", "ActivePlayers"];

/// Everything known about one metric for a given audience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricExplanation {
    pub metric_key: String,
    pub name: String,
    pub description: String,
    pub business_impact: String,
    pub related_metrics: Vec<String>,
    pub interpretation_guidance: String,
    pub recommended_actions: Vec<String>,
    pub role_specific_explanations: BTreeMap<String, String>,
    pub experience_level_explanations: BTreeMap<u8, String>,
}

/// Produces canned explanation text
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplanationGenerator;

impl ExplanationGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn short_description(&self, metric_key: &str) -> String {
        match metric_key {
            "Revenue" => "Total revenue generated from player activity.".to_string(),
            "Registrations" => "Number of new player registrations.".to_string(),
            "FTD" => "Number of players who made their first deposit.".to_string(),
            "ActivePlayers" => "Number of players who have been active in the selected period.".to_string(),
            "Bets" => "Total amount wagered by players.".to_string(),
            "Wins" => "Total amount won by players.".to_string(),
            "GGR" => "Gross Gaming Revenue (bets minus wins).".to_string(),
            "Bonus" => "Total bonus amount given to players.".to_string(),
            "NGR" => "Net Gaming Revenue (GGR minus bonuses).".to_string(),
            other => format!("Measurement of {}.", other.to_lowercase()),
        }
    }

    pub fn detailed_description(&self, metric_key: &str, experience_level: u8) -> String {
        let base = match metric_key {
            "Revenue" => "Revenue represents the total monetary value generated from player activity, including bets placed minus wins paid out, adjusted for bonuses and promotions.".to_string(),
            "Registrations" => "Registrations count the number of new players who have created an account during the selected time period.".to_string(),
            "FTD" => "First Time Depositors (FTD) are players who have made their first real money deposit during the selected time period.".to_string(),
            "ActivePlayers" => "Active Players count unique players who have placed at least one bet during the selected time period.".to_string(),
            other => format!("{} is a key performance indicator tracked on the dashboard.", other),
        };

        if experience_level > BEGINNER_MAX_LEVEL {
            return base;
        }

        let elaboration = match metric_key {
            "Revenue" => "It's a primary indicator of business performance and growth.",
            "Registrations" => "This is a leading indicator for future revenue potential and reflects the effectiveness of acquisition strategies.",
            "FTD" => "The conversion from registration to first deposit is a critical step in the player journey and a key indicator of acquisition quality.",
            "ActivePlayers" => "This metric helps measure player engagement and retention, which are key drivers of sustainable revenue.",
            _ => return base,
        };
        format!("{} {}", base, elaboration)
    }

    pub fn business_context(&self, metric_key: &str, role: UserRole) -> String {
        let known = if role.is_financial() {
            match metric_key {
                "Revenue" => Some("Revenue directly impacts financial performance and is a key component of financial reporting and forecasting."),
                "Registrations" => Some("Registrations are a leading indicator for future revenue potential and reflect the effectiveness of player acquisition investments."),
                "FTD" => Some("First Time Depositors represent the conversion of marketing spend to revenue-generating customers and are a key indicator of acquisition quality."),
                "ActivePlayers" => Some("Active Players represent the engaged customer base that generates ongoing revenue and indicates the health of the player lifecycle."),
                _ => None,
            }
        } else if role == UserRole::Marketing {
            match metric_key {
                "Revenue" => Some("Revenue is the ultimate outcome of marketing efforts and helps measure marketing ROI."),
                "Registrations" => Some("Registrations are a direct result of acquisition campaigns and a key performance indicator for marketing effectiveness."),
                "FTD" => Some("First Time Depositors measure the quality of acquired players and the effectiveness of onboarding and conversion strategies."),
                "ActivePlayers" => Some("Active Players reflect the success of retention strategies and the overall player experience."),
                _ => None,
            }
        } else {
            match metric_key {
                "Revenue" => Some("Revenue is a key business metric that indicates overall performance."),
                "Registrations" => Some("Registrations show how many new players are joining the platform."),
                "FTD" => Some("First Time Depositors show how many new players are converting to paying customers."),
                "ActivePlayers" => Some("Active Players indicate how many players are engaged with the platform."),
                _ => None,
            }
        };

        match known {
            Some(text) => text.to_string(),
            None if role.is_financial() => {
                format!("{} is an important metric for business performance analysis.", metric_key)
            }
            None if role == UserRole::Marketing => {
                format!("{} helps measure the effectiveness of marketing strategies.", metric_key)
            }
            None => format!("{} is an important metric for business operations.", metric_key),
        }
    }

    pub fn related_metrics(&self, metric_key: &str) -> Vec<String> {
        let related: &[&str] = match metric_key {
            "Revenue" => &["GGR", "NGR", "ARPU", "Bets", "Wins"],
            "Registrations" => &["FTD", "Conversion Rate", "CPA", "Marketing Spend"],
            "FTD" => &["Registrations", "Conversion Rate", "Average First Deposit", "Deposit Success Rate"],
            "ActivePlayers" => &["DAU", "MAU", "Retention Rate", "Churn Rate", "Session Length"],
            _ => &[],
        };
        related.iter().map(|m| m.to_string()).collect()
    }

    pub fn recommended_actions(&self, metric_key: &str, role: UserRole) -> Vec<String> {
        let actions: &[&str] = if role.is_financial() {
            match metric_key {
                "Revenue" => &["Compare against forecast and budget", "Analyze revenue by segment and product", "Review margin and profitability"],
                "Registrations" => &["Analyze acquisition cost and ROI", "Review conversion to FTD", "Compare against marketing spend"],
                "FTD" => &["Analyze conversion rates from registration", "Review average first deposit amount", "Assess early player value"],
                "ActivePlayers" => &["Review retention and churn metrics", "Analyze player lifetime value", "Assess engagement by segment"],
                _ => &["Review trend over time", "Compare against targets"],
            }
        } else if role == UserRole::Marketing {
            match metric_key {
                "Revenue" => &["Analyze revenue by marketing channel", "Review marketing ROI", "Identify high-value player segments"],
                "Registrations" => &["Analyze registration sources", "Review acquisition campaign performance", "Optimize landing pages and registration flow"],
                "FTD" => &["Review onboarding experience", "Analyze deposit incentives effectiveness", "Optimize deposit flow and payment methods"],
                "ActivePlayers" => &["Review engagement campaigns", "Analyze retention strategies", "Develop reactivation campaigns for inactive players"],
                _ => &["Analyze by marketing channel", "Review campaign impact"],
            }
        } else {
            match metric_key {
                "Revenue" => &["Review trend over time", "Analyze by product and segment"],
                "Registrations" => &["Monitor registration flow", "Review by source"],
                "FTD" => &["Review conversion funnel", "Analyze by player segment"],
                "ActivePlayers" => &["Monitor engagement metrics", "Review by player type"],
                _ => &["Monitor trend over time"],
            }
        };
        actions.iter().map(|a| a.to_string()).collect()
    }

    /// All explanation facets of one metric
    pub fn metric_explanation(
        &self,
        metric_key: &str,
        role: UserRole,
        experience_level: u8,
    ) -> MetricExplanation {
        let context = self.business_context(metric_key, role);
        let detailed = self.detailed_description(metric_key, experience_level);

        MetricExplanation {
            metric_key: metric_key.to_string(),
            name: metric_key.to_string(),
            description: self.short_description(metric_key),
            business_impact: context.clone(),
            related_metrics: self.related_metrics(metric_key),
            interpretation_guidance: detailed.clone(),
            recommended_actions: self.recommended_actions(metric_key, role),
            role_specific_explanations: BTreeMap::from([(role.to_string(), context)]),
            experience_level_explanations: BTreeMap::from([(experience_level, detailed)]),
        }
    }

    pub fn summary_metric_explanations(
        &self,
        role: UserRole,
        experience_level: u8,
    ) -> BTreeMap<String, MetricExplanation> {
        SUMMARY_METRICS
            .iter()
            .map(|metric| {
                (
                    metric.to_string(),
                    self.metric_explanation(metric, role, experience_level),
                )
            })
            .collect()
    }

    /// Plain-language reading of an insight, by insight type
    pub fn insight_explanation(&self, insight: &DashboardInsight) -> String {
        let positive = insight.trend_direction == InsightDirection::Positive;
        let metric = &insight.metric_key;

        match insight.insight_type {
            InsightType::Anomaly => format!(
                "This anomaly shows an unusual pattern in {} that deviates significantly from expected values. \
                 Based on historical data, this {} change is noteworthy and may require attention.",
                metric,
                if positive { "positive" } else { "negative" }
            ),
            InsightType::Pattern => format!(
                "This trend shows a consistent {} movement in {} over the analyzed period. \
                 The {} indicates a {} direction that may {}.",
                if positive { "upward" } else { "downward" },
                metric,
                if positive { "increase" } else { "decrease" },
                if positive { "positive" } else { "concerning" },
                if positive { "continue" } else { "require intervention" }
            ),
            InsightType::Correlation => format!(
                "This correlation shows a relationship between {} and another metric. \
                 When one metric changes, the other tends to change in a {} direction, \
                 which can help with forecasting and understanding cause-effect relationships.",
                metric,
                if positive { "similar" } else { "opposite" }
            ),
            InsightType::Forecast => format!(
                "This forecast predicts how {} may perform in the coming period based on historical patterns. \
                 The projected {} can help with planning and setting expectations.",
                metric,
                if positive { "increase" } else { "decrease" }
            ),
        }
    }

    /// Why an anomaly matters to the given audience
    pub fn anomaly_explanation(&self, anomaly: &DataAnomaly, role: UserRole) -> String {
        let mut explanation = format!(
            "This {} anomaly is significant because ",
            anomaly.category.to_lowercase()
        );

        if anomaly.severity >= 4 {
            explanation.push_str("it represents a major deviation from expected values. ");
        } else {
            explanation.push_str("it shows a notable deviation from expected patterns. ");
        }

        let rising = anomaly.is_positive();
        let magnitude = anomaly.deviation_percentage.abs();
        let metric = anomaly.metric_key.to_lowercase();

        if role.is_financial() {
            explanation.push_str(&format!(
                "The financial impact could be significant, with a {:.1}% {} in {}.",
                magnitude,
                if rising { "increase" } else { "decrease" },
                metric
            ));
        } else if role == UserRole::Marketing {
            explanation.push_str(&format!(
                "This may indicate that recent marketing activities have {} impacted {}.",
                if rising { "positively" } else { "negatively" },
                metric
            ));
        } else {
            explanation.push_str(&format!(
                "This represents a {:.1}% {} compared to expected values.",
                magnitude,
                if rising { "increase" } else { "decrease" }
            ));
        }

        if let Some(cause) = anomaly.primary_cause().filter(|c| !c.is_empty()) {
            explanation.push(' ');
            explanation.push_str(cause);
        }

        explanation
    }

    /// What a change of `change` percent in `metric_key` means for the business
    pub fn business_impact(&self, metric_key: &str, change: f64, role: UserRole) -> String {
        let up = change >= 0.0;
        let movement = format!("{:.1}% {}", change.abs(), if up { "increase" } else { "decrease" });

        let pick = |positive: &str, negative: &str| -> String {
            if up { positive.to_string() } else { negative.to_string() }
        };

        match metric_key {
            "Revenue" => {
                let tail = if role.is_financial() {
                    format!(
                        "directly impacts the bottom line. {}",
                        pick(
                            "This positive trend contributes to improved financial performance.",
                            "This negative trend may require attention to prevent financial impact.",
                        )
                    )
                } else if role == UserRole::Marketing {
                    pick(
                        "suggests that marketing strategies are effective in driving business growth.",
                        "may indicate that marketing strategies need to be reevaluated.",
                    )
                } else {
                    pick(
                        "is a positive indicator for business performance.",
                        "may require investigation to identify root causes.",
                    )
                };
                format!("A {} in revenue {}", movement, tail)
            }
            "Registrations" => {
                let tail = if role == UserRole::Marketing {
                    pick(
                        "indicates effective acquisition strategies and potentially higher future revenue.",
                        "suggests that acquisition strategies may need adjustment to maintain growth.",
                    )
                } else {
                    pick(
                        "is a leading indicator for future revenue growth.",
                        "may lead to reduced revenue in upcoming periods if not addressed.",
                    )
                };
                format!("A {} in registrations {}", movement, tail)
            }
            "FTD" => {
                let tail = if role == UserRole::Finance {
                    pick(
                        "is a strong indicator of future revenue growth and customer lifetime value.",
                        "may signal reduced future revenue streams and customer acquisition issues.",
                    )
                } else {
                    pick(
                        "indicates effective conversion of registrations to paying customers.",
                        "suggests potential issues with onboarding or initial customer experience.",
                    )
                };
                format!("A {} in first-time depositors {}", movement, tail)
            }
            other => format!(
                "The {} in {} {}",
                movement,
                other,
                pick(
                    "is generally a positive indicator for business performance.",
                    "may require further investigation to understand root causes.",
                )
            ),
        }
    }

    /// Glossary of industry terms, extended for beginners and by role
    pub fn terminology(&self, role: UserRole, experience_level: u8) -> BTreeMap<String, String> {
        let mut terms: Vec<(&str, &str)> = vec![
            ("FTD", "First Time Depositor - A player who has made their first deposit."),
            ("GGR", "Gross Gaming Revenue - Total bets minus total wins, before any deductions."),
            ("NGR", "Net Gaming Revenue - Gross Gaming Revenue minus bonuses and promotions."),
            ("Churn", "The rate at which players stop using the platform over a given period."),
            ("LTV", "Lifetime Value - The predicted revenue a player will generate during their entire relationship."),
            ("Conversion Rate", "The percentage of visitors or registrants who complete a desired action (e.g., deposit)."),
            ("ARPU", "Average Revenue Per User - Total revenue divided by the number of users."),
            ("KPI", "Key Performance Indicator - Metrics used to evaluate success in meeting objectives."),
        ];

        if experience_level <= BEGINNER_MAX_LEVEL {
            terms.extend([
                ("Retention Rate", "The percentage of players who continue to use the platform after a specific period."),
                ("CPA", "Cost Per Acquisition - The average cost to acquire a new player."),
                ("ROI", "Return On Investment - The ratio between net profit and cost of investment."),
            ]);
        }

        match role {
            UserRole::Finance => terms.extend([
                ("EBITDA", "Earnings Before Interest, Taxes, Depreciation, and Amortization - A measure of operational profitability."),
                ("Margin", "The difference between revenue and cost, expressed as a percentage of revenue."),
            ]),
            UserRole::Marketing => terms.extend([
                ("CTR", "Click-Through Rate - The ratio of users who click on a specific link to the number of total users who view a page or email."),
                ("CPC", "Cost Per Click - The amount paid for each click in a pay-per-click marketing campaign."),
            ]),
            _ => {}
        }

        terms
            .into_iter()
            .map(|(term, meaning)| (term.to_string(), meaning.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn anomaly(deviation: f64, severity: u8) -> DataAnomaly {
        DataAnomaly {
            title: "Revenue Anomaly".to_string(),
            description: String::new(),
            category: "Revenue".to_string(),
            metric_key: "Revenue".to_string(),
            detected_at: Utc::now(),
            date: Utc::now().date_naive(),
            actual_value: 150.0,
            expected_value: 100.0,
            deviation_percentage: deviation,
            severity,
            possible_causes: vec!["Promotion ran.".to_string()],
            recommended_actions: Vec::new(),
        }
    }

    #[test]
    fn role_parsing_is_case_insensitive_with_general_fallback() {
        assert_eq!("finance".parse::<UserRole>().unwrap(), UserRole::Finance);
        assert_eq!(" EXECUTIVE ".parse::<UserRole>().unwrap(), UserRole::Executive);
        assert_eq!("croupier".parse::<UserRole>().unwrap(), UserRole::General);
    }

    #[test]
    fn unknown_metric_uses_generic_descriptions() {
        let generator = ExplanationGenerator::new();
        assert_eq!(generator.short_description("Sessions"), "Measurement of sessions.");
        assert_eq!(
            generator.business_context("Sessions", UserRole::Marketing),
            "Sessions helps measure the effectiveness of marketing strategies."
        );
        assert!(generator.related_metrics("Sessions").is_empty());
    }

    #[test]
    fn beginners_get_an_extra_sentence() {
        let generator = ExplanationGenerator::new();
        let expert = generator.detailed_description("Revenue", 4);
        let beginner = generator.detailed_description("Revenue", 2);
        assert!(beginner.starts_with(&expert));
        assert!(beginner.ends_with("primary indicator of business performance and growth."));
        assert_eq!(generator.detailed_description("Sessions", 1), generator.detailed_description("Sessions", 5));
    }

    #[test]
    fn executive_and_finance_share_financial_framing() {
        let generator = ExplanationGenerator::new();
        assert_eq!(
            generator.business_context("Revenue", UserRole::Executive),
            generator.business_context("Revenue", UserRole::Finance)
        );
        assert_eq!(generator.recommended_actions("FTD", UserRole::Admin).len(), 2);
        assert_eq!(generator.recommended_actions("FTD", UserRole::Finance).len(), 3);
    }

    #[test]
    fn summary_explanations_cover_four_metrics() {
        let generator = ExplanationGenerator::new();
        let explanations = generator.summary_metric_explanations(UserRole::General, 3);
        assert_eq!(explanations.len(), 4);
        let active = &explanations["ActivePlayers"];
        assert_eq!(active.related_metrics.len(), 5);
        assert!(active.role_specific_explanations.contains_key("General"));
        assert!(active.experience_level_explanations.contains_key(&3));
    }

    #[test]
    fn anomaly_explanation_for_finance_mentions_magnitude() {
        let generator = ExplanationGenerator::new();
        let text = generator.anomaly_explanation(&anomaly(-42.26, 5), UserRole::Finance);
        assert!(text.starts_with("This revenue anomaly is significant because it represents a major deviation"));
        assert!(text.contains("42.3% decrease in revenue."));
        assert!(text.ends_with(" Promotion ran."));
    }

    #[test]
    fn business_impact_for_unknown_metric() {
        let generator = ExplanationGenerator::new();
        assert_eq!(
            generator.business_impact("Bets", 12.0, UserRole::General),
            "The 12.0% increase in Bets is generally a positive indicator for business performance."
        );
    }

    #[test]
    fn terminology_grows_for_beginners_and_finance() {
        let generator = ExplanationGenerator::new();
        assert_eq!(generator.terminology(UserRole::General, 3).len(), 8);
        let terms = generator.terminology(UserRole::Finance, 1);
        assert_eq!(terms.len(), 13);
        assert!(terms.contains_key("EBITDA"));
        assert!(terms.contains_key("CPA"));
    }
}
