use std::env;

use crate::cli::Cli;
use crate::insights::UserRole;

pub const DEFAULT_EXPERIENCE_LEVEL: u8 = 3;
pub const DEFAULT_FORECAST_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub user_role: UserRole,
    pub experience_level: u8,
    pub forecast_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_role: UserRole::General,
            experience_level: DEFAULT_EXPERIENCE_LEVEL,
            forecast_days: DEFAULT_FORECAST_DAYS,
        }
    }
}

fn validate_experience_level(level: u8) -> Result<u8, String> {
    if (1..=5).contains(&level) {
        Ok(level)
    } else {
        Err(format!("INSIGHTS_EXPERIENCE_LEVEL must be between 1 and 5, got {}", level))
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from any variable source; unset variables fall back to defaults.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = Self::default();

        // UserRole parsing is infallible: unknown roles become General
        let user_role = get("INSIGHTS_USER_ROLE")
            .map(|role| role.parse().unwrap_or_default())
            .unwrap_or(defaults.user_role);

        let experience_level = match get("INSIGHTS_EXPERIENCE_LEVEL") {
            Some(raw) => validate_experience_level(
                raw.trim()
                    .parse::<u8>()
                    .map_err(|_| "INSIGHTS_EXPERIENCE_LEVEL must be a valid number")?,
            )?,
            None => defaults.experience_level,
        };

        let forecast_days = match get("INSIGHTS_FORECAST_DAYS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| "INSIGHTS_FORECAST_DAYS must be a valid number")?,
            None => defaults.forecast_days,
        };

        Ok(Self {
            user_role,
            experience_level,
            forecast_days,
        })
    }

    /// Command-line flags take precedence over the environment.
    pub fn with_overrides(mut self, cli: &Cli) -> Result<Self, String> {
        if let Some(role) = &cli.role {
            self.user_role = role.parse().unwrap_or_default();
        }
        if let Some(level) = cli.experience_level {
            self.experience_level = validate_experience_level(level)?;
        }
        if let Some(days) = cli.forecast_days {
            self.forecast_days = days;
        }
        Ok(self)
    }
}
