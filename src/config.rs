use crate::error::{env_error, BotResult, Error};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use url::Url;

/// Default activity text for the bot
pub const DEFAULT_ACTIVITY: &str = "Tuijottaa kalenteria";

/// Default upstream site hosting the Sugar Calendar widget
pub const DEFAULT_BASE_URL: &str = "https://oversightesports.com";

/// Default calendar block id on the upstream page
pub const DEFAULT_CALENDAR_ID: &str = "86b19402-2c15-4a33-9102-2b6a34ac6699";

/// Main configuration structure for the bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Base URL of the site hosting the Sugar Calendar widget
    pub calendar_base_url: String,
    /// Sugar Calendar block id to request
    pub calendar_id: String,
    /// Timezone used for day bucketing and time-of-day formatting
    pub timezone: String,
    /// Minutes between calendar refresh cycles
    pub refresh_interval_minutes: u64,
    /// Timeout for upstream HTTP requests, in seconds
    pub http_timeout_secs: u64,
    /// Redis connection URL
    pub redis_url: String,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
    /// Bot activity status text
    pub activity: String,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN").map_err(|_| env_error("DISCORD_TOKEN"))?;

        let calendar_base_url =
            env::var("CALENDAR_BASE_URL").unwrap_or_else(|_| String::from(DEFAULT_BASE_URL));

        // Reject unparsable base URLs up front rather than on the first fetch
        Url::parse(&calendar_base_url)
            .map_err(|e| Error::Config(format!("Invalid CALENDAR_BASE_URL: {}", e)))?;

        let calendar_id =
            env::var("CALENDAR_ID").unwrap_or_else(|_| String::from(DEFAULT_CALENDAR_ID));

        // The upstream widget converts event times to this zone as well
        let timezone = env::var("TIMEZONE").unwrap_or_else(|_| String::from("America/Chicago"));
        timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| Error::Config(format!("Invalid TIMEZONE: {}", timezone)))?;

        let refresh_interval_raw =
            env::var("REFRESH_INTERVAL_MINUTES").unwrap_or_else(|_| String::from("60"));
        let refresh_interval_minutes = refresh_interval_raw.parse::<u64>().map_err(|_| {
            Error::Config(format!(
                "Invalid REFRESH_INTERVAL_MINUTES: {}",
                refresh_interval_raw
            ))
        })?;

        let http_timeout_raw = env::var("HTTP_TIMEOUT_SECS").unwrap_or_else(|_| String::from("30"));
        let http_timeout_secs = http_timeout_raw.parse::<u64>().map_err(|_| {
            Error::Config(format!("Invalid HTTP_TIMEOUT_SECS: {}", http_timeout_raw))
        })?;

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| String::from("redis://127.0.0.1:6379"));

        // Bot activity status
        let activity = env::var("BOT_ACTIVITY").unwrap_or_else(|_| String::from(DEFAULT_ACTIVITY));

        // Initialize default components
        let mut components = HashMap::new();
        components.insert("sugar_calendar".to_string(), true);

        // Load components configuration from file if it exists
        if let Ok(content) = fs::read_to_string("config/components.toml") {
            if let Ok(file_components) = toml::from_str::<HashMap<String, bool>>(&content) {
                // Merge with defaults
                for (key, value) in file_components {
                    components.insert(key, value);
                }
            }
        }

        Ok(Config {
            discord_token,
            calendar_base_url,
            calendar_id,
            timezone,
            refresh_interval_minutes,
            http_timeout_secs,
            redis_url,
            components,
            activity,
        })
    }

    /// Parsed timezone for rendering and upstream conversion
    pub fn tz(&self) -> chrono_tz::Tz {
        // Validated in load(), fall back to UTC if the config was built by hand
        self.timezone.parse().unwrap_or(chrono_tz::Tz::UTC)
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            discord_token: String::new(),
            calendar_base_url: DEFAULT_BASE_URL.to_string(),
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            timezone: "America/Chicago".to_string(),
            refresh_interval_minutes: 60,
            http_timeout_secs: 30,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            components: HashMap::new(),
            activity: DEFAULT_ACTIVITY.to_string(),
        }
    }

    #[test]
    fn parses_configured_timezone() {
        let config = test_config();
        assert_eq!(config.tz(), chrono_tz::America::Chicago);
    }

    #[test]
    fn unknown_component_is_disabled() {
        let config = test_config();
        assert!(!config.is_component_enabled("sugar_calendar"));
    }

    #[test]
    fn unparsable_refresh_interval_is_a_config_error() {
        env::set_var("DISCORD_TOKEN", "test-token");
        env::set_var("REFRESH_INTERVAL_MINUTES", "soon");

        let err = Config::load().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        // The message names the variable and echoes the bad value
        assert!(err.to_string().contains("REFRESH_INTERVAL_MINUTES"));
        assert!(err.to_string().contains("soon"));

        env::remove_var("REFRESH_INTERVAL_MINUTES");
    }
}
