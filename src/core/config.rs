//! Environment-driven configuration
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add TIMEZONE and WEBHOOK_URL
//! - 1.0.0: Initial implementation

use anyhow::Result;
use chrono_tz::Tz;

/// Runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_path: String,
    /// IANA zone used to resolve clock/date commands and render list output
    pub timezone: Tz,
    /// Base URL of the chat deployment, used for synthesized deep links
    pub chat_base_url: String,
    /// Path to the username -> address directory file
    pub directory_path: String,
    /// Optional webhook endpoint for deliveries; console output when unset
    pub webhook_url: Option<String>,
    /// Sender address attributed to console input
    pub console_address: String,
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults suitable for local development.
    pub fn from_env() -> Result<Self> {
        let timezone_name =
            std::env::var("TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow::anyhow!("unknown TIMEZONE '{timezone_name}': {e}"))?;

        Ok(Config {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "nudge.db".to_string()),
            timezone,
            chat_base_url: std::env::var("CHAT_BASE_URL")
                .unwrap_or_else(|_| "https://chat.example.com".to_string()),
            directory_path: std::env::var("DIRECTORY_PATH")
                .unwrap_or_else(|_| "users.yaml".to_string()),
            webhook_url: std::env::var("WEBHOOK_URL").ok(),
            console_address: std::env::var("CONSOLE_ADDRESS")
                .unwrap_or_else(|_| "operator@localhost".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // Only assert on fields no test environment is expected to override
        let config = Config::from_env().unwrap();
        assert!(!config.database_path.is_empty());
        assert!(!config.chat_base_url.is_empty());
        assert!(!config.log_level.is_empty());
    }

    #[test]
    fn test_timezone_parses_known_zone() {
        let tz: Tz = "America/Montreal".parse().unwrap();
        assert_eq!(tz.name(), "America/Montreal");
    }
}
