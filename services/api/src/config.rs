//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::FixedOffset;
use habit_tracker_core::GapPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Offset in which "the same calendar day" is decided.
    pub calendar_zone: FixedOffset,
    pub gap_policy: GapPolicy,
    pub cors_origin: String,
    pub credential_cache_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str = get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            get("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = get("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Habit Rules ---
        let offset_minutes = match get("CALENDAR_UTC_OFFSET_MINUTES") {
            Some(raw) => raw.trim().parse::<i32>().map_err(|e| {
                ConfigError::InvalidValue("CALENDAR_UTC_OFFSET_MINUTES".to_string(), e.to_string())
            })?,
            None => 0,
        };
        let calendar_zone = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CALENDAR_UTC_OFFSET_MINUTES".to_string(),
                    format!("{} minutes is not a valid UTC offset", offset_minutes),
                )
            })?;

        let gap_policy = match get("STREAK_GAP_POLICY") {
            Some(raw) => raw.parse::<GapPolicy>().map_err(|e| {
                ConfigError::InvalidValue("STREAK_GAP_POLICY".to_string(), e.to_string())
            })?,
            None => GapPolicy::default(),
        };

        // --- Command-line Client ---
        let credential_cache_path = get("CREDENTIAL_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_credential_cache_path);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            calendar_zone,
            gap_policy,
            cors_origin,
            credential_cache_path,
        })
    }
}

fn default_credential_cache_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("habit-tracker")
        .join("credentials.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_source(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/habits")]).unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.calendar_zone.local_minus_utc(), 0);
        assert_eq!(config.gap_policy, GapPolicy::Unconditional);
        assert!(config.credential_cache_path.ends_with("credentials.json"));
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(var)) if var == "DATABASE_URL"));
    }

    #[test]
    fn habit_rules_are_read_from_the_environment() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/habits"),
            ("CALENDAR_UTC_OFFSET_MINUTES", "-300"),
            ("STREAK_GAP_POLICY", "reset_after_allowed_misses"),
        ])
        .unwrap();

        assert_eq!(config.calendar_zone.local_minus_utc(), -300 * 60);
        assert_eq!(config.gap_policy, GapPolicy::ResetAfterAllowedMisses);
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/habits"),
            ("CALENDAR_UTC_OFFSET_MINUTES", "1500"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "CALENDAR_UTC_OFFSET_MINUTES"));
    }

    #[test]
    fn unknown_gap_policy_is_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/habits"),
            ("STREAK_GAP_POLICY", "forgiving"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "STREAK_GAP_POLICY"));
    }
}
