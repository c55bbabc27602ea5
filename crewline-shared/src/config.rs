//! Configuration loaded from the environment
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool ceiling (default: 10)
//! - `DATABASE_MIN_CONNECTIONS`: warm connections (default: 2)
//! - `DATABASE_CONNECT_TIMEOUT_SECONDS`: acquire timeout (default: 30)
//! - `ENGINE_TRANSACTION_TIMEOUT_MS`: per-unit deadline (default: none)
//! - `INVITATION_TTL_HOURS`: invitation lifetime (default: 72)
//! - `TEXT_ANALYSIS_URL`: skill extraction service base URL (optional)
//! - `RECOMMENDATION_URL`: recommendation service base URL (optional)
//! - `COLLABORATOR_TIMEOUT_MS`: deadline for collaborator calls (default: 5000)
//! - `LOG_FORMAT`: `json` for JSON logs, anything else for text (default: text)
//!
//! A `.env` file in the working directory is loaded first when present.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::db::pool::DatabaseConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Log output format for binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Settings the engine itself needs, independent of how the store is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Deadline for a single unit of work (None = unbounded)
    pub transaction_timeout: Option<Duration>,

    /// How long an invitation stays acceptable
    pub invitation_ttl: chrono::Duration,

    /// Deadline for the post-onboarding notification
    pub notify_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            transaction_timeout: None,
            invitation_ttl: chrono::Duration::hours(72),
            notify_timeout: Duration::from_millis(5000),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub engine: EngineSettings,
    pub text_analysis_url: Option<String>,
    pub recommendation_url: Option<String>,
    pub collaborator_timeout: Duration,
    pub log_format: LogFormat,
}

impl EngineConfig {
    /// Loads `.env` (if any) and reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let defaults = DatabaseConfig::default();

        let database = DatabaseConfig {
            url,
            max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: parse_or(&get, "DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_seconds: parse_or(
                &get,
                "DATABASE_CONNECT_TIMEOUT_SECONDS",
                defaults.connect_timeout_seconds,
            )?,
            ..defaults
        };

        let transaction_timeout = match get("ENGINE_TRANSACTION_TIMEOUT_MS") {
            Some(raw) => Some(Duration::from_millis(parse_value(
                "ENGINE_TRANSACTION_TIMEOUT_MS",
                &raw,
            )?)),
            None => None,
        };

        let ttl_hours: i64 = parse_or(&get, "INVITATION_TTL_HOURS", 72)?;
        if ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "INVITATION_TTL_HOURS",
                value: ttl_hours.to_string(),
            });
        }

        let collaborator_timeout =
            Duration::from_millis(parse_or(&get, "COLLABORATOR_TIMEOUT_MS", 5000u64)?);

        let log_format = match get("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
            Some(f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            database,
            engine: EngineSettings {
                transaction_timeout,
                invitation_ttl: chrono::Duration::hours(ttl_hours),
                notify_timeout: collaborator_timeout,
            },
            text_analysis_url: get("TEXT_ANALYSIS_URL"),
            recommendation_url: get("RECOMMENDATION_URL"),
            collaborator_timeout,
            log_format,
        })
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            EngineConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/crewline")]))
                .unwrap();

        assert_eq!(config.database.url, "postgres://localhost/crewline");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.engine, EngineSettings::default());
        assert_eq!(config.text_analysis_url, None);
        assert_eq!(config.collaborator_timeout, Duration::from_millis(5000));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/crewline"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("ENGINE_TRANSACTION_TIMEOUT_MS", "1500"),
            ("INVITATION_TTL_HOURS", "24"),
            ("TEXT_ANALYSIS_URL", "http://nlp:8000"),
            ("COLLABORATOR_TIMEOUT_MS", "250"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.database.max_connections, 25);
        assert_eq!(
            config.engine.transaction_timeout,
            Some(Duration::from_millis(1500))
        );
        assert_eq!(config.engine.invitation_ttl, chrono::Duration::hours(24));
        assert_eq!(config.engine.notify_timeout, Duration::from_millis(250));
        assert_eq!(config.text_analysis_url.as_deref(), Some("http://nlp:8000"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_database_url() {
        let err = EngineConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_number() {
        let err = EngineConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/crewline"),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/crewline"),
            ("INVITATION_TTL_HOURS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "INVITATION_TTL_HOURS", .. }));
    }
}
