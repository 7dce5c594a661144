use std::time::Duration;

use babytrack_core::TableNames;
use thiserror::Error;

/// Parse a duration string into a [`Duration`].
///
/// Accepts either:
/// - Human-readable shorthand via `humantime` (e.g. "30s", "1m", "1m30s")
/// - Raw seconds as a plain integer (e.g. "30")
pub fn parse_duration(s: &str) -> Option<Duration> {
    if let Ok(d) = humantime::parse_duration(s) {
        return Some(d);
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    None
}

/// Default request timeout: 30 seconds.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which [`babytrack_core::TrackerStore`] backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    DynamoDb,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Service configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub request_timeout: Duration,
    pub storage: StorageBackend,
    pub log_format: LogFormat,
    pub tables: TableNames,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid REQUEST_TIMEOUT {0:?}")]
    Timeout(String),

    #[error("invalid STORAGE {0:?}: expected dynamodb or memory")]
    Storage(String),

    #[error("invalid LOG_FORMAT {0:?}: expected text or json")]
    LogFormat(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let request_timeout = match lookup("REQUEST_TIMEOUT") {
            Some(raw) => parse_duration(&raw).ok_or(ConfigError::Timeout(raw))?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let storage = match var("STORAGE", "dynamodb").as_str() {
            "dynamodb" => StorageBackend::DynamoDb,
            "memory" => StorageBackend::Memory,
            other => return Err(ConfigError::Storage(other.to_string())),
        };

        let log_format = match var("LOG_FORMAT", "text").as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => return Err(ConfigError::LogFormat(other.to_string())),
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR", "0.0.0.0:3000"),
            request_timeout,
            storage,
            log_format,
            tables: TableNames {
                users: var("USERS_TABLE", "babytrack-users"),
                babies: var("BABIES_TABLE", "babytrack-babies"),
                entries: var("TRACKER_TABLE", "babytrack-tracker-entries"),
                checklist: var("CHECKLIST_TABLE", "babytrack-checklist-status"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_humantime_seconds() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
    }

    #[test]
    fn parse_humantime_compound() {
        assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
    }

    #[test]
    fn parse_raw_seconds() {
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
    }

    #[test]
    fn parse_invalid() {
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("-5"), None);
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(cfg.storage, StorageBackend::DynamoDb);
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert_eq!(cfg.tables.entries, "babytrack-tracker-entries");
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("STORAGE", "memory"),
            ("REQUEST_TIMEOUT", "5s"),
            ("LOG_FORMAT", "json"),
            ("BABIES_TABLE", "prod-babies"),
        ])
        .unwrap();
        assert_eq!(cfg.storage, StorageBackend::Memory);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.tables.babies, "prod-babies");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(config(&[("STORAGE", "postgres")]), Err(ConfigError::Storage(_))));
        assert!(matches!(config(&[("REQUEST_TIMEOUT", "later")]), Err(ConfigError::Timeout(_))));
        assert!(matches!(config(&[("LOG_FORMAT", "xml")]), Err(ConfigError::LogFormat(_))));
    }
}
