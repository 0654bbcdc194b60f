//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("REPORT_TIMEZONE is not a known IANA zone: {0}")]
    UnknownTimezone(String),
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `REPORT_TIMEZONE`: IANA zone for report day boundaries (default `UTC`)
/// - `DATABASE_URL`: PostgreSQL store; the in-memory store is used when unset
/// - `CATALOG_PATH`: JSON product list; a built-in menu is used when unset
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub report_timezone: Tz,
    pub database_url: Option<String>,
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let report_timezone = match non_empty("REPORT_TIMEZONE") {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::UnknownTimezone(name.clone()))?,
            None => defaults.report_timezone,
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            report_timezone,
            database_url: non_empty("DATABASE_URL"),
            catalog_path: non_empty("CATALOG_PATH").map(PathBuf::from),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            report_timezone: Tz::UTC,
            database_url: None,
            catalog_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.report_timezone, Tz::UTC);
        assert!(config.database_url.is_none());
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("REPORT_TIMEZONE", "Asia/Ho_Chi_Minh"),
            ("DATABASE_URL", "postgres://cafe@localhost/cafe"),
            ("CATALOG_PATH", "/etc/cafe/menu.json"),
        ])
        .unwrap();
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.report_timezone, Tz::Asia__Ho_Chi_Minh);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://cafe@localhost/cafe")
        );
        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/etc/cafe/menu.json"))
        );
    }

    #[test]
    fn test_bad_port_falls_back() {
        let config = from_pairs(&[("PORT", "not-a-port")]).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = from_pairs(&[("DATABASE_URL", ""), ("REPORT_TIMEZONE", " ")]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.report_timezone, Tz::UTC);
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let err = from_pairs(&[("REPORT_TIMEZONE", "Mars/Olympus")]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownTimezone("Mars/Olympus".to_string()));
    }
}
