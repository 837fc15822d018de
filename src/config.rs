//! Runtime configuration.
//!
//! Values are read once at process start from the environment. Every setting
//! has a default so a bare `cargo run` works against a local `citizens.db`.
//!
//! | Variable | Default |
//! |---|---|
//! | `REGISTRY_DB_PATH` | `citizens.db` (`:memory:` allowed) |
//! | `REGISTRY_BIND_ADDR` | `0.0.0.0:3000` |
//! | `REGISTRY_FAILED_AUTH_ALERT` | `10` |
//! | `REGISTRY_LOG_FILE` | `citizen-registry.log` |

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "REGISTRY_DB_PATH";
pub const ENV_BIND_ADDR: &str = "REGISTRY_BIND_ADDR";
pub const ENV_FAILED_AUTH_ALERT: &str = "REGISTRY_FAILED_AUTH_ALERT";
pub const ENV_LOG_FILE: &str = "REGISTRY_LOG_FILE";

pub const DEFAULT_DB_PATH: &str = "citizens.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_FAILED_AUTH_ALERT: i64 = 10;
pub const DEFAULT_LOG_FILE: &str = "citizen-registry.log";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must not be empty")]
    Empty { var: &'static str },

    #[error("{var}={value:?} is not a valid socket address")]
    InvalidAddr { var: &'static str, value: String },

    #[error("{var}={value:?} is not a non-negative integer")]
    InvalidThreshold { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Listen address for the HTTP server
    pub bind_addr: SocketAddr,

    /// Failed authentication count above which the dashboard raises a warning
    pub failed_auth_alert_threshold: i64,

    /// Log destination for the terminal dashboard
    pub log_file: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000))),
            failed_auth_alert_threshold: DEFAULT_FAILED_AUTH_ALERT,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl RegistryConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup. Unset variables fall back to
    /// defaults; set-but-invalid variables are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH) {
            config.db_path = non_empty(ENV_DB_PATH, path)?.into();
        }

        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            config.bind_addr = addr.trim().parse().map_err(|_| ConfigError::InvalidAddr {
                var: ENV_BIND_ADDR,
                value: addr.clone(),
            })?;
        }

        if let Some(threshold) = lookup(ENV_FAILED_AUTH_ALERT) {
            config.failed_auth_alert_threshold = threshold
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|t| *t >= 0)
                .ok_or_else(|| ConfigError::InvalidThreshold {
                    var: ENV_FAILED_AUTH_ALERT,
                    value: threshold.clone(),
                })?;
        }

        if let Some(path) = lookup(ENV_LOG_FILE) {
            config.log_file = non_empty(ENV_LOG_FILE, path)?.into();
        }

        Ok(config)
    }

    /// Load for processes that never listen on a socket. `REGISTRY_BIND_ADDR`
    /// is ignored and `bind_addr` keeps its default.
    pub fn dashboard_from_env() -> Result<Self, ConfigError> {
        Self::dashboard_from_lookup(|key| std::env::var(key).ok())
    }

    pub fn dashboard_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| if key == ENV_BIND_ADDR { None } else { lookup(key) })
    }

    /// Whether the store lives only in memory
    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == ":memory:"
    }
}

fn non_empty(var: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ConfigError::Empty { var })
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = RegistryConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.db_path, PathBuf::from("citizens.db"));
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.failed_auth_alert_threshold, 10);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = RegistryConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, ":memory:"),
            (ENV_BIND_ADDR, "127.0.0.1:8081"),
            (ENV_FAILED_AUTH_ALERT, "3"),
            (ENV_LOG_FILE, "/tmp/registry.log"),
        ]))
        .unwrap();

        assert!(config.is_in_memory());
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8081");
        assert_eq!(config.failed_auth_alert_threshold, 3);
        assert_eq!(config.log_file, PathBuf::from("/tmp/registry.log"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = RegistryConfig::from_lookup(lookup_from(&[(ENV_BIND_ADDR, "localhost")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddr { .. }));

        let err = RegistryConfig::from_lookup(lookup_from(&[(ENV_FAILED_AUTH_ALERT, "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { .. }));

        let err = RegistryConfig::from_lookup(lookup_from(&[(ENV_DB_PATH, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty { var: ENV_DB_PATH });
    }

    #[test]
    fn test_dashboard_ignores_bind_addr() {
        let config = RegistryConfig::dashboard_from_lookup(lookup_from(&[
            (ENV_BIND_ADDR, "localhost"),
            (ENV_FAILED_AUTH_ALERT, "5"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, RegistryConfig::default().bind_addr);
        assert_eq!(config.failed_auth_alert_threshold, 5);

        let err = RegistryConfig::dashboard_from_lookup(lookup_from(&[(ENV_FAILED_AUTH_ALERT, "x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { .. }));
    }
}
