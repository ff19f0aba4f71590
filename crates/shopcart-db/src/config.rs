//! Shopcart configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::checkout::CheckoutConfig;
use crate::pool::DbConfig;

const DATABASE_PATH: &str = "SHOPCART_DATABASE_PATH";
const MAX_CONNECTIONS: &str = "SHOPCART_MAX_CONNECTIONS";
const CHECKOUT_TIMEOUT_SECS: &str = "SHOPCART_CHECKOUT_TIMEOUT_SECS";

/// Process-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: String,

    /// Pool size (default: 5)
    pub max_connections: u32,

    /// Upper bound on one checkout, in seconds (default: 10)
    pub checkout_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: "shopcart.db".to_string(),
            max_connections: 5,
            checkout_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let config = AppConfig {
            database_path: lookup(DATABASE_PATH).unwrap_or(defaults.database_path),

            max_connections: match lookup(MAX_CONNECTIONS) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(MAX_CONNECTIONS.to_string()))?,
                None => defaults.max_connections,
            },

            checkout_timeout_secs: match lookup(CHECKOUT_TIMEOUT_SECS) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(CHECKOUT_TIMEOUT_SECS.to_string()))?,
                None => defaults.checkout_timeout_secs,
            },
        };

        if config.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired(DATABASE_PATH.to_string()));
        }
        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(MAX_CONNECTIONS.to_string()));
        }
        if config.checkout_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(CHECKOUT_TIMEOUT_SECS.to_string()));
        }

        Ok(config)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig::default().checkout_timeout(Duration::from_secs(self.checkout_timeout_secs))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
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
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.checkout_config().checkout_timeout,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_values_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            (DATABASE_PATH, "/var/lib/shopcart/shop.db"),
            (MAX_CONNECTIONS, "12"),
            (CHECKOUT_TIMEOUT_SECS, "3"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, "/var/lib/shopcart/shop.db");
        assert_eq!(config.db_config().max_connections, 12);
        assert_eq!(
            config.checkout_config().checkout_timeout,
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = AppConfig::from_lookup(lookup(&[(MAX_CONNECTIONS, "lots")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for SHOPCART_MAX_CONNECTIONS");

        let err = AppConfig::from_lookup(lookup(&[(CHECKOUT_TIMEOUT_SECS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var) if var == CHECKOUT_TIMEOUT_SECS));
    }
}
