//! # Storage Configuration
//!
//! Pool settings, the transaction mode and the default VAT rate.
//!
//! ## Sources
//! ```text
//! DbConfig::new(path)      ← builder, defaults below
//! DbConfig::from_env()     ← BANQUET_* environment variables
//! DbConfig::in_memory()    ← tests
//!
//! BANQUET_DATABASE_PATH        ./banquet.db
//! BANQUET_DB_MAX_CONNECTIONS   5
//! BANQUET_STORE_TRANSACTIONS   auto | enabled | disabled   (auto)
//! BANQUET_DEFAULT_VAT_PCT      0 | 4 | 10 | 21            (10)
//! ```
//!
//! Builders never fail; [`DbConfig::validate`] runs before a pool is
//! created, so a bad value is rejected at startup, not at invoice time.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use banquet_core::vat::check_rate;

pub const ENV_DATABASE_PATH: &str = "BANQUET_DATABASE_PATH";
pub const ENV_MAX_CONNECTIONS: &str = "BANQUET_DB_MAX_CONNECTIONS";
pub const ENV_STORE_TRANSACTIONS: &str = "BANQUET_STORE_TRANSACTIONS";
pub const ENV_DEFAULT_VAT_PCT: &str = "BANQUET_DEFAULT_VAT_PCT";

const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Transaction Mode
// =============================================================================

/// How the store's transaction support is decided at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    /// Probe the store once.
    #[default]
    Auto,
    /// Assume transactions work.
    Enabled,
    /// Never open a transaction; write sequentially.
    Disabled,
}

impl FromStr for TransactionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(TransactionMode::Auto),
            "enabled" | "on" | "true" => Ok(TransactionMode::Enabled),
            "disabled" | "off" | "false" => Ok(TransactionMode::Disabled),
            _ => Err(ConfigError::InvalidValue(ENV_STORE_TRANSACTIONS.to_string())),
        }
    }
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionMode::Auto => "auto",
            TransactionMode::Enabled => "enabled",
            TransactionMode::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust
/// use banquet_db::{DbConfig, TransactionMode};
///
/// let config = DbConfig::new("/var/lib/banquet/banquet.db")
///     .max_connections(8)
///     .transactions(TransactionMode::Disabled);
/// assert_eq!(config.max_connections, 8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Transaction support resolution.
    /// Default: auto
    pub transactions: TransactionMode,

    /// VAT percentage used for invoices.
    /// Default: 10
    pub default_vat_pct: u32,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            transactions: TransactionMode::Auto,
            default_vat_pct: 10,
        }
    }

    /// Creates an in-memory database configuration (for testing).
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
            transactions: TransactionMode::Auto,
            default_vat_pct: 10,
        }
    }

    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key lookup. Unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config =
            DbConfig::new(lookup(ENV_DATABASE_PATH).unwrap_or_else(|| "./banquet.db".to_string()));

        if let Some(raw) = lookup(ENV_MAX_CONNECTIONS) {
            let max: u32 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()))?;
            config.max_connections = max;
            config.min_connections = config.min_connections.min(max);
        }

        if let Some(raw) = lookup(ENV_STORE_TRANSACTIONS) {
            config.transactions = raw.parse()?;
        }

        if let Some(raw) = lookup(ENV_DEFAULT_VAT_PCT) {
            config.default_vat_pct = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_DEFAULT_VAT_PCT.to_string()))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the settings a pool cannot start with.
    ///
    /// ## Rules
    /// - database path must not be empty
    /// - at least one connection, and `min_connections <= max_connections`
    /// - default VAT rate is one of 0, 4, 10, 21
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired(ENV_DATABASE_PATH.to_string()));
        }
        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()));
        }
        check_rate(self.default_vat_pct)
            .map_err(|_| ConfigError::InvalidValue(ENV_DEFAULT_VAT_PCT.to_string()))?;
        Ok(())
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets how transaction support is decided.
    pub fn transactions(mut self, mode: TransactionMode) -> Self {
        self.transactions = mode;
        self
    }

    /// Sets the invoice VAT percentage. Checked by [`DbConfig::validate`].
    pub fn default_vat_pct(mut self, pct: u32) -> Self {
        self.default_vat_pct = pct;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
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
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./banquet.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.transactions, TransactionMode::Auto);
        assert_eq!(config.default_vat_pct, 10);
    }

    #[test]
    fn test_reads_every_key() {
        let config = DbConfig::from_lookup(lookup(&[
            (ENV_DATABASE_PATH, "/data/banquet.db"),
            (ENV_MAX_CONNECTIONS, "12"),
            (ENV_STORE_TRANSACTIONS, "Disabled"),
            (ENV_DEFAULT_VAT_PCT, "21"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/banquet.db"));
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.transactions, TransactionMode::Disabled);
        assert_eq!(config.default_vat_pct, 21);
    }

    #[test]
    fn test_invalid_values() {
        for pairs in [
            [(ENV_MAX_CONNECTIONS, "many")],
            [(ENV_MAX_CONNECTIONS, "0")],
            [(ENV_STORE_TRANSACTIONS, "sometimes")],
            [(ENV_DEFAULT_VAT_PCT, "16")],
        ] {
            let err = DbConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(_)));
        }

        let err = DbConfig::from_lookup(lookup(&[(ENV_DATABASE_PATH, "")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    #[test]
    fn test_validate_catches_builder_values() {
        assert!(DbConfig::in_memory().validate().is_ok());
        assert!(DbConfig::in_memory().default_vat_pct(21).validate().is_ok());

        assert!(matches!(
            DbConfig::in_memory().default_vat_pct(16).validate(),
            Err(ConfigError::InvalidValue(key)) if key == ENV_DEFAULT_VAT_PCT
        ));
        assert!(DbConfig::new("/tmp/x.db").max_connections(0).validate().is_err());
        assert!(DbConfig::new("/tmp/x.db")
            .max_connections(2)
            .min_connections(3)
            .validate()
            .is_err());
        assert!(matches!(
            DbConfig::new("").validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_builder_and_in_memory() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .transactions(TransactionMode::Enabled);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.transactions, TransactionMode::Enabled);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
