//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `LAUNCHPAD_HOST` - Bind address (default: 127.0.0.1)
//! - `LAUNCHPAD_PORT` - Listen port (default: 4000)
//! - `LAUNCHPAD_PAGE_SIZE` - Default `launches` page size (default: 20)
//! - `LAUNCHPAD_CATALOG_CACHE_TTL_SECS` - Launch catalog cache TTL (default: 300)
//! - `LAUNCHPAD_CATALOG_PATH` - JSON file of launches (default: bundled catalog)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Default page size for `launches`
    pub page_size: usize,
    /// How long catalog lookups stay cached
    pub catalog_cache_ttl: Duration,
    /// Launch catalog file; the bundled catalog when `None`
    pub catalog_path: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 4000,
            page_size: 20,
            catalog_cache_ttl: Duration::from_secs(300),
            catalog_path: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let page_size = parse_or(&lookup, "LAUNCHPAD_PAGE_SIZE", defaults.page_size)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "LAUNCHPAD_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            host: parse_or(&lookup, "LAUNCHPAD_HOST", defaults.host)?,
            port: parse_or(&lookup, "LAUNCHPAD_PORT", defaults.port)?,
            page_size,
            catalog_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "LAUNCHPAD_CATALOG_CACHE_TTL_SECS",
                defaults.catalog_cache_ttl.as_secs(),
            )?),
            catalog_path: lookup("LAUNCHPAD_CATALOG_PATH").map(PathBuf::from),
            sentry_dsn: lookup("SENTRY_DSN").filter(|v| !v.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse `key` if set, otherwise return `default`.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
