//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LAUNCHPAD_ENDPOINT` - URL of the graph endpoint (e.g. `http://127.0.0.1:4000/graphql`)
//!
//! ## Optional
//! - `LAUNCHPAD_CREDENTIAL_DIR` - Directory holding the persisted credential (default: `.launchpad`)
//! - `LAUNCHPAD_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::credentials::{CredentialStore, FileSlot};

const DEFAULT_CREDENTIAL_DIR: &str = ".launchpad";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Launchpad client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Graph endpoint URL
    pub endpoint: Url,
    /// Directory for the file-backed credential slot
    pub credential_dir: PathBuf,
    /// Timeout applied to every request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Configuration for `endpoint` with default credential directory and
    /// timeout.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            credential_dir: PathBuf::from(DEFAULT_CREDENTIAL_DIR),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the endpoint is missing or any variable is
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_endpoint = lookup("LAUNCHPAD_ENDPOINT")
            .ok_or_else(|| ConfigError::MissingEnvVar("LAUNCHPAD_ENDPOINT".to_string()))?;
        let endpoint = Url::parse(&raw_endpoint).map_err(|e| {
            ConfigError::InvalidEnvVar("LAUNCHPAD_ENDPOINT".to_string(), e.to_string())
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "LAUNCHPAD_ENDPOINT".to_string(),
                format!("unsupported scheme `{}`", endpoint.scheme()),
            ));
        }

        let credential_dir = lookup("LAUNCHPAD_CREDENTIAL_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_CREDENTIAL_DIR), PathBuf::from);

        let request_timeout = match lookup("LAUNCHPAD_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "LAUNCHPAD_REQUEST_TIMEOUT_SECS".to_string(),
                    e.to_string(),
                )
            })?,
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            endpoint,
            credential_dir,
            request_timeout,
        })
    }

    /// Credential store persisted under `credential_dir`.
    #[must_use]
    pub fn credential_store(&self) -> CredentialStore<FileSlot> {
        CredentialStore::new(FileSlot::new(self.credential_dir.clone()))
    }
}
