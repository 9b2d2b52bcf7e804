//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: <http://localhost:3000>)
//! - `STOREFRONT_SEED_FILE` - YAML dataset to load instead of the embedded seed
//! - `STOREFRONT_CONTENT_DIR` - Markdown pages directory (default: crates/storefront/content)
//! - `STOREFRONT_STATIC_DIR` - Static assets directory (default: crates/storefront/static)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Alternative seed dataset; the embedded one is used when unset
    pub seed_file: Option<PathBuf>,
    /// Directory holding the markdown content pages
    pub content_dir: PathBuf,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Sentry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.1,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: default_base_url(),
            seed_file: None,
            content_dir: PathBuf::from("crates/storefront/content"),
            static_dir: PathBuf::from("crates/storefront/static"),
            sentry: SentryConfig::default(),
        }
    }
}

#[allow(clippy::expect_used)]
fn default_base_url() -> Url {
    Url::parse("http://localhost:3000").expect("Invalid default base URL")
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Loads `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let host = parse_env_or("STOREFRONT_HOST", defaults.host)?;
        let port = parse_env_or("STOREFRONT_PORT", defaults.port)?;
        let base_url = get_optional_env("STOREFRONT_BASE_URL")
            .map(|raw| parse_base_url("STOREFRONT_BASE_URL", &raw))
            .transpose()?
            .unwrap_or(defaults.base_url);

        Ok(Self {
            host,
            port,
            base_url,
            seed_file: get_optional_env("STOREFRONT_SEED_FILE").map(PathBuf::from),
            content_dir: get_optional_env("STOREFRONT_CONTENT_DIR")
                .map_or(defaults.content_dir, PathBuf::from),
            static_dir: get_optional_env("STOREFRONT_STATIC_DIR")
                .map_or(defaults.static_dir, PathBuf::from),
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Get the socket address to bind to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS (secure session cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

impl SentryConfig {
    /// Load Sentry settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a sample rate is not a number
    /// between 0 and 1.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_rate("SENTRY_SAMPLE_RATE", defaults.sample_rate)?,
            traces_sample_rate: parse_rate(
                "SENTRY_TRACES_SAMPLE_RATE",
                defaults.traces_sample_rate,
            )?,
        })
    }
}

fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http or https URL".to_string(),
        ));
    }
    Ok(url)
}

fn parse_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let rate = parse_env_or(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be between 0.0 and 1.0".to_string(),
        ))
    }
}

/// Parse an optional environment variable, falling back to `default`.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
