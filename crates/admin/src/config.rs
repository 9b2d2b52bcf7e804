//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_BASE_URL` - Public URL for the admin console (default: <http://localhost:3001>)
//! - `ADMIN_SEED_FILE` - YAML dataset to load instead of the embedded seed
//! - `ADMIN_STATIC_DIR` - Static assets directory (default: crates/admin/static)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT` - PEM-encoded certificate chain
//! - `ADMIN_TLS_KEY` - PEM-encoded private key
//!
//! When both TLS variables are set the console serves HTTPS directly;
//! setting only one of them is an error.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin console
    pub base_url: Url,
    /// Alternative seed dataset; the embedded one is used when unset
    pub seed_file: Option<PathBuf>,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Sentry error tracking
    pub sentry: SentryConfig,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
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

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_parts(
            get_optional_env("ADMIN_TLS_CERT"),
            get_optional_env("ADMIN_TLS_KEY"),
        )
    }

    fn from_parts(
        cert_pem: Option<String>,
        key_pem: Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "ADMIN_TLS_*".to_string(),
                "Both ADMIN_TLS_CERT and ADMIN_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3001,
            base_url: default_base_url(),
            seed_file: None,
            static_dir: PathBuf::from("crates/admin/static"),
            sentry: SentryConfig::default(),
            tls: None,
        }
    }
}

#[allow(clippy::expect_used)]
fn default_base_url() -> Url {
    Url::parse("http://localhost:3001").expect("Invalid default base URL")
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed, or
    /// if only one of the TLS variables is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let host = parse_env_or("ADMIN_HOST", defaults.host)?;
        let port = parse_env_or("ADMIN_PORT", defaults.port)?;
        let base_url = get_optional_env("ADMIN_BASE_URL")
            .map(|raw| parse_base_url("ADMIN_BASE_URL", &raw))
            .transpose()?
            .unwrap_or(defaults.base_url);

        Ok(Self {
            host,
            port,
            base_url,
            seed_file: get_optional_env("ADMIN_SEED_FILE").map(PathBuf::from),
            static_dir: get_optional_env("ADMIN_STATIC_DIR")
                .map_or(defaults.static_dir, PathBuf::from),
            sentry: SentryConfig::from_env()?,
            tls: TlsConfig::from_env()?,
        })
    }

    /// Get the socket address to bind to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the console is reached over HTTPS, either through its own
    /// TLS listener or a proxy in front of it.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.tls.is_some() || self.base_url.scheme() == "https"
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
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http or https URL".to_string(),
        )),
    }
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = AdminConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3101,
            ..AdminConfig::default()
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3101);
    }

    #[test]
    fn test_defaults() {
        let config = AdminConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.base_url.as_str(), "http://localhost:3001/");
        assert!(config.tls.is_none());
        assert!(!config.is_secure());
    }

    #[test]
    fn test_tls_requires_both_parts() {
        assert!(TlsConfig::from_parts(None, None).unwrap().is_none());
        assert!(
            TlsConfig::from_parts(Some("cert".to_string()), Some("key".to_string()))
                .unwrap()
                .is_some()
        );
        assert!(matches!(
            TlsConfig::from_parts(Some("cert".to_string()), None),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_tls_config_debug_redacts_key() {
        let config = TlsConfig::from_parts(
            Some("-----BEGIN CERTIFICATE-----".to_string()),
            Some("super_secret_private_key".to_string()),
        )
        .unwrap()
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_private_key"));
    }

    #[test]
    fn test_tls_makes_console_secure() {
        let config = AdminConfig {
            tls: TlsConfig::from_parts(Some("c".to_string()), Some("k".to_string())).unwrap(),
            ..AdminConfig::default()
        };
        assert!(config.is_secure());
    }

    #[test]
    fn test_parse_base_url() {
        assert!(parse_base_url("X", "https://admin.example.com").is_ok());
        assert!(parse_base_url("X", "ftp://admin.example.com").is_err());
    }
}
