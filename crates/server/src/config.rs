//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LOTWISE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `LOTWISE_HOST` - Bind address (default: 127.0.0.1)
//! - `LOTWISE_PORT` - Listen port (default: 3002)
//! - `LOTWISE_UTC_OFFSET` - Offset defining the report calendar (default: +00:00)
//! - `LOTWISE_FETCH_TIMEOUT_SECS` - Deadline for loading source data (default: 60)
//! - `LOTWISE_LOG_JSON` - Emit JSON logs when set
//!
//! ## Optional (printed sheet)
//! - `LOTWISE_DOCUMENT_CODE` - Document-control code shown in the header
//! - `LOTWISE_DOCUMENT_ISSUED` - Issue date of the controlled form
//! - `LOTWISE_PRODUCED_UNIT` - Unit after each run's produced quantity
//!
//! ## Optional (storage - enables persisting reports)
//! - `LOTWISE_STORAGE_DIR` - Directory reports are written under
//! - `LOTWISE_STORAGE_PREFIX` - Sub-path inside the directory (default: reports)
//! - `LOTWISE_STORAGE_PUBLIC_URL` - Base URL the directory is served from

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::render::SheetHeader;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STORAGE_PREFIX: &str = "reports";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Report generation settings
    pub report: ReportConfig,
}

/// Report generation settings shared by the server and the CLI.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Offset that defines calendar days for windows and timestamps
    pub utc_offset: FixedOffset,
    /// Deadline for loading all source data
    pub fetch_timeout: Duration,
    /// Where to persist reports, if anywhere
    pub storage: Option<StorageConfig>,
    /// Document-control text for the HTML sheet
    pub sheet: SheetHeader,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            storage: None,
            sheet: SheetHeader::default(),
        }
    }
}

/// Local storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory
    pub root: PathBuf,
    /// Sub-path under the root
    pub prefix: String,
    /// Public URL the root is served from
    pub public_base_url: Option<Url>,
}

impl StorageConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(root) = get_optional_env("LOTWISE_STORAGE_DIR") else {
            return Ok(None);
        };
        let prefix = get_env_or_default("LOTWISE_STORAGE_PREFIX", DEFAULT_STORAGE_PREFIX);
        let public_base_url = get_optional_env("LOTWISE_STORAGE_PUBLIC_URL")
            .map(|raw| parse_public_url(&raw))
            .transpose()?;

        Ok(Some(Self {
            root: PathBuf::from(root),
            prefix,
            public_base_url,
        }))
    }
}

impl ReportConfig {
    /// Load report settings from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let utc_offset = parse_utc_offset(&get_env_or_default("LOTWISE_UTC_OFFSET", "+00:00"))?;
        let fetch_timeout = get_env_or_default(
            "LOTWISE_FETCH_TIMEOUT_SECS",
            &DEFAULT_FETCH_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            ConfigError::InvalidEnvVar("LOTWISE_FETCH_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        let storage = StorageConfig::from_env()?;
        let sheet = SheetHeader {
            document_code: get_optional_env("LOTWISE_DOCUMENT_CODE"),
            issued_on: get_optional_env("LOTWISE_DOCUMENT_ISSUED"),
            produced_unit: get_optional_env("LOTWISE_PRODUCED_UNIT"),
        };

        Ok(Self {
            utc_offset,
            fetch_timeout,
            storage,
            sheet,
        })
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let report = ReportConfig::from_env()?;

        let database_url = get_database_url("LOTWISE_DATABASE_URL")?;
        let host = get_env_or_default("LOTWISE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("LOTWISE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("LOTWISE_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("LOTWISE_PORT".to_string(), e.to_string()))?;

        Ok(Self {
            database_url,
            host,
            port,
            report,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Whether JSON log output was requested.
#[must_use]
pub fn log_json() -> bool {
    get_optional_env("LOTWISE_LOG_JSON").is_some_and(|v| !v.is_empty() && v != "0")
}

/// Parse a `+HH:MM` / `-HH:MM` offset. `Z` and `UTC` mean zero.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything else.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || {
        ConfigError::InvalidEnvVar(
            "LOTWISE_UTC_OFFSET".to_string(),
            format!("expected +HH:MM or -HH:MM, got {raw:?}"),
        )
    };

    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn parse_public_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidEnvVar("LOTWISE_STORAGE_PUBLIC_URL".to_string(), e.to_string())
    })?;
    // Url::join replaces the last segment unless the base ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utc_offset_positive_and_negative() {
        assert_eq!(parse_utc_offset("+00:00").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("-03:00").unwrap().local_minus_utc(), -3 * 3600);
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 5 * 3600 + 1800);
    }

    #[test]
    fn test_parse_utc_offset_accepts_hours_only_and_utc() {
        assert_eq!(parse_utc_offset("-3").unwrap().local_minus_utc(), -3 * 3600);
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_utc_offset_rejects_garbage() {
        for raw in ["", "03:00", "+25:00", "+01:75", "brt"] {
            let err = parse_utc_offset(raw).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)), "{raw}");
        }
    }

    #[test]
    fn test_public_url_gets_trailing_slash() {
        let url = parse_public_url("https://files.example.com/lotwise").unwrap();
        assert_eq!(url.as_str(), "https://files.example.com/lotwise/");
        let joined = url.join("reports/a.html").unwrap();
        assert_eq!(joined.as_str(), "https://files.example.com/lotwise/reports/a.html");
    }

    #[test]
    fn test_report_config_default() {
        let config = ReportConfig::default();
        assert_eq!(config.utc_offset.local_minus_utc(), 0);
        assert_eq!(config.fetch_timeout, Duration::from_secs(60));
        assert!(config.storage.is_none());
    }
}
