//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::{InventoryPolicy, StorefrontSettings};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `JWT_SECRET` / `JWT_ISSUER`: HS256 bearer token verification
/// - `REPORTING_UTC_OFFSET_MINUTES`: reporting calendar offset (default: `0`)
/// - `INVENTORY_POLICY`: `track` or `untracked` (default: `track`)
/// - `PAYMENT_SUCCESS_URL` / `PAYMENT_CANCEL_URL`: checkout redirect targets
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_issuer: Option<String>,
    pub settings: StorefrontSettings,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mut settings = defaults.settings;
        if let Some(value) = get("INVENTORY_POLICY") {
            settings.inventory_policy = parse::<InventoryPolicy>("INVENTORY_POLICY", value)?;
        }
        if let Some(value) = get("REPORTING_UTC_OFFSET_MINUTES") {
            let minutes = parse::<i32>("REPORTING_UTC_OFFSET_MINUTES", value.clone())?;
            if minutes.abs() >= 24 * 60 {
                return Err(ConfigError::Invalid {
                    key: "REPORTING_UTC_OFFSET_MINUTES",
                    value,
                });
            }
            settings.reporting_offset_minutes = minutes;
        }
        if let Some(url) = get("PAYMENT_SUCCESS_URL") {
            settings.payment_success_url = url;
        }
        if let Some(url) = get("PAYMENT_CANCEL_URL") {
            settings.payment_cancel_url = url;
        }

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: match get("PORT") {
                Some(value) => parse("PORT", value)?,
                None => defaults.port,
            },
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match get("LOG_FORMAT") {
                Some(value) => parse("LOG_FORMAT", value)?,
                None => defaults.log_format,
            },
            database_url: get("DATABASE_URL"),
            jwt_secret: get("JWT_SECRET"),
            jwt_issuer: get("JWT_ISSUER"),
            settings,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            jwt_secret: None,
            jwt_issuer: None,
            settings: StorefrontSettings::default(),
        }
    }
}
