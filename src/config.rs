//! Startup configuration
//!
//! Loaded once from `.env` and the process environment. A missing or
//! malformed classification base URL stops the process before it serves.

use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

pub const BASE_URL_VAR: &str = "CLASSIFICATION_API_BASE_URL";
pub const TIMEOUT_VAR: &str = "CLASSIFICATION_API_TIMEOUT_SECS";

/// Checked in order; the first one set wins
const PORT_VARS: [&str; 2] = ["PORT", "API_PORT"];

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub classification: ClassificationApiConfig,
}

#[derive(Debug, Clone)]
pub struct ClassificationApiConfig {
    /// Always ends with `/`
    pub base_url: Url,
    /// Per-attempt transport timeout
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `lookup` returns `None` for unset names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(BASE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(BASE_URL_VAR))?;

        let timeout_secs = match lookup(TIMEOUT_VAR) {
            Some(value) => parse_positive(TIMEOUT_VAR, &value)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let port = match PORT_VARS
            .into_iter()
            .find_map(|name| lookup(name).map(|value| (name, value)))
        {
            Some((name, value)) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber { name, value })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            classification: ClassificationApiConfig {
                base_url: parse_base_url(&raw_url)?,
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        name: BASE_URL_VAR,
        value: raw.to_string(),
        source,
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme {
            name: BASE_URL_VAR,
            scheme: url.scheme().to_string(),
        });
    }

    // Url::join replaces the last segment unless the path ends with '/'
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn parse_positive(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        }),
    }
}
