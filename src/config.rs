//! Build-time configuration.
//!
//! A browser bundle has no process environment, so values are baked in
//! when the crate is compiled.
//!
//! # Environment Variables (all optional)
//! - `CRM_API_URL` - Backend base URL (default: http://localhost:3000)
//! - `CRM_SHARED_FUNNEL_ID` - Funnel opened by the board (default: the server's shared funnel)
//! - `CRM_LOG_LEVEL` - `trace`, `debug`, `info`, `warn` or `error` (default: info)

use thiserror::Error;
use tracing::Level;

use crate::models::FunnelId;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    /// Board funnel; `None` means ask the server for its shared funnel
    pub funnel_id: Option<FunnelId>,
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self { api_url: DEFAULT_API_URL.to_string(), funnel_id: None, log_level: Level::INFO }
    }
}

impl Config {
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match key {
            "CRM_API_URL" => option_env!("CRM_API_URL"),
            "CRM_SHARED_FUNNEL_ID" => option_env!("CRM_SHARED_FUNNEL_ID"),
            "CRM_LOG_LEVEL" => option_env!("CRM_LOG_LEVEL"),
            _ => None,
        })
    }

    pub fn from_lookup<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(str::trim).filter(|value| !value.is_empty());
        let defaults = Self::default();

        let api_url = match get("CRM_API_URL") {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => url.trim_end_matches('/').to_string(),
            Some(url) => return Err(ConfigError::InvalidEnvVar("CRM_API_URL", format!("not an http(s) URL: {url}"))),
            None => defaults.api_url,
        };

        let funnel_id = get("CRM_SHARED_FUNNEL_ID")
            .map(|id| {
                id.parse::<FunnelId>()
                    .map_err(|e| ConfigError::InvalidEnvVar("CRM_SHARED_FUNNEL_ID", e.to_string()))
            })
            .transpose()?;

        let log_level = get("CRM_LOG_LEVEL")
            .map(|level| {
                level
                    .parse::<Level>()
                    .map_err(|e| ConfigError::InvalidEnvVar("CRM_LOG_LEVEL", e.to_string()))
            })
            .transpose()?
            .unwrap_or(defaults.log_level);

        Ok(Self { api_url, funnel_id, log_level })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&'static str, &'static str)]) -> Result<Config, ConfigError> {
        let env: HashMap<&str, &str> = pairs.iter().copied().collect();
        Config::from_lookup(|key| env.get(key).copied())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config_from(&[]), Ok(Config::default()));
        assert_eq!(config_from(&[("CRM_API_URL", "  ")]).unwrap().api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_values_are_parsed() {
        let config = config_from(&[
            ("CRM_API_URL", "https://crm.example.ru/api/"),
            ("CRM_SHARED_FUNNEL_ID", "25"),
            ("CRM_LOG_LEVEL", "debug"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://crm.example.ru/api");
        assert_eq!(config.funnel_id, Some(25));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("CRM_SHARED_FUNNEL_ID", "first")]),
            Err(ConfigError::InvalidEnvVar("CRM_SHARED_FUNNEL_ID", _))
        ));
        assert!(matches!(
            config_from(&[("CRM_LOG_LEVEL", "loud")]),
            Err(ConfigError::InvalidEnvVar("CRM_LOG_LEVEL", _))
        ));
        assert!(matches!(config_from(&[("CRM_API_URL", "localhost")]), Err(ConfigError::InvalidEnvVar("CRM_API_URL", _))));
    }
}
