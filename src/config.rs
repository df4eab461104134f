//! Process configuration, read once at startup.
//!
//! Provider credentials are optional: a provider without an API key is
//! skipped rather than failing requests.

use anyhow::{Context, Result};
use secrecy::Secret;
use std::env;
use std::time::Duration;

pub const DEFAULT_HUBSPOT_BASE_URL: &str = "https://api.hubapi.com";
pub const DEFAULT_REACHINBOX_BASE_URL: &str = "https://api.reachinbox.ai";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Placeholder value meaning "use the first subscription definition".
const SUBSCRIPTION_ID_SENTINEL: &str = "default";

#[derive(Debug, Clone)]
pub struct HubSpotConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
    /// Subscription definition to (re)subscribe contacts to. `None` selects
    /// the first definition HubSpot returns.
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReachInboxConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub hubspot: Option<HubSpotConfig>,
    pub reachinbox: Option<ReachInboxConfig>,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let hubspot = get("HUBSPOT_API_KEY").map(|api_key| HubSpotConfig {
            api_key: Secret::new(api_key),
            base_url: get("HUBSPOT_BASE_URL")
                .unwrap_or_else(|| DEFAULT_HUBSPOT_BASE_URL.to_string()),
            subscription_id: get("HUBSPOT_SUBSCRIPTION_ID")
                .filter(|id| id != SUBSCRIPTION_ID_SENTINEL),
        });

        let reachinbox = get("REACHINBOX_API_KEY").map(|api_key| ReachInboxConfig {
            api_key: Secret::new(api_key),
            base_url: get("REACHINBOX_BASE_URL")
                .unwrap_or_else(|| DEFAULT_REACHINBOX_BASE_URL.to_string()),
        });

        let timeout_secs = match get("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .context("PROVIDER_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            hubspot,
            reachinbox,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_configures_no_providers() {
        let config = config_from(&[]).unwrap();
        assert!(config.hubspot.is_none());
        assert!(config.reachinbox.is_none());
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn api_keys_enable_providers_with_default_urls() {
        let config = config_from(&[
            ("HUBSPOT_API_KEY", "hs-key"),
            ("REACHINBOX_API_KEY", "ri-key"),
        ])
        .unwrap();
        let hubspot = config.hubspot.unwrap();
        assert_eq!(hubspot.api_key.expose_secret(), "hs-key");
        assert_eq!(hubspot.base_url, DEFAULT_HUBSPOT_BASE_URL);
        assert_eq!(hubspot.subscription_id, None);
        assert_eq!(config.reachinbox.unwrap().base_url, DEFAULT_REACHINBOX_BASE_URL);
    }

    #[test]
    fn default_subscription_id_sentinel_means_first_definition() {
        let config = config_from(&[
            ("HUBSPOT_API_KEY", "hs-key"),
            ("HUBSPOT_SUBSCRIPTION_ID", "default"),
        ])
        .unwrap();
        assert_eq!(config.hubspot.unwrap().subscription_id, None);

        let config = config_from(&[
            ("HUBSPOT_API_KEY", "hs-key"),
            ("HUBSPOT_SUBSCRIPTION_ID", "9001"),
        ])
        .unwrap();
        assert_eq!(config.hubspot.unwrap().subscription_id.as_deref(), Some("9001"));
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let config = config_from(&[("REACHINBOX_API_KEY", "  ")]).unwrap();
        assert!(config.reachinbox.is_none());
    }

    #[test]
    fn invalid_timeout_is_an_error() {
        assert!(config_from(&[("PROVIDER_TIMEOUT_SECS", "soon")]).is_err());
        let config = config_from(&[("PROVIDER_TIMEOUT_SECS", "3")]).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(3));
    }
}
