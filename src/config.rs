//! Construction-time configuration, loaded once from `providers.toml`.
//!
//! Components receive explicit config values at build time; nothing reads
//! process environment at call time, so tests stay deterministic.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::duration::deserialize_duration_opt;
use crate::error::SyncError;
use crate::provider::{HttpProviderClient, ProviderClient};
use crate::retry::RetryConfig;

fn default_enabled() -> bool {
    true
}

/// Top-level `providers.toml`:
///
/// ```toml
/// [retry]
/// max_attempts = 5
/// initial_delay = "100ms"
///
/// [providers.cms-hospital-feed]
/// base_url = "https://feeds.example.com/v1"
/// api_key = "..."
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retry: RetryOverrides,
    pub providers: BTreeMap<String, ProviderSourceConfig>,
}

/// One declared provider source.
#[derive(Debug, Deserialize)]
pub struct ProviderSourceConfig {
    pub base_url: String,

    /// API key sent as `x-api-key`; kept redacted in memory.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ProviderSourceConfig {
    pub fn build_client(&self, name: &str) -> HttpProviderClient {
        let mut client = HttpProviderClient::new(name, self.base_url.clone());
        if let Some(key) = &self.api_key {
            client = client.with_api_key(SecretString::from(key.expose_secret().to_string()));
        }
        client
    }

    /// Required keys present and well-typed, checked before any network
    /// call is attempted.
    pub fn validate(&self, name: &str) -> Result<(), SyncError> {
        self.build_client(name).validate_config()
    }
}

/// Deployment overrides on the default retry policy. Absent fields keep
/// the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetryOverrides {
    pub max_attempts: Option<u32>,
    #[serde(deserialize_with = "deserialize_duration_opt")]
    pub initial_delay: Option<Duration>,
    #[serde(deserialize_with = "deserialize_duration_opt")]
    pub max_delay: Option<Duration>,
    pub backoff_factor: Option<f64>,
    #[serde(deserialize_with = "deserialize_duration_opt")]
    pub max_total_timeout: Option<Duration>,
}

impl RetryOverrides {
    pub fn apply(&self, base: &RetryConfig) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            initial_delay: self.initial_delay.unwrap_or(base.initial_delay),
            max_delay: self.max_delay.unwrap_or(base.max_delay),
            backoff_factor: self.backoff_factor.unwrap_or(base.backoff_factor),
            max_total_timeout: self.max_total_timeout.unwrap_or(base.max_total_timeout),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// The effective retry policy: defaults plus `[retry]` overrides.
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.apply(&RetryConfig::default())
    }

    pub fn enabled_providers(&self) -> impl Iterator<Item = (&String, &ProviderSourceConfig)> {
        self.providers.iter().filter(|(_, source)| source.enabled)
    }

    /// Validates every enabled provider and the retry policy.
    pub fn validate(&self) -> Result<(), SyncError> {
        self.retry_config().validate()?;
        for (name, source) in self.enabled_providers() {
            source.validate(name)?;
        }
        Ok(())
    }
}
