//! Configuration management for the submitter.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{RegistryError, Result};
use crate::ratelimit::TimeWindow;

/// Registry endpoint for creating commissioning contract documents.
pub const DEFAULT_ENDPOINT: &str =
    "https://ismp.crpt.ru/api/v3/lk/documents/commissioning/contract/create";

/// Main configuration for a document submitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// HTTP transport configuration
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Document creation endpoint, without query parameters
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl RegistryConfig {
    /// Parse the configured endpoint.
    pub fn endpoint(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            RegistryError::Config(format!("invalid registry URL '{}': {}", self.base_url, e))
        })
    }
}

fn default_base_url() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Maximum submissions per window
    #[serde(default = "default_request_limit")]
    pub request_limit: u32,

    /// Window length as one time unit
    #[serde(default)]
    pub window: TimeWindow,

    /// Explicit window length in milliseconds, overrides `window`
    #[serde(default)]
    pub window_ms: Option<u64>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            request_limit: default_request_limit(),
            window: TimeWindow::default(),
            window_ms: None,
        }
    }
}

impl RateLimitingConfig {
    /// Get the effective window length.
    pub fn window_duration(&self) -> Duration {
        match self.window_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.window.duration(),
        }
    }
}

fn default_request_limit() -> u32 {
    5
}

/// HTTP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Total request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ClientConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading submitter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(yaml)
            .map_err(|e| RegistryError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the submitter cannot run with.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.registry.endpoint()?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RegistryError::Config(format!(
                "registry URL must be http or https, got '{}'",
                endpoint.scheme()
            )));
        }
        if self.rate_limiting.request_limit == 0 {
            return Err(RegistryError::Config(
                "rate_limiting.request_limit must be greater than zero".to_string(),
            ));
        }
        if self.rate_limiting.window_duration().is_zero() {
            return Err(RegistryError::Config(
                "rate_limiting window must be longer than zero".to_string(),
            ));
        }
        if self.transport.timeout_ms == 0 {
            return Err(RegistryError::Config(
                "transport.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
