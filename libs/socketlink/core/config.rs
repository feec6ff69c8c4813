use crate::traits::{ExponentialBackoff, HeaderSet, NeverReconnect, ReconnectionStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Connection configuration
///
/// ```yaml
/// url: ws://localhost:1337
/// headers:
///   x-test-header-one: foo
/// reconnect:
///   enabled: true
///   initial_delay_ms: 500
///   max_delay_ms: 30000
///   max_attempts: 10
/// transport:
///   handshake_headers:
///     origin: http://localhost
///   query:
///     __sdk: rust
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Socket endpoint (ws:// or wss://)
    #[serde(default)]
    pub url: String,

    /// Default headers applied to every request on this connection
    #[serde(default)]
    pub headers: HeaderSet,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Options handed to the transport as-is
    #[serde(default)]
    pub transport: TransportOptions,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        info!("Loaded socket client config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::ValidationError("url must be set".into()));
        }
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(format!(
                "url must use ws:// or wss://, got '{}'",
                self.url
            )));
        }
        if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "reconnect.initial_delay_ms must not exceed reconnect.max_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

/// Auto-reconnect settings, turned into a [`ReconnectionStrategy`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// `None` retries forever
    pub max_attempts: Option<usize>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: Some(10),
        }
    }
}

impl ReconnectConfig {
    pub fn strategy(&self) -> Box<dyn ReconnectionStrategy> {
        if !self.enabled {
            return Box::new(NeverReconnect);
        }
        Box::new(ExponentialBackoff::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.max_attempts,
        ))
    }
}

/// Transport-specific options, not interpreted by the request layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    /// Extra headers on the socket upgrade request
    pub handshake_headers: HeaderSet,
    /// Query parameters appended to the socket URL
    pub query: BTreeMap<String, String>,
}

impl TransportOptions {
    /// `url` with the configured query parameters appended
    pub fn url_with_query(&self, url: &str) -> String {
        if self.query.is_empty() {
            return url.to_string();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", url, separator, query)
    }
}
