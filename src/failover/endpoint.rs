//! Resolved endpoint configuration.

use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::config::{EndpointSpec, FailoverConfig};
use crate::failover::{FailoverError, FailoverResult};

/// A configured RPC target with per-endpoint defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointConfig {
    /// Display name, unique per manager.
    pub name: String,
    pub url: Url,
    /// Higher is preferred.
    pub priority: u32,
    /// Probe and call timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retries for calls routed through this endpoint.
    pub max_retries: u32,
}

impl EndpointConfig {
    /// Build an endpoint with the default timeout and retry count.
    pub fn new(name: impl Into<String>, url: Url, priority: u32) -> Self {
        let defaults = FailoverConfig::default();
        Self {
            name: name.into(),
            url,
            priority,
            timeout_ms: defaults.default_timeout_ms,
            max_retries: defaults.default_max_retries,
        }
    }

    /// Resolve a config-file entry against the failover defaults.
    pub fn from_spec(spec: &EndpointSpec, defaults: &FailoverConfig) -> FailoverResult<Self> {
        let url = Url::parse(&spec.url).map_err(|e| FailoverError::InvalidUrl {
            name: spec.name.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: spec.name.clone(),
            url,
            priority: spec.priority,
            timeout_ms: spec.timeout_ms.unwrap_or(defaults.default_timeout_ms),
            max_retries: spec.max_retries.unwrap_or(defaults.default_max_retries),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
