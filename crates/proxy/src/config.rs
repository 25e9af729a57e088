//! Process-lifetime configuration, read once at startup.

use std::time::Duration;

use thiserror::Error;

use facelens_core::shared::constants::{DEFAULT_PROXY_ADDR, DEFAULT_UPSTREAM_TIMEOUT_SECS};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} is not set; the proxy refuses to start without it")]
    Missing { name: &'static str },
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Everything the proxy needs, resolved before the listener binds.
/// Requests never observe a half-configured process.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Base URL of the external detection service.
    pub endpoint: String,
    /// Secret credential injected into every upstream call.
    pub api_key: String,
    pub bind_addr: String,
    pub upstream_timeout: Duration,
}

impl ProxyConfig {
    pub const ENDPOINT_VAR: &'static str = "FACE_API_ENDPOINT";
    pub const KEY_VAR: &'static str = "FACE_API_KEY";
    pub const ADDR_VAR: &'static str = "FACE_PROXY_ADDR";
    pub const TIMEOUT_VAR: &'static str = "FACE_API_TIMEOUT_SECS";

    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = require(Self::ENDPOINT_VAR)?;
        let api_key = require(Self::KEY_VAR)?;
        let bind_addr =
            std::env::var(Self::ADDR_VAR).unwrap_or_else(|_| DEFAULT_PROXY_ADDR.to_string());
        let timeout_secs = match std::env::var(Self::TIMEOUT_VAR) {
            Ok(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: Self::TIMEOUT_VAR,
                value: raw.clone(),
            })?,
            Err(_) => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };
        Ok(Self::new(endpoint, api_key)
            .with_bind_addr(bind_addr)
            .with_upstream_timeout(Duration::from_secs(timeout_secs)))
    }

    /// Configuration from explicit values, with defaults for the rest.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            bind_addr: DEFAULT_PROXY_ADDR.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { name }),
    }
}
