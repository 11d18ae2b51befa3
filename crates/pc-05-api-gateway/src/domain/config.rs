//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use shared_types::ConfigError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// HTTP and stream settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (default: 0.0.0.0)
    pub host: IpAddr,
    /// HTTP port, also serving `/ws` (default: 3000)
    pub port: u16,
    /// Per-request timeout for REST routes (default: 30s)
    #[serde(with = "shared_types::duration_serde")]
    pub request_timeout: Duration,
    /// Allow any origin (default: true)
    pub cors_allow_any: bool,
    /// Origins allowed when `cors_allow_any` is false
    pub allowed_origins: Vec<String>,
    /// Ping a stream client silent for this long (default: 30s)
    #[serde(with = "shared_types::duration_serde")]
    pub ws_ping_interval: Duration,
    /// Drop a stream client silent for this long (default: 90s)
    #[serde(with = "shared_types::duration_serde")]
    pub ws_idle_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            request_timeout: Duration::from_secs(30),
            cors_allow_any: true,
            allowed_origins: Vec::new(),
            ws_ping_interval: Duration::from_secs(30),
            ws_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout cannot be 0".into(),
            ));
        }
        if self.ws_ping_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "ws_ping_interval cannot be 0".into(),
            ));
        }
        if self.ws_idle_timeout <= self.ws_ping_interval {
            return Err(ConfigError::InvalidTimeout(
                "ws_idle_timeout must exceed ws_ping_interval".into(),
            ));
        }
        if !self.cors_allow_any && self.allowed_origins.is_empty() {
            return Err(ConfigError::Missing(
                "allowed_origins (cors_allow_any is false)".into(),
            ));
        }
        Ok(())
    }

    /// HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Loopback, ephemeral port, short stream intervals.
    pub fn for_testing() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            request_timeout: Duration::from_secs(5),
            ws_ping_interval: Duration::from_millis(200),
            ws_idle_timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }
}
