//! Payment verification and pricing configuration

use serde::{Deserialize, Serialize};
use shared_types::ConfigError;
use std::time::Duration;

/// Default Kaspa REST endpoint.
pub const DEFAULT_ORACLE_URL: &str = "http://de4.kaspa.org:8000";

/// Verification state machine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Poll the finality oracle (default: true). When false, purchases are
    /// confirmed on submission.
    pub enabled: bool,
    /// Delay between oracle polls (default: 1s)
    #[serde(with = "shared_types::duration_serde")]
    pub poll_interval: Duration,
    /// Window after submission before a payment times out (default: 2m)
    #[serde(with = "shared_types::duration_serde")]
    pub timeout: Duration,
    /// Base URL of the finality oracle
    pub oracle_url: String,
    /// Timeout of a single oracle request (default: 10s)
    #[serde(with = "shared_types::duration_serde")]
    pub oracle_request_timeout: Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_millis(1000),
            timeout: Duration::from_secs(120),
            oracle_url: DEFAULT_ORACLE_URL.to_string(),
            oracle_request_timeout: Duration::from_secs(10),
        }
    }
}

impl VerificationConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "poll_interval cannot be 0".into(),
            ));
        }
        if self.timeout < self.poll_interval {
            return Err(ConfigError::InvalidTimeout(format!(
                "timeout {:?} is shorter than poll_interval {:?}",
                self.timeout, self.poll_interval
            )));
        }
        if self.oracle_request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "oracle_request_timeout cannot be 0".into(),
            ));
        }
        if self.enabled && self.oracle_url.trim().is_empty() {
            return Err(ConfigError::Missing("oracle_url".into()));
        }
        Ok(())
    }

    /// Short intervals for tests.
    pub fn for_testing() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(2),
            oracle_url: "http://127.0.0.1:0".to_string(),
            oracle_request_timeout: Duration::from_millis(500),
        }
    }
}

/// Write-unit pricing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Cost of one pack in sompi (default: 20_000_000, i.e. 0.2 KAS)
    pub pack_cost_sompi: u64,
    /// Write units per pack (default: 10)
    pub pack_size: u64,
    /// Address purchases must pay to
    pub receiver_address: Option<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            pack_cost_sompi: 20_000_000,
            pack_size: 10,
            receiver_address: None,
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pack_cost_sompi == 0 {
            return Err(ConfigError::InvalidLimit("pack_cost_sompi cannot be 0".into()));
        }
        if self.pack_size == 0 {
            return Err(ConfigError::InvalidLimit("pack_size cannot be 0".into()));
        }
        Ok(())
    }

    /// Write units bought by `amount_sompi`: whole packs only.
    pub fn units_for_amount(&self, amount_sompi: u64) -> u64 {
        (amount_sompi / self.pack_cost_sompi).saturating_mul(self.pack_size)
    }
}
