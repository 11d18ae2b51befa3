//! Client timing configuration

use serde::{Deserialize, Serialize};
use shared_types::{ClientConfig, ConfigError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientTimingConfig {
    /// Verification mirror poll (default: 500ms)
    #[serde(with = "shared_types::duration_serde")]
    pub transaction_check_interval: Duration,
    /// Server-side verification window (default: 2m)
    #[serde(with = "shared_types::duration_serde")]
    pub verification_timeout: Duration,
    /// Balance reconciliation poll (default: 500ms)
    #[serde(with = "shared_types::duration_serde")]
    pub balance_poll_interval: Duration,
    /// Balance reconciliation budget (default: 10s)
    #[serde(with = "shared_types::duration_serde")]
    pub balance_max_wait: Duration,
    /// Zero readings after nonzero that end reconciliation (default: 3)
    pub balance_anomaly_threshold: u32,
    /// Elapsed-time ticker period (default: 1s)
    #[serde(with = "shared_types::duration_serde")]
    pub ticker_interval: Duration,
    /// Stream heartbeat ping period (default: 15s)
    #[serde(with = "shared_types::duration_serde")]
    pub heartbeat_interval: Duration,
    /// Stream silence that forces a reconnect (default: 45s)
    #[serde(with = "shared_types::duration_serde")]
    pub silence_timeout: Duration,
    /// First reconnect delay (default: 2s)
    #[serde(with = "shared_types::duration_serde")]
    pub reconnect_initial: Duration,
    /// Reconnect delay cap (default: 60s)
    #[serde(with = "shared_types::duration_serde")]
    pub reconnect_max: Duration,
}

impl Default for ClientTimingConfig {
    fn default() -> Self {
        Self {
            transaction_check_interval: Duration::from_millis(500),
            verification_timeout: Duration::from_secs(120),
            balance_poll_interval: Duration::from_millis(500),
            balance_max_wait: Duration::from_secs(10),
            balance_anomaly_threshold: 3,
            ticker_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(15),
            silence_timeout: Duration::from_secs(45),
            reconnect_initial: Duration::from_secs(2),
            reconnect_max: Duration::from_secs(60),
        }
    }
}

impl ClientTimingConfig {
    /// Adopt the intervals the server publishes on `/api/v1/config`.
    pub fn from_server(config: &ClientConfig) -> Self {
        Self {
            transaction_check_interval: Duration::from_millis(config.transaction_check_interval_ms),
            verification_timeout: Duration::from_millis(config.verification_timeout_ms),
            balance_poll_interval: Duration::from_millis(config.balance_poll_interval_ms),
            balance_max_wait: Duration::from_millis(config.balance_max_wait_ms),
            balance_anomaly_threshold: config.balance_anomaly_threshold,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("transaction_check_interval", self.transaction_check_interval),
            ("balance_poll_interval", self.balance_poll_interval),
            ("ticker_interval", self.ticker_interval),
            ("heartbeat_interval", self.heartbeat_interval),
            ("reconnect_initial", self.reconnect_initial),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(ConfigError::InvalidTimeout(format!("{name} cannot be 0")));
            }
        }
        if self.silence_timeout <= self.heartbeat_interval {
            return Err(ConfigError::InvalidTimeout(
                "silence_timeout must exceed heartbeat_interval".into(),
            ));
        }
        if self.reconnect_max < self.reconnect_initial {
            return Err(ConfigError::InvalidTimeout(
                "reconnect_max is below reconnect_initial".into(),
            ));
        }
        if self.balance_anomaly_threshold == 0 {
            return Err(ConfigError::InvalidLimit(
                "balance_anomaly_threshold cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// Short intervals for tests.
    pub fn for_testing() -> Self {
        Self {
            transaction_check_interval: Duration::from_millis(50),
            verification_timeout: Duration::from_secs(2),
            balance_poll_interval: Duration::from_millis(50),
            balance_max_wait: Duration::from_secs(1),
            balance_anomaly_threshold: 3,
            ticker_interval: Duration::from_millis(100),
            heartbeat_interval: Duration::from_millis(200),
            silence_timeout: Duration::from_millis(600),
            reconnect_initial: Duration::from_millis(50),
            reconnect_max: Duration::from_millis(400),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = ClientTimingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.balance_poll_interval, Duration::from_millis(500));
        assert_eq!(config.balance_max_wait, Duration::from_secs(10));
        assert!(ClientTimingConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_from_server() {
        let server = ClientConfig {
            canvas_width: 100,
            canvas_height: 100,
            pixel_pack_cost_sompi: 20_000_000,
            pixel_pack_size: 10,
            receiver_address: None,
            verify_transactions: true,
            verification_timeout_ms: 60_000,
            transaction_check_interval_ms: 250,
            balance_poll_interval_ms: 750,
            balance_max_wait_ms: 5_000,
            balance_anomaly_threshold: 2,
        };

        let timing = ClientTimingConfig::from_server(&server);

        assert_eq!(timing.transaction_check_interval, Duration::from_millis(250));
        assert_eq!(timing.verification_timeout, Duration::from_secs(60));
        assert_eq!(timing.balance_anomaly_threshold, 2);
        assert_eq!(timing.reconnect_max, Duration::from_secs(60));
    }
}
