//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. a JSON file named by `PC_CONFIG_FILE`
//! 3. environment variables
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CANVAS_WIDTH`, `CANVAS_HEIGHT` | `canvas.width`, `canvas.height` |
//! | `PIXEL_PACK_COST` | `pricing.pack_cost_sompi`, given in KAS (`0.2`) |
//! | `PIXEL_PACK_SIZE` | `pricing.pack_size` |
//! | `RECEIVER_ADDRESS` | `pricing.receiver_address` |
//! | `VERIFY_TRANSACTIONS` | `verification.enabled` |
//! | `PC_VERIFY_POLL_INTERVAL`, `PC_VERIFY_TIMEOUT` | `verification.poll_interval`, `verification.timeout` |
//! | `KASPA_API_URL` (or `NEXT_PUBLIC_KASPA_URL`) | `verification.oracle_url` |
//! | `TRANSACTION_CHECK_INTERVAL` | `client.transaction_check_interval`, in milliseconds |
//! | `PC_HTTP_HOST`, `PC_HTTP_PORT` | `gateway.host`, `gateway.port` |
//! | `PC_DATA_DIR` | `storage.data_dir` |
//! | `PC_EVENT_BUS_CAPACITY` | `event_bus_capacity` |

use pc_01_canvas_store::CanvasConfig;
use pc_02_credit_ledger::AdmissionConfig;
use pc_03_payment_verification::{PricingConfig, VerificationConfig};
use pc_05_api_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use shared_types::duration_serde::parse_duration;
use shared_types::{ClientConfig, ConfigError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Sompi per KAS.
pub const SOMPI_PER_KAS: u64 = 100_000_000;

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub canvas: CanvasConfig,
    pub admission: AdmissionConfig,
    pub pricing: PricingConfig,
    pub verification: VerificationConfig,
    pub gateway: GatewayConfig,
    /// Timing hints published to clients on `/api/v1/config`.
    pub client: ClientHintsConfig,
    pub storage: StorageConfig,
    /// Per-subscriber event ring size (default: 1024)
    pub event_bus_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            admission: AdmissionConfig::default(),
            pricing: PricingConfig::default(),
            verification: VerificationConfig::default(),
            gateway: GatewayConfig::default(),
            client: ClientHintsConfig::default(),
            storage: StorageConfig::default(),
            event_bus_capacity: 1024,
        }
    }
}

/// Client-facing reconciliation timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientHintsConfig {
    /// Verification mirror poll (default: 500ms)
    #[serde(with = "shared_types::duration_serde")]
    pub transaction_check_interval: Duration,
    /// Balance reconciliation poll (default: 500ms)
    #[serde(with = "shared_types::duration_serde")]
    pub balance_poll_interval: Duration,
    /// Balance reconciliation budget (default: 10s)
    #[serde(with = "shared_types::duration_serde")]
    pub balance_max_wait: Duration,
    /// Zero readings after nonzero that end reconciliation (default: 3)
    pub balance_anomaly_threshold: u32,
}

impl Default for ClientHintsConfig {
    fn default() -> Self {
        Self {
            transaction_check_interval: Duration::from_millis(500),
            balance_poll_interval: Duration::from_millis(500),
            balance_max_wait: Duration::from_secs(10),
            balance_anomaly_threshold: 3,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// RocksDB directory. `None` keeps all state in memory.
    pub data_dir: Option<PathBuf>,
}

impl NodeConfig {
    /// Defaults, then `PC_CONFIG_FILE`, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("PC_CONFIG_FILE") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("cannot read {path}: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Invalid(format!("cannot parse {path}: {e}")))
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("CANVAS_WIDTH") {
            self.canvas.width = parse_value("CANVAS_WIDTH", &v)?;
        }
        if let Some(v) = get("CANVAS_HEIGHT") {
            self.canvas.height = parse_value("CANVAS_HEIGHT", &v)?;
        }
        if let Some(v) = get("PIXEL_PACK_COST") {
            self.pricing.pack_cost_sompi = parse_kas("PIXEL_PACK_COST", &v)?;
        }
        if let Some(v) = get("PIXEL_PACK_SIZE") {
            self.pricing.pack_size = parse_value("PIXEL_PACK_SIZE", &v)?;
        }
        if let Some(v) = get("RECEIVER_ADDRESS") {
            self.pricing.receiver_address = Some(v);
        }
        if let Some(v) = get("VERIFY_TRANSACTIONS") {
            self.verification.enabled = parse_flag("VERIFY_TRANSACTIONS", &v)?;
        }
        if let Some(v) = get("PC_VERIFY_POLL_INTERVAL") {
            self.verification.poll_interval = parse_interval("PC_VERIFY_POLL_INTERVAL", &v)?;
        }
        if let Some(v) = get("PC_VERIFY_TIMEOUT") {
            self.verification.timeout = parse_interval("PC_VERIFY_TIMEOUT", &v)?;
        }
        if let Some(v) = get("KASPA_API_URL").or_else(|| get("NEXT_PUBLIC_KASPA_URL")) {
            self.verification.oracle_url = v;
        }
        if let Some(v) = get("TRANSACTION_CHECK_INTERVAL") {
            let millis: u64 = parse_value("TRANSACTION_CHECK_INTERVAL", &v)?;
            self.client.transaction_check_interval = Duration::from_millis(millis);
        }
        if let Some(v) = get("PC_HTTP_HOST") {
            self.gateway.host = parse_value("PC_HTTP_HOST", &v)?;
        }
        if let Some(v) = get("PC_HTTP_PORT") {
            self.gateway.port = parse_value("PC_HTTP_PORT", &v)?;
        }
        if let Some(v) = get("PC_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("PC_EVENT_BUS_CAPACITY") {
            self.event_bus_capacity = parse_value("PC_EVENT_BUS_CAPACITY", &v)?;
        }
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.canvas.validate()?;
        self.admission.validate()?;
        self.pricing.validate()?;
        self.verification.validate()?;
        self.gateway.validate()?;
        self.client.validate()?;
        if self.event_bus_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "event_bus_capacity cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// The subset served on `/api/v1/config`.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            canvas_width: self.canvas.width,
            canvas_height: self.canvas.height,
            pixel_pack_cost_sompi: self.pricing.pack_cost_sompi,
            pixel_pack_size: self.pricing.pack_size,
            receiver_address: self.pricing.receiver_address.clone(),
            verify_transactions: self.verification.enabled,
            verification_timeout_ms: millis(self.verification.timeout),
            transaction_check_interval_ms: millis(self.client.transaction_check_interval),
            balance_poll_interval_ms: millis(self.client.balance_poll_interval),
            balance_max_wait_ms: millis(self.client.balance_max_wait),
            balance_anomaly_threshold: self.client.balance_anomaly_threshold,
        }
    }

    /// Small canvas, loopback gateway on an ephemeral port, fast polling.
    pub fn for_testing() -> Self {
        Self {
            canvas: CanvasConfig::for_testing(16, 16),
            pricing: PricingConfig {
                receiver_address: Some("kaspa:receiver".into()),
                ..PricingConfig::default()
            },
            verification: VerificationConfig::for_testing(),
            gateway: GatewayConfig::for_testing(),
            client: ClientHintsConfig {
                transaction_check_interval: Duration::from_millis(50),
                balance_poll_interval: Duration::from_millis(50),
                balance_max_wait: Duration::from_secs(2),
                balance_anomaly_threshold: 3,
            },
            ..Self::default()
        }
    }
}

impl ClientHintsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transaction_check_interval.is_zero() || self.balance_poll_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "client poll intervals cannot be 0".into(),
            ));
        }
        if self.balance_max_wait < self.balance_poll_interval {
            return Err(ConfigError::InvalidTimeout(
                "balance_max_wait is shorter than balance_poll_interval".into(),
            ));
        }
        if self.balance_anomaly_threshold == 0 {
            return Err(ConfigError::InvalidLimit(
                "balance_anomaly_threshold cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key}={value:?} is not valid")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid(format!("{key}={value:?} is not a boolean"))),
    }
}

fn parse_interval(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).map_err(|e| ConfigError::InvalidTimeout(format!("{key}: {e}")))
}

/// Decimal KAS (`"0.2"`, `"1"`, `"0.00000001"`) to sompi, without floats.
pub fn parse_kas(key: &str, value: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::Invalid(format!("{key}={value:?} is not a KAS amount"));
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if fraction.len() > 8 || (whole.is_empty() && fraction.is_empty()) {
        return Err(invalid());
    }
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let fraction_sompi: u64 = if fraction.is_empty() {
        0
    } else {
        let digits: u64 = fraction.parse().map_err(|_| invalid())?;
        digits * 10u64.pow(8 - fraction.len() as u32)
    };
    whole
        .checked_mul(SOMPI_PER_KAS)
        .and_then(|sompi| sompi.checked_add(fraction_sompi))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NodeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.canvas.width, 1000);
        assert_eq!(config.canvas.height, 1000);
        assert_eq!(config.pricing.pack_cost_sompi, 20_000_000);
        assert_eq!(config.pricing.pack_size, 10);
        assert_eq!(config.pricing.receiver_address, None);
        assert!(config.verification.enabled);
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.event_bus_capacity, 1024);
        assert_eq!(config.storage.data_dir, None);
    }

    #[test]
    fn test_env_overrides() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("CANVAS_WIDTH", "64"),
            ("CANVAS_HEIGHT", "32"),
            ("PIXEL_PACK_COST", "0.5"),
            ("PIXEL_PACK_SIZE", "25"),
            ("RECEIVER_ADDRESS", "kaspa:qpreceiver"),
            ("VERIFY_TRANSACTIONS", "False"),
            ("TRANSACTION_CHECK_INTERVAL", "250"),
            ("KASPA_API_URL", "http://localhost:8000"),
            ("PC_HTTP_PORT", "8080"),
            ("PC_VERIFY_TIMEOUT", "3m"),
        ]))
        .unwrap();

        assert_eq!(config.canvas.dimensions().width, 64);
        assert_eq!(config.canvas.dimensions().height, 32);
        assert_eq!(config.pricing.pack_cost_sompi, 50_000_000);
        assert_eq!(config.pricing.pack_size, 25);
        assert_eq!(
            config.pricing.receiver_address.as_deref(),
            Some("kaspa:qpreceiver")
        );
        assert!(!config.verification.enabled);
        assert_eq!(config.verification.oracle_url, "http://localhost:8000");
        assert_eq!(config.verification.timeout, Duration::from_secs(180));
        assert_eq!(
            config.client.transaction_check_interval,
            Duration::from_millis(250)
        );
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn test_legacy_oracle_variable() {
        let config =
            NodeConfig::from_lookup(lookup(&[("NEXT_PUBLIC_KASPA_URL", "http://kas:8000")]))
                .unwrap();
        assert_eq!(config.verification.oracle_url, "http://kas:8000");
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = NodeConfig::from_lookup(lookup(&[("RECEIVER_ADDRESS", "  ")])).unwrap();
        assert_eq!(config.pricing.receiver_address, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(NodeConfig::from_lookup(lookup(&[("CANVAS_WIDTH", "wide")])).is_err());
        assert!(NodeConfig::from_lookup(lookup(&[("CANVAS_WIDTH", "0")])).is_err());
        assert!(NodeConfig::from_lookup(lookup(&[("VERIFY_TRANSACTIONS", "maybe")])).is_err());
        assert!(NodeConfig::from_lookup(lookup(&[("PIXEL_PACK_COST", "0")])).is_err());
        assert!(NodeConfig::from_lookup(lookup(&[("PC_EVENT_BUS_CAPACITY", "0")])).is_err());
    }

    #[test]
    fn test_parse_kas() {
        assert_eq!(parse_kas("k", "0.2"), Ok(20_000_000));
        assert_eq!(parse_kas("k", "1"), Ok(100_000_000));
        assert_eq!(parse_kas("k", "1.5"), Ok(150_000_000));
        assert_eq!(parse_kas("k", ".25"), Ok(25_000_000));
        assert_eq!(parse_kas("k", "0.00000001"), Ok(1));
        assert!(parse_kas("k", "0.000000001").is_err());
        assert!(parse_kas("k", "abc").is_err());
        assert!(parse_kas("k", ".").is_err());
    }

    #[test]
    fn test_client_config_subset() {
        let mut config = NodeConfig::for_testing();
        config.verification.timeout = Duration::from_secs(120);
        let client = config.client_config();

        assert_eq!(client.canvas_width, 16);
        assert_eq!(client.pixel_pack_cost_sompi, 20_000_000);
        assert_eq!(client.receiver_address.as_deref(), Some("kaspa:receiver"));
        assert_eq!(client.verification_timeout_ms, 120_000);
        assert_eq!(client.transaction_check_interval_ms, 50);
        assert_eq!(client.balance_anomaly_threshold, 3);
    }

    #[test]
    fn test_file_config_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        std::fs::write(
            &path,
            r#"{"canvas": {"width": 50, "height": 40}, "verification": {"poll_interval": "250ms"}}"#,
        )
        .unwrap();

        let config = NodeConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.canvas.width, 50);
        assert_eq!(config.canvas.lock_stripes, 64);
        assert_eq!(config.verification.poll_interval, Duration::from_millis(250));
        assert_eq!(config.verification.timeout, Duration::from_secs(120));
    }
}
