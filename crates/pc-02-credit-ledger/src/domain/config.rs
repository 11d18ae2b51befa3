//! Admission gate configuration

use serde::{Deserialize, Serialize};
use shared_types::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Units debited per accepted write (default: 1)
    pub units_per_write: u64,
    /// Committed write ids remembered for replay (default: 100_000)
    pub max_tracked_writes: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            units_per_write: 1,
            max_tracked_writes: 100_000,
        }
    }
}

impl AdmissionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units_per_write == 0 {
            return Err(ConfigError::InvalidLimit("units_per_write cannot be 0".into()));
        }
        if self.max_tracked_writes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_tracked_writes cannot be 0".into(),
            ));
        }
        Ok(())
    }
}
