//! Canvas store configuration

use serde::{Deserialize, Serialize};
use shared_types::{CanvasDimensions, ConfigError};

/// Canvas store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Grid width in cells (default: 1000)
    pub width: u32,
    /// Grid height in cells (default: 1000)
    pub height: u32,
    /// Number of independently locked stripes (default: 64)
    pub lock_stripes: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            lock_stripes: 64,
        }
    }
}

impl CanvasConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidLimit(format!(
                "canvas must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }

        if self.lock_stripes == 0 {
            return Err(ConfigError::InvalidLimit("lock_stripes cannot be 0".into()));
        }

        Ok(())
    }

    pub fn dimensions(&self) -> CanvasDimensions {
        CanvasDimensions::new(self.width, self.height)
    }

    /// Small grid for tests.
    pub fn for_testing(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            lock_stripes: 4,
        }
    }
}
