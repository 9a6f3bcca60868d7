//! Configuration for vantage-eye

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vision processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Processing resolution applied to the primary camera (width, height)
    pub resolution: (u32, u32),
    /// Bus table that receives the primary camera's target entries
    pub table_name: String,
    /// Pause after a frame could not be acquired
    pub error_backoff_ms: u64,
    /// Capacity of channel-fed frame pipelines
    pub frame_buffer: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            resolution: (320, 240),
            table_name: "TestTable".to_string(),
            error_backoff_ms: 100,
            frame_buffer: 30, // ~1 second at 30fps
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        if self.resolution.0 > 7680 || self.resolution.1 > 4320 {
            return Err("Resolution too large (max 8K)".to_string());
        }

        if self.table_name.trim().is_empty() {
            return Err("Table name must not be empty".to_string());
        }

        if self.error_backoff_ms > 10_000 {
            return Err("Error backoff too large (max 10000ms)".to_string());
        }

        if self.frame_buffer == 0 {
            return Err("Frame buffer must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}
