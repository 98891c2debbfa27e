//! Rendering configuration.

use serde::{Deserialize, Serialize};

use storm_common::{StormError, StormResult};

/// Frame size, map extent padding and animation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Degrees added around the watershed bounds.
    pub buffer_degrees: f64,
    /// Delay between GIF frames in milliseconds.
    pub frame_delay_ms: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            buffer_degrees: 0.25,
            frame_delay_ms: 100,
        }
    }
}

impl RenderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FRAME_WIDTH") {
            if let Ok(width) = val.parse() {
                config.width = width;
            }
        }

        if let Ok(val) = std::env::var("FRAME_HEIGHT") {
            if let Ok(height) = val.parse() {
                config.height = height;
            }
        }

        if let Ok(val) = std::env::var("MAP_BUFFER_DEGREES") {
            if let Ok(buffer) = val.parse() {
                config.buffer_degrees = buffer;
            }
        }

        if let Ok(val) = std::env::var("FRAME_DELAY_MS") {
            if let Ok(delay) = val.parse() {
                config.frame_delay_ms = delay;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> StormResult<()> {
        if self.width < 160 || self.height < 120 {
            return Err(StormError::Config(format!(
                "frame size {}x{} is below the 160x120 minimum",
                self.width, self.height
            )));
        }

        if !self.buffer_degrees.is_finite() || self.buffer_degrees < 0.0 {
            return Err(StormError::Config(format!(
                "buffer_degrees must be >= 0, got {}",
                self.buffer_degrees
            )));
        }

        if self.frame_delay_ms == 0 {
            return Err(StormError::Config("frame_delay_ms must be > 0".to_string()));
        }

        Ok(())
    }
}
