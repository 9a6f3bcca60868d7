//! Camera sources
//!
//! Capture, video mode negotiation and MJPEG streaming are done by the
//! camera server outside this crate. A [`CameraSource`] carries one camera's
//! configuration to it and tracks the source's lifecycle.

use crate::error::VisionError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vantage_core::CameraConfig;

/// What the camera server does when nobody is reading the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStrategy {
    /// Keep the device open regardless of readers
    KeepOpen,
    /// Open the device only while the stream has readers
    AutoManage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraState {
    Idle,
    Started,
    Stopped,
}

/// One configured camera as a named video source
pub struct CameraSource {
    config: CameraConfig,
    state: RwLock<CameraState>,
    resolution: RwLock<Option<(u32, u32)>>,
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Self {
        let resolution = match (config.width(), config.height()) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        };
        Self {
            config,
            state: RwLock::new(CameraState::Idle),
            resolution: RwLock::new(resolution),
        }
    }

    /// Start the source
    pub fn start(&self) -> Result<(), VisionError> {
        let mut state = self.state.write();
        if *state == CameraState::Started {
            return Err(VisionError::Camera(format!(
                "Camera '{}' already running",
                self.config.name
            )));
        }
        if self.config.path.trim().is_empty() {
            return Err(VisionError::Camera(format!(
                "Camera '{}' has no device path",
                self.config.name
            )));
        }

        info!("Starting camera '{}' on {}", self.config.name, self.config.path);
        debug!(
            "Camera '{}' settings: {}",
            self.config.name,
            self.device_settings_json()?
        );
        if let Some(stream) = self.stream_settings_json()? {
            debug!("Camera '{}' stream settings: {}", self.config.name, stream);
        }
        *state = CameraState::Started;
        Ok(())
    }

    pub fn stop(&self) {
        let mut state = self.state.write();
        if *state == CameraState::Started {
            info!("Camera '{}' stopped", self.config.name);
        }
        *state = CameraState::Stopped;
    }

    /// Override the video mode resolution
    pub fn set_resolution(&self, width: u32, height: u32) -> Result<(), VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::Camera(format!(
                "Invalid resolution {}x{} for camera '{}'",
                width, height, self.config.name
            )));
        }
        *self.resolution.write() = Some((width, height));
        Ok(())
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        *self.resolution.read()
    }

    pub fn connection_strategy(&self) -> ConnectionStrategy {
        ConnectionStrategy::KeepOpen
    }

    /// Device settings for the camera server, as written in the node
    /// configuration with the resolution override applied
    pub fn device_settings_json(&self) -> Result<String, VisionError> {
        let mut settings = self.config.settings.clone();
        if let (Some((width, height)), Some(obj)) = (self.resolution(), settings.as_object_mut()) {
            obj.insert("width".to_string(), width.into());
            obj.insert("height".to_string(), height.into());
        }
        Ok(serde_json::to_string(&settings)?)
    }

    /// Stream settings for the camera server, if configured
    pub fn stream_settings_json(&self) -> Result<Option<String>, VisionError> {
        self.config
            .stream_settings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(VisionError::from)
    }

    pub fn state(&self) -> CameraState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state() == CameraState::Started
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn path(&self) -> &str {
        &self.config.path
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}
