//! Node configuration: team number, bus mode and camera descriptors.
//!
//! The file format is the one written by the robot's coprocessor image
//! (`/boot/frc.json` by default):
//!
//! ```json
//! {
//!     "team": 1234,
//!     "ntmode": "client",
//!     "cameras": [
//!         { "name": "front", "path": "/dev/video0", "width": 320, "height": 240 }
//!     ]
//! }
//! ```
//!
//! Every camera object is kept as-is so that device and stream properties can
//! be handed to the camera layer without being interpreted here.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Default location of the node configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/boot/frc.json";

/// Role this node plays on the control bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusMode {
    /// Connect to the robot controller's bus server
    #[default]
    Client,
    /// Host the bus locally
    Server,
}

impl BusMode {
    /// Parse a mode name, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("client") {
            Some(BusMode::Client)
        } else if value.eq_ignore_ascii_case("server") {
            Some(BusMode::Server)
        } else {
            None
        }
    }
}

impl fmt::Display for BusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusMode::Client => write!(f, "client"),
            BusMode::Server => write!(f, "server"),
        }
    }
}

/// One configured camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Camera name, used as the video source name
    pub name: String,
    /// Device path, e.g. `/dev/video0`
    pub path: String,
    /// The complete camera object from the configuration file
    pub settings: Value,
    /// The optional `stream` member
    pub stream_settings: Option<Value>,
}

impl CameraConfig {
    /// Build a camera descriptor with no extra settings
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        let path = path.into();
        let mut settings = Map::new();
        settings.insert("name".to_string(), Value::String(name.clone()));
        settings.insert("path".to_string(), Value::String(path.clone()));
        Self {
            name,
            path,
            settings: Value::Object(settings),
            stream_settings: None,
        }
    }

    pub fn width(&self) -> Option<u32> {
        self.setting_u32("width")
    }

    pub fn height(&self) -> Option<u32> {
        self.setting_u32("height")
    }

    pub fn fps(&self) -> Option<u32> {
        self.setting_u32("fps")
    }

    pub fn pixel_format(&self) -> Option<&str> {
        self.settings.get("pixel format").and_then(Value::as_str)
    }

    fn setting_u32(&self, key: &str) -> Option<u32> {
        self.settings
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }
}

/// Validated node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Team number, used to locate the bus server in client mode
    pub team: i32,
    pub bus_mode: BusMode,
    pub cameras: Vec<CameraConfig>,
}

impl NodeConfig {
    /// Whether the bus should be hosted locally
    pub fn is_server(&self) -> bool {
        self.bus_mode == BusMode::Server
    }
}

/// Read and parse a configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<NodeConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("could not open '{}': {}", path.display(), e)))?;
    parse_config(&text, path)
}

/// Parse configuration text. `origin` only appears in error messages.
pub fn parse_config(text: &str, origin: impl AsRef<Path>) -> Result<NodeConfig> {
    let origin = origin.as_ref().to_path_buf();
    let top: Value = serde_json::from_str(text)
        .map_err(|e| parse_error(&origin, format!("invalid JSON: {}", e)))?;

    let obj = top
        .as_object()
        .ok_or_else(|| parse_error(&origin, "must be JSON object"))?;

    let team = obj
        .get("team")
        .and_then(read_int)
        .ok_or_else(|| parse_error(&origin, "could not read team number"))?;

    let mut bus_mode = BusMode::Client;
    if let Some(mode) = obj.get("ntmode") {
        let text = mode.as_str().unwrap_or_default();
        match BusMode::parse(text) {
            Some(parsed) => bus_mode = parsed,
            None => warn!(
                "config error in '{}': could not understand ntmode value '{}'",
                origin.display(),
                text
            ),
        }
    }

    let cameras = obj
        .get("cameras")
        .and_then(Value::as_array)
        .ok_or_else(|| parse_error(&origin, "could not read cameras"))?
        .iter()
        .map(|camera| read_camera(camera, &origin))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Loaded configuration from '{}': team {}, {} mode, {} camera(s)",
        origin.display(),
        team,
        bus_mode,
        cameras.len()
    );

    Ok(NodeConfig {
        team,
        bus_mode,
        cameras,
    })
}

fn read_camera(value: &Value, origin: &Path) -> Result<CameraConfig> {
    let obj = value
        .as_object()
        .ok_or_else(|| parse_error(origin, "camera entry must be JSON object"))?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_error(origin, "could not read camera name"))?
        .to_string();

    let path = obj
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_error(origin, format!("camera '{}': could not read path", name)))?
        .to_string();

    Ok(CameraConfig {
        name,
        path,
        settings: value.clone(),
        stream_settings: obj.get("stream").cloned(),
    })
}

// Numeric strings are accepted the same way the coprocessor tooling writes them.
fn read_int(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_error(origin: &Path, reason: impl fmt::Display) -> Error {
    Error::Config(format!("config error in '{}': {}", origin.display(), reason))
}
