//! vantage-core: shared pieces of the vantage vision node
//!
//! Holds the error type used across the workspace and the node
//! configuration model together with its JSON loader.

pub mod config;
pub mod error;

pub use config::{load_config, parse_config, BusMode, CameraConfig, NodeConfig, DEFAULT_CONFIG_PATH};
pub use error::{Error, Result};
