//! Error types for vantage-eye

use thiserror::Error;
use vantage_core::Error as CoreError;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Core(inner) => inner,
            other => CoreError::Vision(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::Camera("Test error".to_string());
        assert!(err.to_string().contains("Camera error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        assert!(matches!(vision_err, VisionError::Io(_)));
    }

    #[test]
    fn test_vision_error_to_core_error() {
        let core_err: CoreError = VisionError::Pipeline("decode failed".to_string()).into();
        match core_err {
            CoreError::Vision(msg) => {
                assert!(msg.contains("Pipeline error"));
                assert!(msg.contains("decode failed"));
            }
            other => panic!("Expected Vision error, got {:?}", other),
        }
    }

    #[test]
    fn test_core_error_round_trip_unwraps() {
        let vision_err: VisionError = CoreError::Bus("down".to_string()).into();
        let core_err: CoreError = vision_err.into();
        assert!(matches!(core_err, CoreError::Bus(_)));
    }
}
