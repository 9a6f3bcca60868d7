//! vantage-eye: target tracking for the vantage vision node
//!
//! Contours from an external threshold pipeline are reduced to a pair of
//! bounding rectangles, the left and right strips of a retro-reflective
//! target. The resulting center, edges and distance estimate are published
//! to the control bus by a frame worker running on its own task.

pub mod camera;
pub mod config;
pub mod contour;
pub mod error;
pub mod pipeline;
pub mod publisher;
pub mod tracker;
pub mod vision_node;
pub mod worker;

pub use camera::{CameraSource, CameraState, ConnectionStrategy};
pub use config::VisionConfig;
pub use contour::{BoundingRect, Contour, Point};
pub use error::VisionError;
pub use pipeline::{ChannelPipeline, ContourFeed, FramePipeline, FrameSender};
pub use publisher::ResultPublisher;
pub use tracker::{select_pair, TargetResult, TargetTracker, DISTANCE_CONSTANT};
pub use vision_node::VisionNode;
pub use worker::{FrameWorker, WorkerState, WorkerStats, WorkerStatsSnapshot};
