//! Frame pipeline adapters
//!
//! The color-threshold and contour-extraction stages run outside this crate.
//! A [`FramePipeline`] hands their per-frame output to the frame worker.

mod channel;
mod feed;

pub use channel::{ChannelPipeline, FrameSender};
pub use feed::ContourFeed;

use crate::contour::Contour;
use crate::error::VisionError;
use async_trait::async_trait;

/// Source of per-frame contours
#[async_trait]
pub trait FramePipeline: Send {
    /// Wait for the next frame's contours.
    ///
    /// `Ok(None)` means the stream has ended. An error covers one frame only;
    /// callers may keep reading. Implementations must be cancel safe: dropping
    /// the future must not lose a frame that was not yet returned.
    async fn next_frame(&mut self) -> Result<Option<Vec<Contour>>, VisionError>;

    /// Name used in log messages
    fn name(&self) -> &str {
        "pipeline"
    }
}
