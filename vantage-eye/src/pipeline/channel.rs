use super::FramePipeline;
use crate::contour::Contour;
use crate::error::VisionError;
use async_trait::async_trait;
use tokio::sync::mpsc;

type FrameMessage = Result<Vec<Contour>, VisionError>;

/// Pipeline fed through a bounded channel
pub struct ChannelPipeline {
    receiver: mpsc::Receiver<FrameMessage>,
}

/// Producer side of a [`ChannelPipeline`]. Dropping every sender ends the
/// stream.
#[derive(Clone)]
pub struct FrameSender {
    sender: mpsc::Sender<FrameMessage>,
}

impl ChannelPipeline {
    pub fn new(capacity: usize) -> (FrameSender, ChannelPipeline) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (FrameSender { sender }, ChannelPipeline { receiver })
    }
}

#[async_trait]
impl FramePipeline for ChannelPipeline {
    async fn next_frame(&mut self) -> Result<Option<Vec<Contour>>, VisionError> {
        match self.receiver.recv().await {
            Some(Ok(contours)) => Ok(Some(contours)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn name(&self) -> &str {
        "channel"
    }
}

impl FrameSender {
    /// Queue one frame, waiting for room
    pub async fn send_frame(&self, contours: Vec<Contour>) -> Result<(), VisionError> {
        self.send(Ok(contours)).await
    }

    /// Report a frame that could not be acquired
    pub async fn send_error(&self, error: VisionError) -> Result<(), VisionError> {
        self.send(Err(error)).await
    }

    /// Queue one frame without waiting. Fails when the buffer is full.
    pub fn try_send_frame(&self, contours: Vec<Contour>) -> Result<(), VisionError> {
        self.sender.try_send(Ok(contours)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                VisionError::Pipeline("Frame buffer full, frame dropped".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                VisionError::Pipeline("Frame receiver dropped".to_string())
            }
        })
    }

    async fn send(&self, message: FrameMessage) -> Result<(), VisionError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| VisionError::Pipeline("Frame receiver dropped".to_string()))
    }
}
