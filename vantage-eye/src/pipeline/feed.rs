use super::FramePipeline;
use crate::contour::Contour;
use crate::error::VisionError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

/// Replays recorded contour frames, one JSON array of contours per line:
///
/// ```text
/// [[[200,40],[219,40],[219,99],[200,99]], [[100,40],[119,40],[119,99],[100,99]]]
/// []
/// ```
///
/// Blank lines are skipped. A line that does not parse is reported as a
/// failed frame and the feed moves on to the next line.
pub struct ContourFeed<R> {
    lines: Lines<R>,
    source: String,
    line_no: usize,
    interval: Option<Duration>,
    frames_read: u64,
}

impl ContourFeed<BufReader<File>> {
    /// Open a recording on disk
    pub async fn open(
        path: impl AsRef<Path>,
        interval: Option<Duration>,
    ) -> Result<Self, VisionError> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|e| {
            VisionError::Pipeline(format!("could not open contour feed '{}': {}", path.display(), e))
        })?;
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
            interval,
        ))
    }
}

impl<R> ContourFeed<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Feed from any buffered reader. `source` names it in messages.
    pub fn from_reader(reader: R, source: impl Into<String>, interval: Option<Duration>) -> Self {
        Self {
            lines: reader.lines(),
            source: source.into(),
            line_no: 0,
            interval,
            frames_read: 0,
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

#[async_trait]
impl<R> FramePipeline for ContourFeed<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_frame(&mut self) -> Result<Option<Vec<Contour>>, VisionError> {
        if let Some(interval) = self.interval {
            if self.frames_read > 0 {
                tokio::time::sleep(interval).await;
            }
        }

        loop {
            let line = match self.lines.next_line().await? {
                Some(line) => line,
                None => {
                    debug!("Contour feed '{}' ended after {} frames", self.source, self.frames_read);
                    return Ok(None);
                }
            };
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            self.frames_read += 1;
            return serde_json::from_str::<Vec<Contour>>(line)
                .map(Some)
                .map_err(|e| {
                    VisionError::Pipeline(format!(
                        "{}:{}: malformed frame: {}",
                        self.source, self.line_no, e
                    ))
                });
        }
    }

    fn name(&self) -> &str {
        &self.source
    }
}
