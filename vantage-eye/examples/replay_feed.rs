//! Replay a recorded contour feed through a vision node and print what lands
//! on the bus.
//!
//! ```text
//! cargo run -p vantage-eye --example replay_feed -- frames.jsonl
//! ```

use std::sync::Arc;
use std::time::Duration;
use vantage_bus::{ControlBus, MemoryBus, CENTER_X, DISTANCE_TARGET, LEFT_TARGET, RIGHT_TARGET};
use vantage_core::{BusMode, CameraConfig, NodeConfig};
use vantage_eye::{ContourFeed, VisionConfig, VisionNode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: replay_feed <contours.jsonl>")?;

    let node_config = NodeConfig {
        team: 0,
        bus_mode: BusMode::Server,
        cameras: vec![CameraConfig::new("replay", "/dev/video0")],
    };
    let bus = Arc::new(MemoryBus::new());
    let node = VisionNode::new(node_config, VisionConfig::default(), bus.clone())?;
    node.start_cameras()?;

    let mut updates = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            println!(
                "{} {}: centerX={:?} left={:?} right={:?} distance={:?}",
                update.timestamp.format("%H:%M:%S%.3f"),
                update.table,
                update.get(CENTER_X),
                update.get(LEFT_TARGET),
                update.get(RIGHT_TARGET),
                update.get(DISTANCE_TARGET),
            );
        }
    });

    let feed = ContourFeed::open(&path, Some(Duration::from_millis(50))).await?;
    let worker = node.attach_pipeline(0, Box::new(feed))?;
    worker.join().await;

    let stats = worker.stats();
    println!(
        "{} frames, {} without target, {} failed",
        stats.frames_processed, stats.frames_without_target, stats.frames_failed
    );

    node.shutdown().await;
    printer.abort();
    Ok(())
}
