//! End-to-end: recorded contours through a vision node onto the bus

use std::sync::Arc;
use std::time::Duration;
use vantage_bus::{ControlBus, MemoryBus, CENTER_X, DISTANCE_TARGET, LEFT_TARGET, RIGHT_TARGET};
use vantage_core::{BusMode, CameraConfig, NodeConfig};
use vantage_eye::{Contour, ContourFeed, VisionConfig, VisionError, VisionNode, WorkerState};

fn node_config(cameras: &[&str]) -> NodeConfig {
    NodeConfig {
        team: 4904,
        bus_mode: BusMode::Server,
        cameras: cameras
            .iter()
            .enumerate()
            .map(|(i, name)| CameraConfig::new(*name, format!("/dev/video{}", i)))
            .collect(),
    }
}

fn vision_config() -> VisionConfig {
    VisionConfig {
        error_backoff_ms: 1,
        ..VisionConfig::default()
    }
}

#[tokio::test]
async fn test_feed_to_bus() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frames.jsonl");
    let frames = [
        serde_json::to_string(&vec![Contour::from_rect(300, 0, 10, 10)]).unwrap(),
        "garbage".to_string(),
        serde_json::to_string(&vec![
            Contour::from_rect(200, 40, 20, 60),
            Contour::from_rect(100, 40, 20, 60),
        ])
        .unwrap(),
    ];
    std::fs::write(&path, frames.join("\n")).unwrap();

    let bus = Arc::new(MemoryBus::new());
    let node = VisionNode::new(node_config(&["front"]), vision_config(), bus.clone()).unwrap();
    node.start_cameras().unwrap();

    let feed = ContourFeed::open(&path, None).await.unwrap();
    let worker = node.attach_pipeline(0, Box::new(feed)).unwrap();

    // The feed ends after three lines and the worker stops on its own.
    tokio::time::timeout(Duration::from_secs(2), worker.join())
        .await
        .expect("worker did not finish the feed");
    assert_eq!(worker.state(), WorkerState::Stopped);

    let stats = worker.stats();
    assert_eq!(stats.frames_processed, 2);
    assert_eq!(stats.frames_without_target, 1);
    assert_eq!(stats.frames_failed, 1);

    assert_eq!(bus.get_number("TestTable", CENTER_X), Some(160.0));
    assert_eq!(bus.get_number("TestTable", LEFT_TARGET), Some(110.0));
    assert_eq!(bus.get_number("TestTable", RIGHT_TARGET), Some(210.0));
    let distance = bus.get_number("TestTable", DISTANCE_TARGET).unwrap();
    assert!((distance - 37.84).abs() < 1e-9);

    let current = node.publisher(0).unwrap().current();
    assert!(current.valid);
    assert_eq!(current.center_x, 160);

    node.shutdown().await;
}

#[tokio::test]
async fn test_second_camera_uses_own_table() {
    let bus = Arc::new(MemoryBus::new());
    let node = VisionNode::new(node_config(&["front", "rear"]), vision_config(), bus.clone()).unwrap();
    node.start_cameras().unwrap();

    let (tx, pipeline) = node.channel_pipeline();
    node.attach_pipeline(1, Box::new(pipeline)).unwrap();
    let mut updates = bus.subscribe();

    tx.send_frame(vec![
        Contour::from_rect(200, 40, 20, 60),
        Contour::from_rect(100, 40, 20, 60),
    ])
    .await
    .unwrap();

    let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("no bus update")
        .unwrap();
    assert_eq!(update.table, "TestTable/rear");
    assert_eq!(update.get(CENTER_X), Some(160.0));
    assert!(bus.table_snapshot("TestTable").is_empty());

    node.shutdown().await;
    assert_eq!(node.state(), WorkerState::Stopped);
}

#[tokio::test]
async fn test_shutdown_publishes_nothing_further() {
    let bus = Arc::new(MemoryBus::new());
    let node = VisionNode::new(node_config(&["front"]), vision_config(), bus.clone()).unwrap();
    node.start_cameras().unwrap();

    let (tx, pipeline) = node.channel_pipeline();
    let worker = node.attach_pipeline(0, Box::new(pipeline)).unwrap();
    node.shutdown().await;

    // Frames sent after shutdown are never consumed.
    let _ = tx
        .send_frame(vec![
            Contour::from_rect(200, 40, 20, 60),
            Contour::from_rect(100, 40, 20, 60),
        ])
        .await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(worker.stats().frames_processed, 0);
    assert!(!worker.publisher().current().valid);
    assert!(bus.get_number("TestTable", CENTER_X).is_none());
}

#[tokio::test]
async fn test_attach_to_missing_camera() {
    let node = VisionNode::new(node_config(&["front"]), vision_config(), Arc::new(MemoryBus::new())).unwrap();
    node.start_cameras().unwrap();

    let (_tx, pipeline) = node.channel_pipeline();
    let result = node.attach_pipeline(3, Box::new(pipeline));
    assert!(matches!(result, Err(VisionError::Camera(_))));
    assert_eq!(node.state(), WorkerState::Idle);
}
