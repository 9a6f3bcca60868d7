//! Vision node: cameras, one frame worker per tracked camera, bus output

use crate::camera::CameraSource;
use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::pipeline::{ChannelPipeline, FramePipeline, FrameSender};
use crate::publisher::ResultPublisher;
use crate::worker::{FrameWorker, WorkerState};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use vantage_bus::ControlBus;
use vantage_core::NodeConfig;

/// Owns the node's camera sources and frame workers
pub struct VisionNode {
    node_config: NodeConfig,
    vision_config: VisionConfig,
    bus: Arc<dyn ControlBus>,
    cameras: RwLock<Vec<Arc<CameraSource>>>,
    workers: RwLock<BTreeMap<usize, Arc<FrameWorker>>>,
}

impl VisionNode {
    pub fn new(
        node_config: NodeConfig,
        vision_config: VisionConfig,
        bus: Arc<dyn ControlBus>,
    ) -> Result<Self, VisionError> {
        vision_config
            .validate()
            .map_err(|e| VisionError::Config(format!("Invalid vision config: {}", e)))?;

        Ok(Self {
            node_config,
            vision_config,
            bus,
            cameras: RwLock::new(Vec::new()),
            workers: RwLock::new(BTreeMap::new()),
        })
    }

    /// Start a source for every configured camera. The first camera is set
    /// to the processing resolution. Returns the number of cameras started.
    pub fn start_cameras(&self) -> Result<usize, VisionError> {
        let mut cameras = self.cameras.write();
        if !cameras.is_empty() {
            return Err(VisionError::Camera("Cameras already started".to_string()));
        }

        let mut started: Vec<Arc<CameraSource>> =
            Vec::with_capacity(self.node_config.cameras.len());
        for camera_config in &self.node_config.cameras {
            let camera = Arc::new(CameraSource::new(camera_config.clone()));
            if let Err(e) = camera.start() {
                for camera in &started {
                    camera.stop();
                }
                return Err(e);
            }
            started.push(camera);
        }

        if let Some(primary) = started.first() {
            let (width, height) = self.vision_config.resolution;
            primary.set_resolution(width, height)?;
        }

        info!("Number of cameras: {}", started.len());
        *cameras = started;
        Ok(cameras.len())
    }

    /// Track targets on `camera_index` using frames from `pipeline`
    pub fn attach_pipeline(
        &self,
        camera_index: usize,
        pipeline: Box<dyn FramePipeline>,
    ) -> Result<Arc<FrameWorker>, VisionError> {
        let camera = self.camera(camera_index).ok_or_else(|| {
            VisionError::Camera(format!(
                "No camera at index {} ({} started)",
                camera_index,
                self.camera_count()
            ))
        })?;

        let mut workers = self.workers.write();
        if workers.contains_key(&camera_index) {
            return Err(VisionError::Pipeline(format!(
                "Camera '{}' already has a frame worker",
                camera.name()
            )));
        }

        let table = self.table_for(camera_index, camera.name());
        let publisher = Arc::new(ResultPublisher::with_bus(self.bus.clone(), table.clone()));
        let worker = Arc::new(FrameWorker::new(
            camera.name(),
            publisher,
            self.vision_config.error_backoff(),
        ));
        worker.start(pipeline)?;

        info!(
            "Tracking targets on camera '{}', publishing to table '{}'",
            camera.name(),
            table
        );
        workers.insert(camera_index, worker.clone());
        Ok(worker)
    }

    /// Channel-fed pipeline sized by the configured frame buffer, for
    /// producers that push contours into the node
    pub fn channel_pipeline(&self) -> (FrameSender, ChannelPipeline) {
        ChannelPipeline::new(self.vision_config.frame_buffer)
    }

    /// Bus table for a camera: the configured table for the first camera,
    /// a per-camera sub-table for the rest
    fn table_for(&self, camera_index: usize, camera_name: &str) -> String {
        if camera_index == 0 {
            self.vision_config.table_name.clone()
        } else {
            format!("{}/{}", self.vision_config.table_name, camera_name)
        }
    }

    pub fn camera(&self, camera_index: usize) -> Option<Arc<CameraSource>> {
        self.cameras.read().get(camera_index).cloned()
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.read().len()
    }

    pub fn worker(&self, camera_index: usize) -> Option<Arc<FrameWorker>> {
        self.workers.read().get(&camera_index).cloned()
    }

    /// Local view of a camera's latest target
    pub fn publisher(&self, camera_index: usize) -> Option<Arc<ResultPublisher>> {
        self.worker(camera_index).map(|worker| worker.publisher())
    }

    /// `Idle` until a worker runs, `Running` while any does, `Stopped` once
    /// every worker has stopped
    pub fn state(&self) -> WorkerState {
        let workers = self.workers.read();
        if workers.is_empty() {
            return WorkerState::Idle;
        }
        let states: Vec<WorkerState> = workers.values().map(|w| w.state()).collect();
        if states.contains(&WorkerState::Running) {
            WorkerState::Running
        } else if states.contains(&WorkerState::Stopping) {
            WorkerState::Stopping
        } else {
            WorkerState::Stopped
        }
    }

    pub fn node_config(&self) -> &NodeConfig {
        &self.node_config
    }

    pub fn vision_config(&self) -> &VisionConfig {
        &self.vision_config
    }

    /// Stop every worker, wait for them, then stop the cameras
    pub async fn shutdown(&self) {
        let workers: Vec<Arc<FrameWorker>> = self.workers.read().values().cloned().collect();
        for worker in &workers {
            worker.stop();
        }
        for worker in &workers {
            worker.join().await;
            let stats = worker.stats();
            info!(
                "Worker '{}': {} frames processed, {} without target, {} failed",
                worker.name(),
                stats.frames_processed,
                stats.frames_without_target,
                stats.frames_failed
            );
        }

        for camera in self.cameras.read().iter() {
            camera.stop();
        }
        if workers.iter().any(|w| w.state() != WorkerState::Stopped) {
            warn!("Some frame workers did not reach the stopped state");
        }
    }
}
