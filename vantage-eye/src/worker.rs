//! Frame worker: pipeline → tracker → publisher loop on its own task

use crate::error::VisionError;
use crate::pipeline::FramePipeline;
use crate::publisher::ResultPublisher;
use crate::tracker::TargetTracker;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Frames without a target between informational reminders while no
/// target is in view
const NO_TARGET_REPORT_INTERVAL: u64 = 300;

/// Lifecycle of a frame worker. There is no way back from `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Per-worker counters
#[derive(Debug, Default)]
pub struct WorkerStats {
    frames_processed: AtomicU64,
    frames_without_target: AtomicU64,
    frames_failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerStatsSnapshot {
    /// Frames that reached the tracker, each one published
    pub frames_processed: u64,
    pub frames_without_target: u64,
    pub frames_failed: u64,
}

impl WorkerStats {
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_without_target: self.frames_without_target.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
        }
    }
}

/// Drives one pipeline on a dedicated task
pub struct FrameWorker {
    name: String,
    tracker: TargetTracker,
    publisher: Arc<ResultPublisher>,
    error_backoff: Duration,
    state: Arc<watch::Sender<WorkerState>>,
    stats: Arc<WorkerStats>,
    shutdown_tx: watch::Sender<bool>,
}

impl FrameWorker {
    pub fn new(
        name: impl Into<String>,
        publisher: Arc<ResultPublisher>,
        error_backoff: Duration,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            name: name.into(),
            tracker: TargetTracker::new(),
            publisher,
            error_backoff,
            state: Arc::new(state),
            stats: Arc::new(WorkerStats::default()),
            shutdown_tx,
        }
    }

    /// Start consuming `pipeline`. Must be called from within a Tokio
    /// runtime, and only once.
    pub fn start(&self, pipeline: Box<dyn FramePipeline>) -> Result<(), VisionError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            VisionError::Pipeline(format!("Worker '{}' started outside a runtime", self.name))
        })?;

        let mut refused = None;
        self.state.send_if_modified(|state| {
            if *state == WorkerState::Idle {
                *state = WorkerState::Running;
                true
            } else {
                refused = Some(*state);
                false
            }
        });
        if let Some(state) = refused {
            return Err(VisionError::Pipeline(format!(
                "Worker '{}' cannot start from {:?}",
                self.name, state
            )));
        }

        let context = LoopContext {
            name: self.name.clone(),
            tracker: self.tracker,
            publisher: self.publisher.clone(),
            error_backoff: self.error_backoff,
            stats: self.stats.clone(),
            shutdown_rx: self.shutdown_tx.subscribe(),
        };

        let stop_on_exit = StopOnExit {
            name: self.name.clone(),
            state: self.state.clone(),
        };
        runtime.spawn(run_loop(context, pipeline, stop_on_exit));

        info!("Frame worker '{}' started", self.name);
        Ok(())
    }

    /// Ask the loop to exit. It will not publish again once it notices.
    pub fn stop(&self) {
        self.state.send_if_modified(|state| match *state {
            WorkerState::Idle => {
                *state = WorkerState::Stopped;
                true
            }
            WorkerState::Running => {
                *state = WorkerState::Stopping;
                true
            }
            WorkerState::Stopping | WorkerState::Stopped => false,
        });
        self.shutdown_tx.send_replace(true);
    }

    /// Wait for the loop task to finish. Returns at once for a worker that
    /// was never started. Cancel safe, and any number of callers may wait.
    pub async fn join(&self) {
        let mut state_rx = self.state.subscribe();
        if *state_rx.borrow() == WorkerState::Idle {
            return;
        }
        if state_rx
            .wait_for(|state| *state == WorkerState::Stopped)
            .await
            .is_err()
        {
            warn!("Frame worker '{}' state channel closed", self.name);
        }
    }

    /// Stop and wait
    pub async fn shutdown(&self) {
        self.stop();
        self.join().await;
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn publisher(&self) -> Arc<ResultPublisher> {
        self.publisher.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

struct LoopContext {
    name: String,
    tracker: TargetTracker,
    publisher: Arc<ResultPublisher>,
    error_backoff: Duration,
    stats: Arc<WorkerStats>,
    shutdown_rx: watch::Receiver<bool>,
}

#[derive(Debug, PartialEq, Eq)]
enum NoTargetNotice {
    Lost,
    NotYet,
    StillMissing,
    Quiet,
}

/// How loudly to report a frame without a target. `had_target` is the
/// previous frame's outcome and `without` counts no-target frames so far,
/// this one included.
fn no_target_notice(had_target: Option<bool>, without: u64) -> NoTargetNotice {
    match had_target {
        Some(true) => NoTargetNotice::Lost,
        None => NoTargetNotice::NotYet,
        Some(false) if without % NO_TARGET_REPORT_INTERVAL == 0 => NoTargetNotice::StillMissing,
        Some(false) => NoTargetNotice::Quiet,
    }
}

/// Marks the worker stopped when the loop future is dropped: on return, on
/// panic, or when the runtime drops the task, even before its first poll
struct StopOnExit {
    name: String,
    state: Arc<watch::Sender<WorkerState>>,
}

impl Drop for StopOnExit {
    fn drop(&mut self) {
        if std::thread::panicking() {
            warn!("Frame worker '{}' task ended abnormally", self.name);
        }
        self.state.send_replace(WorkerState::Stopped);
        info!("Frame worker '{}' stopped", self.name);
    }
}

async fn run_loop(
    mut ctx: LoopContext,
    mut pipeline: Box<dyn FramePipeline>,
    _stop_on_exit: StopOnExit,
) {
    // None until the first frame is tracked
    let mut had_target: Option<bool> = None;

    loop {
        if *ctx.shutdown_rx.borrow() {
            break;
        }

        let frame = tokio::select! {
            biased;
            _ = ctx.shutdown_rx.changed() => break,
            frame = pipeline.next_frame() => frame,
        };

        match frame {
            Ok(Some(contours)) => {
                let result = ctx.tracker.compute(&contours);
                ctx.stats.frames_processed.fetch_add(1, Ordering::Relaxed);

                if result.valid {
                    if had_target != Some(true) {
                        info!(
                            "Worker '{}': target acquired at x={} ({:.2} away)",
                            ctx.name, result.center_x, result.distance
                        );
                    }
                } else {
                    let without = ctx.stats.frames_without_target.fetch_add(1, Ordering::Relaxed) + 1;
                    match no_target_notice(had_target, without) {
                        NoTargetNotice::Lost => {
                            info!("Worker '{}': target lost ({} contours)", ctx.name, contours.len())
                        }
                        NoTargetNotice::NotYet => {
                            info!("Worker '{}': no target yet ({} contours)", ctx.name, contours.len())
                        }
                        NoTargetNotice::StillMissing => info!(
                            "Worker '{}': still no target, {} frames without one so far",
                            ctx.name, without
                        ),
                        NoTargetNotice::Quiet => {
                            debug!("Worker '{}': no target in {} contours", ctx.name, contours.len())
                        }
                    }
                }
                had_target = Some(result.valid);

                ctx.publisher.publish(result);
            }
            Ok(None) => {
                info!("Worker '{}': pipeline '{}' ended", ctx.name, pipeline.name());
                break;
            }
            Err(e) => {
                ctx.stats.frames_failed.fetch_add(1, Ordering::Relaxed);
                warn!("Worker '{}': frame skipped: {}", ctx.name, e);

                if !ctx.error_backoff.is_zero() {
                    tokio::select! {
                        biased;
                        _ = ctx.shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(ctx.error_backoff) => {}
                    }
                }
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::Contour;
    use crate::pipeline::ChannelPipeline;

    fn target_frame() -> Vec<Contour> {
        vec![Contour::from_rect(200, 40, 20, 60), Contour::from_rect(100, 40, 20, 60)]
    }

    async fn wait_for_processed(worker: &FrameWorker, count: u64) {
        for _ in 0..200 {
            if worker.stats().frames_processed + worker.stats().frames_failed >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("worker did not process {} frames", count);
    }

    #[test]
    fn test_new_worker_is_idle() {
        let worker = FrameWorker::new("cam0", Arc::new(ResultPublisher::new()), Duration::ZERO);
        assert_eq!(worker.state(), WorkerState::Idle);
        assert_eq!(worker.stats(), WorkerStatsSnapshot::default());
        assert_eq!(worker.name(), "cam0");
    }

    #[test]
    fn test_start_outside_runtime() {
        let worker = FrameWorker::new("cam0", Arc::new(ResultPublisher::new()), Duration::ZERO);
        let (_tx, pipeline) = ChannelPipeline::new(1);
        assert!(worker.start(Box::new(pipeline)).is_err());
        assert_eq!(worker.state(), WorkerState::Idle);
    }

    #[test]
    fn test_no_target_notice() {
        assert_eq!(no_target_notice(None, 1), NoTargetNotice::NotYet);
        assert_eq!(no_target_notice(Some(true), 7), NoTargetNotice::Lost);
        assert_eq!(no_target_notice(Some(false), 2), NoTargetNotice::Quiet);
        assert_eq!(
            no_target_notice(Some(false), NO_TARGET_REPORT_INTERVAL),
            NoTargetNotice::StillMissing
        );
        assert_eq!(
            no_target_notice(Some(false), NO_TARGET_REPORT_INTERVAL + 1),
            NoTargetNotice::Quiet
        );
    }

    #[test]
    fn test_stop_idle_worker() {
        let worker = FrameWorker::new("cam0", Arc::new(ResultPublisher::new()), Duration::ZERO);
        worker.stop();
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_processes_and_publishes() {
        let publisher = Arc::new(ResultPublisher::new());
        let worker = FrameWorker::new("cam0", publisher.clone(), Duration::ZERO);
        let (tx, pipeline) = ChannelPipeline::new(4);

        worker.start(Box::new(pipeline)).unwrap();
        assert_eq!(worker.state(), WorkerState::Running);

        tx.send_frame(target_frame()).await.unwrap();
        wait_for_processed(&worker, 1).await;

        let result = publisher.current();
        assert!(result.valid);
        assert_eq!(result.center_x, 160);

        worker.shutdown().await;
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_no_target_published() {
        let publisher = Arc::new(ResultPublisher::new());
        let worker = FrameWorker::new("cam0", publisher.clone(), Duration::ZERO);
        let (tx, pipeline) = ChannelPipeline::new(4);
        worker.start(Box::new(pipeline)).unwrap();

        tx.send_frame(target_frame()).await.unwrap();
        tx.send_frame(vec![Contour::from_rect(10, 10, 5, 5)]).await.unwrap();
        wait_for_processed(&worker, 2).await;

        assert!(!publisher.current().valid);
        assert_eq!(worker.stats().frames_without_target, 1);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_frame_is_not_fatal() {
        let publisher = Arc::new(ResultPublisher::new());
        let worker = FrameWorker::new("cam0", publisher.clone(), Duration::from_millis(1));
        let (tx, pipeline) = ChannelPipeline::new(4);
        worker.start(Box::new(pipeline)).unwrap();

        tx.send_error(VisionError::Camera("disconnected".to_string())).await.unwrap();
        tx.send_frame(target_frame()).await.unwrap();
        wait_for_processed(&worker, 2).await;

        let stats = worker.stats();
        assert_eq!(stats.frames_failed, 1);
        assert_eq!(stats.frames_processed, 1);
        assert!(publisher.current().valid);
        assert_eq!(worker.state(), WorkerState::Running);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_end_of_stream_stops() {
        let worker = FrameWorker::new("cam0", Arc::new(ResultPublisher::new()), Duration::ZERO);
        let (tx, pipeline) = ChannelPipeline::new(1);
        worker.start(Box::new(pipeline)).unwrap();

        drop(tx);
        worker.join().await;
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_while_waiting_for_frame() {
        let worker = FrameWorker::new("cam0", Arc::new(ResultPublisher::new()), Duration::ZERO);
        let (_tx, pipeline) = ChannelPipeline::new(1);
        worker.start(Box::new(pipeline)).unwrap();

        worker.stop();
        assert_eq!(worker.state(), WorkerState::Stopping);

        tokio::time::timeout(Duration::from_secs(1), worker.join())
            .await
            .expect("worker did not stop");
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_abandoned_join_then_shutdown() {
        let worker = FrameWorker::new("cam0", Arc::new(ResultPublisher::new()), Duration::ZERO);
        let (_tx, pipeline) = ChannelPipeline::new(1);
        worker.start(Box::new(pipeline)).unwrap();

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
            _ = worker.join() => panic!("join returned while the worker was running"),
        }
        assert_eq!(worker.state(), WorkerState::Running);

        tokio::time::timeout(Duration::from_secs(1), worker.shutdown())
            .await
            .expect("worker did not stop");
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_concurrent_joins() {
        let worker = FrameWorker::new("cam0", Arc::new(ResultPublisher::new()), Duration::ZERO);
        let (_tx, pipeline) = ChannelPipeline::new(1);
        worker.start(Box::new(pipeline)).unwrap();

        worker.stop();
        tokio::time::timeout(Duration::from_secs(1), async {
            tokio::join!(worker.join(), worker.join(), worker.join());
        })
        .await
        .expect("joins did not all return");
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_join_idle_worker_returns() {
        let worker = FrameWorker::new("cam0", Arc::new(ResultPublisher::new()), Duration::ZERO);
        tokio::time::timeout(Duration::from_millis(100), worker.join())
            .await
            .expect("join on an idle worker blocked");
        assert_eq!(worker.state(), WorkerState::Idle);
    }

    #[tokio::test]
    async fn test_no_restart_after_stop() {
        let worker = FrameWorker::new("cam0", Arc::new(ResultPublisher::new()), Duration::ZERO);
        let (_tx, pipeline) = ChannelPipeline::new(1);
        worker.start(Box::new(pipeline)).unwrap();
        worker.shutdown().await;

        let (_tx, pipeline) = ChannelPipeline::new(1);
        assert!(worker.start(Box::new(pipeline)).is_err());
        assert_eq!(worker.state(), WorkerState::Stopped);
    }
}
