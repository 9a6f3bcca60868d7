//! Latest-result slot shared between the frame worker and its readers

use crate::tracker::TargetResult;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;
use vantage_bus::{ControlBus, CENTER_X, DISTANCE_TARGET, LEFT_TARGET, RIGHT_TARGET};

/// Holds the current [`TargetResult`] and mirrors valid results onto a bus
/// table.
///
/// The slot and the bus mirror are updated under one lock, so a reader of
/// either never sees fields from two different frames.
pub struct ResultPublisher {
    slot: Mutex<TargetResult>,
    sink: Option<BusSink>,
}

struct BusSink {
    bus: Arc<dyn ControlBus>,
    table: String,
}

impl ResultPublisher {
    /// Publisher with no bus mirror, for local consumers only
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(TargetResult::invalid()),
            sink: None,
        }
    }

    /// Publisher that also writes valid results to `table` on `bus`
    pub fn with_bus(bus: Arc<dyn ControlBus>, table: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(TargetResult::invalid()),
            sink: Some(BusSink {
                bus,
                table: table.into(),
            }),
        }
    }

    /// Replace the current result
    pub fn publish(&self, result: TargetResult) {
        let mut slot = self.slot.lock();
        *slot = result;

        if !result.valid {
            return;
        }
        if let Some(sink) = &self.sink {
            let entries = [
                (CENTER_X, result.center_x as f64),
                (LEFT_TARGET, result.left_x as f64),
                (RIGHT_TARGET, result.right_x as f64),
                (DISTANCE_TARGET, result.distance),
            ];
            if let Err(e) = sink.bus.set_numbers(&sink.table, &entries) {
                warn!("Failed to write target to bus table '{}': {}", sink.table, e);
            }
        }
    }

    /// The last published result, or the invalid sentinel before the first
    pub fn current(&self) -> TargetResult {
        *self.slot.lock()
    }

    /// Bus table mirrored to, if any
    pub fn table(&self) -> Option<&str> {
        self.sink.as_ref().map(|sink| sink.table.as_str())
    }
}

impl Default for ResultPublisher {
    fn default() -> Self {
        Self::new()
    }
}
