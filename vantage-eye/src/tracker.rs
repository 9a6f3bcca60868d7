//! Target pair selection over one frame's contours
//!
//! The target is two retro-reflective strips seen side by side. Each frame,
//! the two rightmost bounding rectangles are taken as the right and left
//! strips; any further rectangles are ignored for that frame. This assumes a
//! frame holds at most one genuine target plus noise that is smaller or
//! further left.

use crate::contour::{BoundingRect, Contour};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Calibration constant for the distance estimate, in distance units times
/// pixels. Derived from the strip spacing and the camera's field of view.
pub const DISTANCE_CONSTANT: f64 = 11.0 * ((88.0 * 43.0) / 11.0);

/// Target geometry for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetResult {
    /// Midpoint between the two strip centers
    pub center_x: i32,
    /// Center x of the left strip
    pub left_x: i32,
    /// Center x of the right strip
    pub right_x: i32,
    /// Estimated distance, only meaningful when `valid`
    pub distance: f64,
    pub valid: bool,
}

impl TargetResult {
    /// The "no target" result
    pub const fn invalid() -> Self {
        Self {
            center_x: 0,
            left_x: 0,
            right_x: 0,
            distance: 0.0,
            valid: false,
        }
    }

    /// Pixel distance between the strip centers
    pub fn width(&self) -> i64 {
        i64::from(self.right_x) - i64::from(self.left_x)
    }
}

/// Computes a [`TargetResult`] from contours. Holds no per-frame state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetTracker;

impl TargetTracker {
    pub fn new() -> Self {
        Self
    }

    /// Compute the target for one frame
    pub fn compute(&self, contours: &[Contour]) -> TargetResult {
        if contours.len() < 2 {
            trace!("{} contour(s), no target pair", contours.len());
            return TargetResult::invalid();
        }

        let rects: Vec<BoundingRect> = contours.iter().map(Contour::bounding_rect).collect();
        let (right, left) = match select_pair(&rects) {
            Some(pair) => pair,
            None => return TargetResult::invalid(),
        };

        // Centers and width are taken in 64 bits; a strip center always lies
        // inside its rectangle, so it narrows back to i32.
        let (left_x, right_x) = match (
            i32::try_from(left.center_x()),
            i32::try_from(right.center_x()),
        ) {
            (Ok(left_x), Ok(right_x)) => (left_x, right_x),
            _ => {
                trace!("Strip centers outside the pixel range");
                return TargetResult::invalid();
            }
        };
        let width = i64::from(right_x) - i64::from(left_x);

        // Coincident or crossed strip centers give no usable width.
        if width <= 0 {
            trace!(
                "Degenerate target width {} (left {}, right {})",
                width,
                left_x,
                right_x
            );
            return TargetResult {
                center_x: left_x,
                left_x,
                right_x,
                distance: 0.0,
                valid: false,
            };
        }

        let center_x = match i32::try_from(i64::from(left_x) + width / 2) {
            Ok(center_x) => center_x,
            Err(_) => return TargetResult::invalid(),
        };

        TargetResult {
            center_x,
            left_x,
            right_x,
            distance: DISTANCE_CONSTANT / width as f64,
            valid: true,
        }
    }
}

/// Pick `(right, left)` from the rectangles: the two with the largest x.
/// Equal x keeps input order, so the earlier rectangle is taken as the
/// right strip.
pub fn select_pair(rects: &[BoundingRect]) -> Option<(BoundingRect, BoundingRect)> {
    if rects.len() < 2 {
        return None;
    }
    let mut sorted = rects.to_vec();
    // sort_by is stable
    sorted.sort_by(|a, b| b.x.cmp(&a.x));
    Some((sorted[0], sorted[1]))
}
