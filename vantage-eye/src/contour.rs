//! Contours produced by the threshold pipeline and their bounding rectangles

use serde::{Deserialize, Serialize};

/// Pixel coordinate, x increasing rightward and y downward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Boundary of one connected blob, serialized as `[[x, y], ...]`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Closed outline of an axis-aligned rectangle whose bounding
    /// rectangle is exactly `(x, y, width, height)`
    pub fn from_rect(x: i32, y: i32, width: i32, height: i32) -> Self {
        let right = x.saturating_add(width.saturating_sub(1).max(0));
        let bottom = y.saturating_add(height.saturating_sub(1).max(0));
        Self::new(vec![
            Point::new(x, y),
            Point::new(right, y),
            Point::new(right, bottom),
            Point::new(x, bottom),
        ])
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Smallest upright rectangle containing every point. Both edges are
    /// inclusive, so a single point has width and height 1. An empty contour
    /// yields the zero rectangle. Extents are 64-bit so contours spanning the
    /// whole `i32` range still measure correctly.
    pub fn bounding_rect(&self) -> BoundingRect {
        let mut iter = self.points.iter();
        let first = match iter.next() {
            Some(p) => *p,
            None => return BoundingRect::default(),
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        BoundingRect {
            x: min_x,
            y: min_y,
            width: i64::from(max_x) - i64::from(min_x) + 1,
            height: i64::from(max_y) - i64::from(min_y) + 1,
        }
    }
}

impl From<Vec<Point>> for Contour {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point> for Contour {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Axis-aligned rectangle in pixel units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: i32,
    pub y: i32,
    pub width: i64,
    pub height: i64,
}

impl BoundingRect {
    pub const fn new(x: i32, y: i32, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Horizontal center, truncating toward zero
    pub fn center_x(&self) -> i64 {
        i64::from(self.x) + self.width / 2
    }

    /// Saturates for rectangles spanning the full coordinate range
    pub fn area(&self) -> i64 {
        self.width.saturating_mul(self.height)
    }
}
