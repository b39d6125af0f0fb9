//! Point sets produced by `draw` and `multipledraw`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An integer point on the drawing plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// An append-only record of draw calls.
///
/// Each draw call is the list of points handed to one `draw`. The layer map
/// remembers, for every distinct point, the index of the first draw call
/// that produced it; renderers use it to pick a colour per layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Picture {
    draws: Vec<Vec<Point>>,
    #[serde(skip)]
    layers: BTreeMap<Point, usize>,
}

impl Picture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A picture holding a single draw call.
    pub fn from_points(points: Vec<Point>) -> Self {
        let mut picture = Self::new();
        picture.draw_points(points);
        picture
    }

    /// Record one draw call and return its index.
    pub fn draw_points(&mut self, points: Vec<Point>) -> usize {
        let layer = self.draws.len();
        for point in &points {
            self.layers.entry(*point).or_insert(layer);
        }
        self.draws.push(points);
        layer
    }

    /// Append every draw call of `other`, preserving their order.
    pub fn draw_picture(&mut self, other: &Picture) {
        for points in &other.draws {
            self.draw_points(points.clone());
        }
    }

    pub fn draws(&self) -> &[Vec<Point>] {
        &self.draws
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    /// Index of the first draw call that contains `point`.
    pub fn layer_of(&self, point: Point) -> Option<usize> {
        self.layers.get(&point).copied()
    }

    /// Distinct points in `(x, y)` order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.layers.keys().copied()
    }

    pub fn contains(&self, point: Point) -> bool {
        self.layers.contains_key(&point)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Inclusive bounding box `(min, max)` of all points.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let mut points = self.points();
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }

    /// Move every draw call out, leaving an empty picture.
    pub fn take(&mut self) -> Picture {
        std::mem::take(self)
    }
}

impl fmt::Display for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, point) in self.points().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{point}")?;
        }
        write!(f, "}}")
    }
}
