//! Stroke matching: compare a drawn pointer path against template paths.
//!
//! Strokes are resampled to a fixed number of points spaced evenly by arc
//! length, centred on their centroid and scaled so the larger side of the
//! bounding box is 1.  Two normalized strokes are scored by the mean distance
//! between corresponding points.

use std::ops::{Add, AddAssign, Mul, Sub};

/// Number of points every normalized stroke is resampled to.
pub const RESAMPLE_POINTS: usize = 32;

/// Scores at or below this are never accepted as a match.
pub const MIN_MATCHING_SCORE: f64 = 0.7;

/// Mean point deviation that maps to a score of 0.
const MAX_DEVIATION: f64 = 0.5;

// ── Points ─────────────────────────────────────────────────

/// A 2-D point or motion delta in device units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn hypot(&self) -> f64 {
        self.x.hypot(self.y)
    }

    fn distance(&self, other: &Point) -> f64 {
        (*other - *self).hypot()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

// ── Strokes ────────────────────────────────────────────────

/// A drawn path.  Keeps the points it was built from, so printing and
/// re-reading a stroke is lossless; matching uses the normalized copy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stroke {
    points: Vec<Point>,
    normalized: Vec<Point>,
}

impl Stroke {
    /// Build a stroke from relative motion deltas, starting at the origin.
    pub fn from_deltas(deltas: &[Point]) -> Self {
        if deltas.is_empty() {
            return Self::default();
        }
        let mut position = Point::default();
        let mut points = Vec::with_capacity(deltas.len() + 1);
        points.push(position);
        for delta in deltas {
            position += *delta;
            points.push(position);
        }
        Self::from_points(&points)
    }

    /// Build a stroke from absolute points.
    pub fn from_points(points: &[Point]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        Self {
            points: points.to_vec(),
            normalized: normalize(resample(points, RESAMPLE_POINTS)),
        }
    }

    /// Points as drawn or configured.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Resampled, centred and scaled points used for matching.
    pub fn normalized(&self) -> &[Point] {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Similarity to `template` in `0.0..=1.0`, higher is more similar.
    pub fn compare(&self, template: &Stroke) -> f64 {
        if self.normalized.is_empty() || self.normalized.len() != template.normalized.len() {
            return 0.0;
        }
        let total: f64 = self
            .normalized
            .iter()
            .zip(&template.normalized)
            .map(|(a, b)| a.distance(b))
            .sum();
        let mean = total / self.normalized.len() as f64;
        (1.0 - mean / MAX_DEVIATION).clamp(0.0, 1.0)
    }

    /// Flat `(x y x y ...)` list, the same shape the config loader reads.
    pub fn to_sexp(&self) -> String {
        let coords: Vec<String> = self
            .points
            .iter()
            .map(|p| format!("{} {}", p.x, p.y))
            .collect();
        format!("({})", coords.join(" "))
    }
}

fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Resample `points` to `n` points evenly spaced along the path.
fn resample(points: &[Point], n: usize) -> Vec<Point> {
    let first = points[0];
    let last = points[points.len() - 1];
    let length = path_length(points);
    if n < 2 || length <= f64::EPSILON {
        return vec![first; n];
    }

    let interval = length / (n - 1) as f64;
    let mut out = Vec::with_capacity(n);
    out.push(first);

    let mut accumulated = 0.0;
    let mut prev = first;
    let mut i = 1;
    while i < points.len() && out.len() < n {
        let current = points[i];
        let d = prev.distance(&current);
        if d > 0.0 && accumulated + d >= interval {
            let t = (interval - accumulated) / d;
            let q = prev + (current - prev) * t;
            out.push(q);
            prev = q;
            accumulated = 0.0;
        } else {
            accumulated += d;
            prev = current;
            i += 1;
        }
    }

    // Rounding can leave the final sample short of the end.
    while out.len() < n {
        out.push(last);
    }
    out
}

/// Translate the centroid to the origin and scale the larger bbox side to 1.
fn normalize(mut points: Vec<Point>) -> Vec<Point> {
    let count = points.len() as f64;
    let centroid = points
        .iter()
        .fold(Point::default(), |acc, p| acc + *p)
        * (1.0 / count);

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in &points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let side = (max_x - min_x).max(max_y - min_y);
    let scale = if side > f64::EPSILON { 1.0 / side } else { 1.0 };

    for p in points.iter_mut() {
        *p = (*p - centroid) * scale;
    }
    points
}
