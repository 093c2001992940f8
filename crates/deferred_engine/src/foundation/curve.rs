//! Catmull-Rom spline curves
//!
//! Used by camera view tracks. A curve with `n` knots has `n - 3` drawable
//! segments: the first and last knots only shape the tangents at the ends.

use super::math::{utils, Vec3};

/// Largest ratio accepted by [`Curve::evaluate_catmull`]
const MAX_RATIO: f32 = 0.9999;

/// Ordered list of control points
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    knots: Vec<Vec3>,
}

impl Curve {
    /// Create an empty curve
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a curve from its knots
    pub fn from_knots(knots: Vec<Vec3>) -> Self {
        Self { knots }
    }

    /// Remove every knot
    pub fn clear(&mut self) {
        self.knots.clear();
    }

    /// Append a knot
    pub fn add_knot(&mut self, point: Vec3) {
        self.knots.push(point);
    }

    /// Knots in insertion order
    pub fn knots(&self) -> &[Vec3] {
        &self.knots
    }

    /// Point on the curve at `ratio` in `[0, 1)`
    ///
    /// Curves with fewer than four knots have no segment; they evaluate to
    /// their first knot (or the origin when empty).
    pub fn evaluate_catmull(&self, ratio: f32) -> Vec3 {
        if self.knots.len() < 4 {
            return self.knots.first().copied().unwrap_or_else(Vec3::zeros);
        }

        let ratio = utils::clamp(ratio, 0.0, MAX_RATIO);
        let segments = self.knots.len() - 3;
        let per_segment = 1.0 / segments as f32;
        let segment = ((ratio / per_segment) as usize).min(segments - 1);
        let local = (ratio % per_segment) / per_segment;

        let idx = segment + 1;
        Self::catmull_rom(
            &self.knots[idx - 1],
            &self.knots[idx],
            &self.knots[idx + 1],
            &self.knots[idx + 2],
            local,
        )
    }

    /// Uniform Catmull-Rom interpolation between `p1` and `p2`
    pub fn catmull_rom(p0: &Vec3, p1: &Vec3, p2: &Vec3, p3: &Vec3, u: f32) -> Vec3 {
        let u2 = u * u;
        let u3 = u2 * u;
        let a = -p0 + p1 * 3.0 - p2 * 3.0 + p3;
        let b = p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3;
        let c = -p0 + p2;
        (a * u3 + b * u2 + c * u) * 0.5 + p1
    }
}
