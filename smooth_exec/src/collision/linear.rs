//! Linear (straight line) margin calculation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Point2;

// Internal
use super::*;
use crate::obstacles::{ObstacleSnapshot, Segment};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Running minima of a linear margin query, measured from the origin.
struct LinearAccumulator<'a> {
    footprint: &'a Footprint,
    direction: LinearDirection,
    dist: f64,
    left: f64,
    right: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CollisionChecker {
    /// Find the free distance in the given direction of travel, and the
    /// clearance either side of the footprint.
    ///
    /// Segments are clipped to the band swept by the footprint before being
    /// checked, points are checked directly. An empty obstacle set gives the
    /// no-obstacle distance minus the footprint offsets.
    pub fn obstacle_linear_margin(
        &self,
        direction: LinearDirection,
        obstacles: &ObstacleSnapshot,
    ) -> CollisionResult {
        let fp = &self.footprint;
        let mut acc = LinearAccumulator {
            footprint: fp,
            direction,
            dist: self.no_obstacle_dist,
            left: self.no_obstacle_dist,
            right: self.no_obstacle_dist,
        };

        for seg in &obstacles.segments {
            // Front and rear limits: x of the part of the segment lying in
            // -width <= y <= width
            if let Some((xa, xb)) = clip_segment(seg, Axis::Y, -fp.width, fp.width) {
                acc.check_dist(xa);
                acc.check_dist(xb);
            }

            // Sides: y of the part of the segment lying in
            // -back_length <= x <= front_length
            if let Some((ya, yb)) =
                clip_segment(seg, Axis::X, -fp.back_length, fp.front_length)
            {
                acc.check_side(ya);
                acc.check_side(yb);
            }
        }

        for p in &obstacles.points {
            if fp.in_longitudinal_band(p) {
                acc.check_dist(p.x);
            }
            if fp.in_lateral_band(p) {
                acc.check_side(p.y);
            }
        }

        let offset = match direction {
            LinearDirection::Forward => fp.front_length,
            LinearDirection::Backward => fp.back_length,
        };

        trace!(
            "Linear margin {:?}: boundary at {:.3} m, left side at {:.3} m, right side at {:.3} m",
            direction,
            acc.dist,
            acc.left,
            acc.right
        );

        CollisionResult {
            distance: acc.dist - offset,
            left_clearance: acc.left - fp.width,
            right_clearance: acc.right - fp.width,
            forward_corner_left: Point2::new(fp.front_length, acc.left),
            forward_corner_right: Point2::new(fp.front_length, -acc.right),
        }
    }
}

impl<'a> LinearAccumulator<'a> {
    /// Keep `x` if it lies beyond the footprint in the direction of travel
    /// and is closer than anything seen so far.
    fn check_dist(&mut self, x: f64) {
        match self.direction {
            LinearDirection::Forward => {
                if x > self.footprint.front_length && x < self.dist {
                    self.dist = x;
                }
            }
            LinearDirection::Backward => {
                if -x > self.footprint.back_length && -x < self.dist {
                    self.dist = -x;
                }
            }
        }
    }

    /// Keep `y` as a left (positive) or right (negative) side candidate.
    fn check_side(&mut self, y: f64) {
        if y > 0.0 && y < self.left {
            self.left = y;
        } else if y < 0.0 && -y < self.right {
            self.right = -y;
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// Clip a segment to the band `lo <= axis <= hi`, returning the other
/// coordinate at both ends of the clipped part, or `None` if the segment never
/// enters the band.
fn clip_segment(seg: &Segment, axis: Axis, lo: f64, hi: f64) -> Option<(f64, f64)> {
    let (a0, b0, a1, b1) = match axis {
        Axis::X => (seg.p0.x, seg.p0.y, seg.p1.x, seg.p1.y),
        Axis::Y => (seg.p0.y, seg.p0.x, seg.p1.y, seg.p1.x),
    };

    let da = a1 - a0;
    let db = b1 - b0;

    // Parallel to the band, either fully inside or fully outside
    if da == 0.0 {
        return if lo <= a0 && a0 <= hi {
            Some((b0, b1))
        } else {
            None
        };
    }

    let t_lo = (lo - a0) / da;
    let t_hi = (hi - a0) / da;
    let t_enter = t_lo.min(t_hi).max(0.0);
    let t_exit = t_lo.max(t_hi).min(1.0);

    if t_enter > t_exit {
        return None;
    }

    Some((b0 + t_enter * db, b0 + t_exit * db))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
