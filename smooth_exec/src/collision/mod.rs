//! # Footprint collision module
//!
//! Converts the obstacle points and segments observed around the robot into
//! the free space left for a given motion of the rectangular footprint:
//!
//! - `obstacle_linear_margin` - distance the robot can still drive forwards or
//!   backwards, plus the clearance either side of it.
//! - `obstacle_rotation_margin` - angle the robot can still turn on the spot.
//! - `obstacle_arc_margin` - angle the robot can still travel along an arc.
//!
//! All obstacles are expressed in the base frame, x forward and y left. The
//! checker is a pure function of its footprint and the obstacles passed in, it
//! holds no state between calls.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod arc;
mod linear;
mod params;
mod rotation;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::Serialize;
use thiserror::Error;

// Internal
pub use params::CollisionParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rectangular robot footprint with precomputed squares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Footprint {
    width: f64,
    front_length: f64,
    back_length: f64,

    width_sq: f64,
    front_length_sq: f64,
    back_length_sq: f64,

    /// Squared distance from the origin to the front corners
    front_diag: f64,

    /// Squared distance from the origin to the back corners
    back_diag: f64,
}

/// Collision checker for a single footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CollisionChecker {
    footprint: Footprint,
    no_obstacle_dist: f64,
}

/// Result of a linear margin query.
///
/// All distances are measured beyond the footprint edge, not from the base
/// frame origin. A distance equal to the no-obstacle distance minus the
/// relevant offset means nothing was detected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CollisionResult {
    /// Free distance in the direction of travel
    pub distance: f64,

    /// Clearance beyond the left side
    pub left_clearance: f64,

    /// Clearance beyond the right side
    pub right_clearance: f64,

    /// Point at the front edge level with the nearest left obstacle
    pub forward_corner_left: Point2<f64>,

    /// Point at the front edge level with the nearest right obstacle
    pub forward_corner_right: Point2<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Direction of straight line travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinearDirection {
    Forward,
    Backward,
}

/// Direction of an on the spot turn. `Left` is anticlockwise seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RotationDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CollisionError {
    #[error("Footprint dimension {0} must be finite and greater than zero, found {1}")]
    InvalidFootprint(&'static str, f64),

    #[error("No-obstacle distance must be finite and greater than zero, found {0}")]
    InvalidNoObstacleDist(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Footprint {
    /// Create a new footprint, checking all dimensions are strictly positive.
    pub fn new(width: f64, front_length: f64, back_length: f64) -> Result<Self, CollisionError> {
        for (name, val) in [
            ("width", width),
            ("front_length", front_length),
            ("back_length", back_length),
        ]
        .iter()
        {
            if !val.is_finite() || *val <= 0.0 {
                return Err(CollisionError::InvalidFootprint(*name, *val));
            }
        }

        let width_sq = width * width;
        let front_length_sq = front_length * front_length;
        let back_length_sq = back_length * back_length;

        Ok(Self {
            width,
            front_length,
            back_length,
            width_sq,
            front_length_sq,
            back_length_sq,
            front_diag: width_sq + front_length_sq,
            back_diag: width_sq + back_length_sq,
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn front_length(&self) -> f64 {
        self.front_length
    }

    pub fn back_length(&self) -> f64 {
        self.back_length
    }

    /// Squared radius of the circle enclosing the whole footprint.
    fn max_diag(&self) -> f64 {
        self.front_diag.max(self.back_diag)
    }

    /// Whether a point lies strictly inside the band swept by the front or
    /// back edge, i.e. `-width < y < width`.
    fn in_longitudinal_band(&self, p: &Point2<f64>) -> bool {
        -self.width < p.y && p.y < self.width
    }

    /// Whether a point lies strictly inside the band swept by the sides, i.e.
    /// `-back_length < x < front_length`.
    fn in_lateral_band(&self, p: &Point2<f64>) -> bool {
        -self.back_length < p.x && p.x < self.front_length
    }
}

impl CollisionChecker {
    /// Create a new checker from the footprint dimensions.
    pub fn new(params: &CollisionParams) -> Result<Self, CollisionError> {
        if !params.no_obstacle_dist.is_finite() || params.no_obstacle_dist <= 0.0 {
            return Err(CollisionError::InvalidNoObstacleDist(
                params.no_obstacle_dist,
            ));
        }

        Ok(Self {
            footprint: Footprint::new(
                params.robot_width,
                params.robot_front_length,
                params.robot_back_length,
            )?,
            no_obstacle_dist: params.no_obstacle_dist,
        })
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn no_obstacle_dist(&self) -> f64 {
        self.no_obstacle_dist
    }
}

impl RotationDirection {
    /// Direction that reduces a signed angle error, positive errors turning
    /// left.
    pub fn towards(angle_rad: f64) -> Self {
        if angle_rad > 0.0 {
            RotationDirection::Left
        } else {
            RotationDirection::Right
        }
    }
}

impl LinearDirection {
    /// Direction of travel implied by a signed linear speed, zero counting as
    /// forwards.
    pub fn from_speed(speed_ms: f64) -> Self {
        if speed_ms < 0.0 {
            LinearDirection::Backward
        } else {
            LinearDirection::Forward
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Checker using the default footprint (w 0.08, front 0.09, back 0.19).
    pub(crate) fn default_checker() -> CollisionChecker {
        CollisionChecker::new(&CollisionParams::default()).unwrap()
    }

    #[test]
    fn test_footprint_validation() {
        assert!(Footprint::new(0.08, 0.09, 0.19).is_ok());
        assert_eq!(
            Footprint::new(0.0, 0.09, 0.19),
            Err(CollisionError::InvalidFootprint("width", 0.0))
        );
        assert!(Footprint::new(0.08, -1.0, 0.19).is_err());
        assert!(Footprint::new(0.08, 0.09, f64::NAN).is_err());

        let mut params = CollisionParams::default();
        params.no_obstacle_dist = 0.0;
        assert!(CollisionChecker::new(&params).is_err());
    }

    #[test]
    fn test_footprint_derived() {
        let fp = Footprint::new(0.1, 0.2, 0.3).unwrap();
        assert!((fp.front_diag - 0.05).abs() < 1e-12);
        assert!((fp.back_diag - 0.10).abs() < 1e-12);
        assert!((fp.max_diag() - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_directions() {
        assert_eq!(RotationDirection::towards(0.3), RotationDirection::Left);
        assert_eq!(RotationDirection::towards(-0.3), RotationDirection::Right);
        assert_eq!(LinearDirection::from_speed(0.0), LinearDirection::Forward);
        assert_eq!(LinearDirection::from_speed(-0.1), LinearDirection::Backward);
    }
}
