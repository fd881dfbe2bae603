//! # Localisation module
//!
//! Provides planar poses and the `PoseSource` interface used to resolve the
//! pose of one named frame in another, along with `FrameTree`, a concrete
//! source built from a graph of rigid transforms between frames.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod frame_tree;
pub use frame_tree::FrameTree;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry2, Point2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use util::maths::normalize_angle;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something able to tell where one frame is relative to another.
pub trait PoseSource: Send + Sync {
    /// Get the pose of `from_frame`'s origin expressed in `to_frame`.
    ///
    /// Equivalently, the transform which maps points in `from_frame` into
    /// `to_frame`. Unavailability is an ordinary outcome and must be returned
    /// promptly, never waited on.
    fn lookup(&self, from_frame: &str, to_frame: &str) -> Result<Pose, LocError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A planar pose, the position and heading of one frame in another.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Position of the frame origin
    pub position_m: Vector2<f64>,

    /// Angle of the frame's X axis to the parent X axis, anticlockwise
    /// positive, in (-pi, pi].
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocError {
    #[error("Cannot find a transform from \"{from}\" to \"{to}\"")]
    FrameUnavailable { from: String, to: String },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad: normalize_angle(heading_rad),
        }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_isometry(iso: &Isometry2<f64>) -> Self {
        Self {
            position_m: iso.translation.vector,
            heading_rad: normalize_angle(iso.rotation.angle()),
        }
    }

    pub fn to_isometry(&self) -> Isometry2<f64> {
        Isometry2::new(self.position_m, self.heading_rad)
    }

    /// Chain two poses: if `self` is B in A and `other` is C in B, the result
    /// is C in A.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose::from_isometry(&(self.to_isometry() * other.to_isometry()))
    }

    /// If `self` is B in A, return A in B.
    pub fn inverse(&self) -> Pose {
        Pose::from_isometry(&self.to_isometry().inverse())
    }

    /// Map a point expressed in this pose's frame into the parent frame.
    pub fn transform_point(&self, point: &Point2<f64>) -> Point2<f64> {
        self.to_isometry() * point
    }

    /// Distance of the frame origin from the parent origin.
    pub fn distance(&self) -> f64 {
        self.position_m.norm()
    }

    /// Angle of the frame origin as seen from the parent origin.
    pub fn bearing(&self) -> f64 {
        self.position_m[1].atan2(self.position_m[0])
    }

    pub fn is_finite(&self) -> bool {
        self.position_m[0].is_finite()
            && self.position_m[1].is_finite()
            && self.heading_rad.is_finite()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
