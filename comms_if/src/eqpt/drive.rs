//! # Drive base equipment interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A velocity demand for a differential drive base.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityCmd {
    /// The turn rate in radians/second.
    ///
    /// Follows the right hand rule about the robot's Z+ (upwards) axis, so that a positive turn
    /// rate will rotate the robot to the left.
    pub angular_rads: f64,

    /// The forward speed in meters/second. Positive speeds are "forwards".
    pub linear_ms: f64
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl VelocityCmd {
    pub fn new(angular_rads: f64, linear_ms: f64) -> Self {
        Self {
            angular_rads,
            linear_ms
        }
    }

    /// A command bringing the robot to a halt.
    pub fn stop() -> Self {
        Self::default()
    }

    pub fn is_stop(&self) -> bool {
        self.angular_rads == 0.0 && self.linear_ms == 0.0
    }
}
