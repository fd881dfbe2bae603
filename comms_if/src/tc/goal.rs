//! # Goal telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A navigation goal as submitted from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCmd {
    /// Name of the frame the goal is expressed in
    pub frame_id: String,

    /// Target position in the goal frame
    pub position_m: [f64; 2],

    /// Target orientation as an `[x, y, z, w]` quaternion. Only the rotation
    /// about Z is used.
    #[serde(default = "identity_quaternion")]
    pub orientation_q: [f64; 4]
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl GoalCmd {
    /// Build a goal from a planar position and heading.
    pub fn from_yaw(frame_id: &str, x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        let half = 0.5 * yaw_rad;
        Self {
            frame_id: frame_id.to_string(),
            position_m: [x_m, y_m],
            orientation_q: [0.0, 0.0, half.sin(), half.cos()]
        }
    }
}

fn identity_quaternion() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}
