//! Collision checking parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing the robot footprint and how obstacles are queried.
///
/// The footprint is a rectangle extending `robot_width` either side of the
/// base frame origin, `robot_front_length` forward of it and
/// `robot_back_length` behind it. Lengths are in meters and ages in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionParams {
    /// Robot-fixed frame obstacles are expressed in
    pub base_frame: String,

    /// Obstacle readings older than this are ignored
    pub max_age: f64,

    /// Distance reported when nothing is detected
    pub no_obstacle_dist: f64,

    /// Half width of the footprint
    pub robot_width: f64,

    /// Length of the footprint forward of the base frame origin
    pub robot_front_length: f64,

    /// Length of the footprint behind the base frame origin
    pub robot_back_length: f64,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            base_frame: String::from("base_link"),
            max_age: 1.0,
            no_obstacle_dist: 10.0,
            robot_width: 0.08,
            robot_front_length: 0.09,
            robot_back_length: 0.19,
        }
    }
}
