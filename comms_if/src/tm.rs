//! # Telemetry module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Clearance around the robot footprint, published once per report cycle.
///
/// All distances are measured beyond the footprint edge, so they may be
/// negative if an obstacle already penetrates the footprint.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleDistanceTm {
    /// Free distance ahead of the front edge
    pub forward_m: f64,

    /// Free distance beyond the left side
    pub left_m: f64,

    /// Free distance beyond the right side
    pub right_m: f64
}
