//! # Smooth motion library.
//!
//! This library allows the executable, the benchmarks and other crates in the
//! workspace to access the items defined inside the smooth motion crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Collision module - free distance and angle left around the robot footprint
pub mod collision;

/// Goal module - goal representation and the goal queue
pub mod goal;

/// Localisation module - planar poses and frame lookups
pub mod loc;

/// Motion control module - rotate and translate phases, goal execution
pub mod motion_ctrl;

/// Obstacle module - recent obstacle points and segments around the robot
pub mod obstacles;

/// Obstacle distance reporting
pub mod report;

/// Kinematic simulation of the robot and its surroundings
pub mod sim;

/// Telecommand processor - applies TCs to the goal queue and configuration
pub mod tc_processor;
