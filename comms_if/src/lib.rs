//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the
//! telecommands accepted by the motion controller, the velocity commands it
//! emits, and the telemetry it reports.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Command definitions for equipment (like the drive base)
pub mod eqpt;

/// Telemetry published by the motion controller
pub mod tm;
