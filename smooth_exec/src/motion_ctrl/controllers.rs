//! # Motion controllers
//!
//! The lateral PID controller used while translating and the square root
//! acceleration ramp shared by both control loops.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A discrete PID controller, stepped once per control tick.
///
/// The integral is the plain sum of errors and the derivative the difference
/// to the previous error, both per tick rather than per second, so the gains
/// are tied to the loop rate.
#[derive(Debug, Serialize, Clone, Default)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error, starting from zero
    prev_error: f64,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            ..Default::default()
        }
    }

    /// Change the gains, keeping the accumulated state.
    pub fn set_gains(&mut self, k_p: f64, k_i: f64, k_d: f64) {
        self.k_p = k_p;
        self.k_i = k_i;
        self.k_d = k_d;
    }

    /// Get the value of the controller for the given error.
    pub fn get(&mut self, error: f64) -> f64 {
        self.integral += error;
        let diff = error - self.prev_error;
        self.prev_error = error;

        self.k_p * error + self.k_i * self.integral + self.k_d * diff
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Speed bound allowing the robot to stop within `margin` at `max_accel`.
///
/// `sqrt(prev_speed^2 + 2 * max_accel * margin)`. A negative margin counts as
/// no margin at all.
pub fn ramp(prev_speed: f64, max_accel: f64, margin: f64) -> f64 {
    (prev_speed * prev_speed + 2.0 * max_accel * margin)
        .max(0.0)
        .sqrt()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pid() {
        let mut pid = PidController::new(0.5, 0.1, 3.0);

        // First step sees the whole error as derivative
        let out = pid.get(0.2);
        assert!((out - (0.1 + 0.02 + 0.6)).abs() < 1e-12);

        // Constant error: no derivative, integral grows
        let out = pid.get(0.2);
        assert!((out - (0.1 + 0.04)).abs() < 1e-12);

        pid.set_gains(1.0, 0.0, 0.0);
        assert!((pid.get(-0.3) + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_ramp() {
        assert_eq!(ramp(0.0, 1.1, 0.0), 0.0);
        assert!((ramp(0.0, 2.0, 1.0) - 2.0).abs() < 1e-12);
        assert!((ramp(3.0, 2.0, 4.0) - 5.0).abs() < 1e-12);
        assert_eq!(ramp(0.5, 1.0, -1.0), 0.0);
    }
}
