//! Clocks and loop timers
//!
//! Fixed-rate loops sleep through the `Timer` trait, so that the same loop can
//! run against the wall clock or a simulated one.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const NANOS_PER_SECOND: f64 = 1e9;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of monotonic time, in seconds since an arbitrary epoch.
pub trait Clock: Send + Sync {
    fn now_s(&self) -> f64;
}

/// A fixed-rate loop timer.
///
/// `sleep` suspends the caller until the end of the current period. It is the
/// only place a control loop is allowed to block.
pub trait Timer: Send {
    /// Current time of the timer in seconds.
    fn now_s(&self) -> f64;

    /// Sleep until one period after the previous wake up.
    fn sleep(&mut self, period_s: f64);

    /// Forget the previous wake up, so the next sleep lasts a full period.
    fn reset(&mut self) {}
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wall clock based on `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant
}

/// Real-time loop timer, warning when a cycle overruns its period.
#[derive(Debug)]
pub struct LoopTimer {
    clock: MonotonicClock,
    next_wake: Option<Instant>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now()
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_s(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

impl LoopTimer {
    pub fn new() -> Self {
        Self {
            clock: MonotonicClock::new(),
            next_wake: None
        }
    }
}

impl Default for LoopTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for LoopTimer {
    fn now_s(&self) -> f64 {
        self.clock.now_s()
    }

    fn sleep(&mut self, period_s: f64) {
        let period = Duration::from_secs_f64(period_s.max(0.0));
        let now = Instant::now();

        let target = match self.next_wake {
            Some(t) => t + period,
            None => now + period
        };

        if target > now {
            std::thread::sleep(target - now);
            self.next_wake = Some(target);
        }
        else {
            // Skip the missed deadline rather than trying to catch up
            warn!(
                "Cycle overran by {:.06} s",
                (now - target).as_secs_f64()
            );
            self.next_wake = Some(now);
        }
    }

    fn reset(&mut self) {
        self.next_wake = None;
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Length of a chrono duration in seconds, `None` if it overflows nanosecond
/// resolution.
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND)
}
