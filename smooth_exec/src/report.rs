//! # Obstacle distance reporting
//!
//! Publishes the free distance ahead of the robot and the clearance either
//! side of it at a fixed rate, independently of any goal being executed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// Internal
use crate::{collision::LinearDirection, motion_ctrl::ConfigSlot, obstacles::ObstacleModel};
use comms_if::tm::ObstacleDistanceTm;
use util::{
    archive::{ArchiveError, Archiver},
    time::Timer,
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination of the distance reports.
pub trait DistanceSink: Send {
    fn send(&mut self, tm: ObstacleDistanceTm) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct DistanceReporter {
    config: Arc<ConfigSlot>,
    obstacles: Arc<dyn ObstacleModel>,
    sink: Box<dyn DistanceSink>,
}

/// Sink writing every report to a CSV archive.
pub struct ArchiveDistanceSink {
    archiver: Archiver,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DistanceReporter {
    pub fn new(
        config: Arc<ConfigSlot>,
        obstacles: Arc<dyn ObstacleModel>,
        sink: Box<dyn DistanceSink>,
    ) -> Self {
        Self {
            config,
            obstacles,
            sink,
        }
    }

    /// Compute and publish one report.
    pub fn step(&mut self) -> ObstacleDistanceTm {
        let config = self.config.snapshot();
        let params = &config.params;

        let obstacles = self.obstacles.snapshot(params.collision.max_age);
        let result = config
            .checker
            .obstacle_linear_margin(LinearDirection::Forward, &obstacles);

        let tm = ObstacleDistanceTm {
            forward_m: result.distance,
            left_m: result.left_clearance,
            right_m: result.right_clearance,
        };
        trace!(
            "Obstacle distance: forward {:.3} m, left {:.3} m, right {:.3} m",
            tm.forward_m,
            tm.left_m,
            tm.right_m
        );

        if tm.left_m < params.min_side_dist {
            warn!("Obstacle {:.3} m to the left", tm.left_m);
        }
        if tm.right_m < params.min_side_dist {
            warn!("Obstacle {:.3} m to the right", tm.right_m);
        }

        if let Err(e) = self.sink.send(tm) {
            warn!("Could not publish obstacle distance: {}", e);
        }

        tm
    }

    /// Report at the configured rate until `shutdown` is set.
    pub fn run(&mut self, timer: &mut dyn Timer, shutdown: &AtomicBool) {
        timer.reset();

        while !shutdown.load(Ordering::SeqCst) {
            let rate_hz = self.config.snapshot().params.report_rate_hz;
            timer.sleep(1.0 / rate_hz);
            self.step();
        }
    }
}

impl ArchiveDistanceSink {
    pub fn new(archiver: Archiver) -> Self {
        Self { archiver }
    }
}

impl DistanceSink for ArchiveDistanceSink {
    fn send(&mut self, tm: ObstacleDistanceTm) -> Result<(), ArchiveError> {
        self.archiver.serialise(tm)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::motion_ctrl::Params;
    use crate::obstacles::ObstacleBuffer;
    use nalgebra::Point2;
    use std::sync::Mutex;
    use util::time::Clock;

    struct ZeroClock;

    impl Clock for ZeroClock {
        fn now_s(&self) -> f64 {
            0.0
        }
    }

    #[derive(Clone, Default)]
    struct VecSink(Arc<Mutex<Vec<ObstacleDistanceTm>>>);

    impl DistanceSink for VecSink {
        fn send(&mut self, tm: ObstacleDistanceTm) -> Result<(), ArchiveError> {
            self.0.lock().unwrap().push(tm);
            Ok(())
        }
    }

    /// Counts sleeps and requests shutdown after a fixed number.
    struct CountingTimer<'a> {
        sleeps: usize,
        limit: usize,
        shutdown: &'a AtomicBool,
        periods: Vec<f64>,
    }

    impl<'a> Timer for CountingTimer<'a> {
        fn now_s(&self) -> f64 {
            self.periods.iter().sum()
        }

        fn sleep(&mut self, period_s: f64) {
            self.sleeps += 1;
            self.periods.push(period_s);
            if self.sleeps >= self.limit {
                self.shutdown.store(true, Ordering::SeqCst);
            }
        }
    }

    fn reporter(points: Vec<Point2<f64>>) -> (DistanceReporter, VecSink) {
        let buffer = Arc::new(ObstacleBuffer::new(Arc::new(ZeroClock)));
        buffer.update_sensor("test", points, Vec::new());

        let config = Arc::new(ConfigSlot::new(Params::default()).unwrap());
        let sink = VecSink::default();

        (
            DistanceReporter::new(config, buffer, Box::new(sink.clone())),
            sink,
        )
    }

    #[test]
    fn test_step() {
        let (mut reporter, sink) = reporter(vec![Point2::new(0.5, 0.0), Point2::new(0.0, 0.2)]);

        let tm = reporter.step();
        assert!((tm.forward_m - 0.41).abs() < 1e-9);
        assert!((tm.left_m - 0.12).abs() < 1e-9);
        assert!((tm.right_m - (10.0 - 0.08)).abs() < 1e-9);
        assert_eq!(*sink.0.lock().unwrap(), vec![tm]);
    }

    #[test]
    fn test_run_at_rate() {
        let (mut reporter, sink) = reporter(Vec::new());
        let shutdown = AtomicBool::new(false);
        let mut timer = CountingTimer {
            sleeps: 0,
            limit: 5,
            shutdown: &shutdown,
            periods: Vec::new(),
        };

        reporter.run(&mut timer, &shutdown);

        assert_eq!(sink.0.lock().unwrap().len(), 5);
        assert!(timer.periods.iter().all(|p| (p - 0.05).abs() < 1e-12));
    }
}
