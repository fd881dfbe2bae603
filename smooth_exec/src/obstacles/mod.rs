//! # Obstacle model
//!
//! Obstacle geometry is consumed by the collision checker through the
//! `ObstacleModel` trait. Queries take a recency window and return a finite
//! snapshot of points and segments in the base frame.
//!
//! `ObstacleBuffer` is the concrete model, holding the latest reading from
//! each sensor. Writers and readers may live on different threads, every query
//! is served from a single locked view of the buffer.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Internal
use util::time::Clock;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Source of obstacle geometry expressed in the base frame.
pub trait ObstacleModel: Send + Sync {
    /// Points observed no more than `max_age_s` ago.
    fn points(&self, max_age_s: f64) -> Vec<Point2<f64>>;

    /// Segments observed no more than `max_age_s` ago.
    fn segments(&self, max_age_s: f64) -> Vec<Segment>;

    /// Points and segments together. Implementations with concurrent writers
    /// should override this to take both from the same view.
    fn snapshot(&self, max_age_s: f64) -> ObstacleSnapshot {
        ObstacleSnapshot {
            points: self.points(max_age_s),
            segments: self.segments(max_age_s),
        }
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A line segment, for example the edge of a range sensor cone or a chord
/// between two lidar returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub p0: Point2<f64>,
    pub p1: Point2<f64>,
}

/// Obstacles visible at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstacleSnapshot {
    pub points: Vec<Point2<f64>>,
    pub segments: Vec<Segment>,
}

/// Latest obstacles reported by each sensor.
pub struct ObstacleBuffer {
    clock: Arc<dyn Clock>,
    readings: Mutex<BTreeMap<String, SensorReading>>,
}

#[derive(Debug, Clone)]
struct SensorReading {
    stamp_s: f64,
    points: Vec<Point2<f64>>,
    segments: Vec<Segment>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Segment {
    pub fn new(p0: Point2<f64>, p1: Point2<f64>) -> Self {
        Self { p0, p1 }
    }
}

impl ObstacleSnapshot {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.segments.is_empty()
    }
}

impl ObstacleBuffer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            readings: Mutex::new(BTreeMap::new()),
        }
    }

    /// Replace the reading of the given sensor, stamping it with the current
    /// time.
    pub fn update_sensor(&self, sensor_id: &str, points: Vec<Point2<f64>>, segments: Vec<Segment>) {
        let stamp_s = self.clock.now_s();

        trace!(
            "Sensor {} at {:.3} s: {} points, {} segments",
            sensor_id,
            stamp_s,
            points.len(),
            segments.len()
        );

        self.lock().insert(
            sensor_id.to_string(),
            SensorReading {
                stamp_s,
                points,
                segments,
            },
        );
    }

    /// Forget everything the given sensor has reported.
    #[cfg(test)]
    pub(crate) fn remove_sensor(&self, sensor_id: &str) {
        self.lock().remove(sensor_id);
    }

    /// Number of sensors which have reported at least once.
    #[cfg(test)]
    pub(crate) fn num_sensors(&self) -> usize {
        self.lock().len()
    }

    /// Lock the readings, carrying on with the data if a writer panicked.
    fn lock(&self) -> MutexGuard<BTreeMap<String, SensorReading>> {
        self.readings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Iterate over the readings which are recent enough.
    fn fresh<'a>(
        readings: &'a BTreeMap<String, SensorReading>,
        now_s: f64,
        max_age_s: f64,
    ) -> impl Iterator<Item = &'a SensorReading> {
        readings
            .values()
            .filter(move |r| now_s - r.stamp_s <= max_age_s)
    }
}

impl ObstacleModel for ObstacleBuffer {
    fn points(&self, max_age_s: f64) -> Vec<Point2<f64>> {
        let now_s = self.clock.now_s();
        let readings = self.lock();
        Self::fresh(&readings, now_s, max_age_s)
            .flat_map(|r| r.points.iter().copied())
            .collect()
    }

    fn segments(&self, max_age_s: f64) -> Vec<Segment> {
        let now_s = self.clock.now_s();
        let readings = self.lock();
        Self::fresh(&readings, now_s, max_age_s)
            .flat_map(|r| r.segments.iter().copied())
            .collect()
    }

    fn snapshot(&self, max_age_s: f64) -> ObstacleSnapshot {
        let now_s = self.clock.now_s();
        let readings = self.lock();
        let mut snap = ObstacleSnapshot::default();

        for r in Self::fresh(&readings, now_s, max_age_s) {
            snap.points.extend_from_slice(&r.points);
            snap.segments.extend_from_slice(&r.segments);
        }

        snap
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock which only moves when told to.
    struct ManualClock(AtomicU64);

    impl ManualClock {
        fn set(&self, t: f64) {
            self.0.store(t.to_bits(), Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_s(&self) -> f64 {
            f64::from_bits(self.0.load(Ordering::SeqCst))
        }
    }

    #[test]
    fn test_age_filtering() {
        let clock = Arc::new(ManualClock(AtomicU64::new(0f64.to_bits())));
        let buf = ObstacleBuffer::new(clock.clone());

        buf.update_sensor("sonar_front", vec![Point2::new(0.5, 0.0)], vec![]);

        clock.set(0.8);
        buf.update_sensor(
            "lidar",
            vec![Point2::new(1.0, 1.0), Point2::new(1.0, -1.0)],
            vec![Segment::new(Point2::new(1.0, 1.0), Point2::new(1.0, -1.0))],
        );
        assert_eq!(buf.num_sensors(), 2);

        let snap = buf.snapshot(1.0);
        assert_eq!(snap.points.len(), 3);
        assert_eq!(snap.segments.len(), 1);

        // The sonar reading is now too old
        clock.set(1.5);
        assert_eq!(buf.points(1.0).len(), 2);
        assert_eq!(buf.segments(1.0).len(), 1);

        // Everything is too old
        clock.set(3.0);
        assert!(buf.snapshot(1.0).is_empty());
    }

    #[test]
    fn test_update_replaces_reading() {
        let clock = Arc::new(ManualClock(AtomicU64::new(0f64.to_bits())));
        let buf = ObstacleBuffer::new(clock);

        buf.update_sensor("sonar", vec![Point2::new(0.5, 0.0)], vec![]);
        buf.update_sensor("sonar", vec![Point2::new(0.7, 0.0)], vec![]);

        assert_eq!(buf.points(1.0), vec![Point2::new(0.7, 0.0)]);

        buf.remove_sensor("sonar");
        assert!(buf.points(1.0).is_empty());
    }

    #[test]
    fn test_concurrent_writer() {
        let clock = Arc::new(ManualClock(AtomicU64::new(0f64.to_bits())));
        let buf = Arc::new(ObstacleBuffer::new(clock));

        let writer = {
            let buf = buf.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let x = 1.0 + i as f64;
                    buf.update_sensor(
                        "lidar",
                        vec![Point2::new(x, 0.0), Point2::new(x, 0.1)],
                        vec![Segment::new(Point2::new(x, 0.0), Point2::new(x, 0.1))],
                    );
                }
            })
        };

        // Every snapshot must come from a single reading
        for _ in 0..200 {
            let snap = buf.snapshot(1.0);
            if let Some(seg) = snap.segments.first() {
                assert_eq!(snap.points.len(), 2);
                assert_eq!(snap.points[0], seg.p0);
                assert_eq!(snap.points[1], seg.p1);
            }
        }

        writer.join().unwrap();
    }
}
