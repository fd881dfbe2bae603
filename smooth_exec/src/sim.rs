//! # Kinematic simulation
//!
//! A simple stand-in for the robot and its surroundings, used by the
//! executable and by the controller tests:
//!
//! - The robot is a unicycle integrating the last velocity command whenever
//!   the simulated timer sleeps, plus an optional disturbance velocity.
//! - The pose is published as the `map -> odom -> base_link` frame chain. The
//!   `map` link can be made unavailable to mimic a lost localisation.
//! - A static world of obstacle points and segments, expressed in `map`, is
//!   observed by a range limited sensor and pushed into an obstacle buffer in
//!   the base frame.
//!
//! Time only advances when the simulated timer sleeps, so runs are
//! deterministic and as fast as the machine allows.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Point2, Vector2};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

// Internal
use crate::{
    loc::{FrameTree, Pose, PoseSource},
    motion_ctrl::VelocitySink,
    obstacles::{ObstacleBuffer, ObstacleModel, Segment},
};
use comms_if::eqpt::drive::VelocityCmd;
use util::time::{Clock, LoopTimer, Timer};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

pub const MAP_FRAME: &str = "map";
pub const ODOM_FRAME: &str = "odom";
pub const BASE_FRAME: &str = "base_link";

/// Identifier of the simulated range sensor in the obstacle buffer
const SENSOR_ID: &str = "sim_range";

/// Number of most recent velocity commands kept
const CMD_HISTORY_LEN: usize = 4096;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Static obstacles around the robot, in the map frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimWorld {
    pub points: Vec<Point2<f64>>,

    pub segments: Vec<Segment>,

    /// Range of the virtual obstacle sensor
    pub sensor_range_m: f64,
}

/// Handle to a running simulation. Clones share the same simulation.
#[derive(Clone)]
pub struct Sim {
    inner: Arc<SimInner>,
}

/// Simulated timer, advancing the simulation on every sleep.
///
/// With a pacer the timer also waits for the period to pass on the wall
/// clock, otherwise it returns immediately.
pub struct SimTimer {
    sim: Sim,
    pacer: Option<LoopTimer>,
}

/// Velocity sink driving the simulated robot.
pub struct SimVelocitySink {
    sim: Sim,
}

/// Simulation time, shared as a `Clock`.
#[derive(Debug, Default)]
pub struct SimClock {
    time_bits: AtomicU64,
}

type SimHook = Box<dyn FnMut(f64) + Send>;

struct SimInner {
    state: Mutex<SimState>,

    /// Called after each step, outside of the state lock
    hook: Mutex<Option<SimHook>>,

    clock: Arc<SimClock>,
    frames: Arc<FrameTree>,
    obstacles: Arc<ObstacleBuffer>,
}

#[derive(Debug)]
struct SimState {
    odom_pose: Pose,
    map_to_odom: Pose,
    map_available: bool,
    last_cmd: VelocityCmd,
    cmd_history: VecDeque<VelocityCmd>,
    disturbance_ms: Vector2<f64>,
    world: SimWorld,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimWorld {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            segments: Vec::new(),
            sensor_range_m: 4.0,
        }
    }
}

impl SimClock {
    fn set(&self, time_s: f64) {
        self.time_bits.store(time_s.to_bits(), Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now_s(&self) -> f64 {
        f64::from_bits(self.time_bits.load(Ordering::SeqCst))
    }
}

impl Sim {
    /// Start a simulation with the robot at the origin of every frame.
    pub fn new(world: SimWorld) -> Self {
        let clock = Arc::new(SimClock::default());
        let obstacles = Arc::new(ObstacleBuffer::new(clock.clone()));

        let sim = Self {
            inner: Arc::new(SimInner {
                state: Mutex::new(SimState {
                    odom_pose: Pose::identity(),
                    map_to_odom: Pose::identity(),
                    map_available: true,
                    last_cmd: VelocityCmd::stop(),
                    cmd_history: VecDeque::with_capacity(CMD_HISTORY_LEN),
                    disturbance_ms: Vector2::zeros(),
                    world,
                }),
                hook: Mutex::new(None),
                clock,
                frames: Arc::new(FrameTree::new()),
                obstacles,
            }),
        };

        sim.publish(&sim.lock());
        sim
    }

    pub fn pose_source(&self) -> Arc<dyn PoseSource> {
        self.inner.frames.clone()
    }

    pub fn obstacles(&self) -> Arc<dyn ObstacleModel> {
        self.inner.obstacles.clone()
    }

    pub fn timer(&self) -> SimTimer {
        SimTimer {
            sim: self.clone(),
            pacer: None,
        }
    }

    /// A timer keeping the simulation in step with the wall clock.
    pub fn real_time_timer(&self) -> SimTimer {
        SimTimer {
            sim: self.clone(),
            pacer: Some(LoopTimer::new()),
        }
    }

    pub fn velocity_sink(&self) -> SimVelocitySink {
        SimVelocitySink { sim: self.clone() }
    }

    /// Call `hook` with the new time after every simulation step.
    ///
    /// The hook may use any other simulation method except `set_hook`.
    pub fn set_hook<F>(&self, hook: F)
    where
        F: FnMut(f64) + Send + 'static,
    {
        *self
            .inner
            .hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
    }

    /// Pose of the robot in the map frame.
    pub fn robot_pose(&self) -> Pose {
        let state = self.lock();
        state.map_to_odom.compose(&state.odom_pose)
    }

    pub fn last_cmd(&self) -> VelocityCmd {
        self.lock().last_cmd
    }

    /// The most recent commands received, oldest first.
    pub fn cmd_history(&self) -> Vec<VelocityCmd> {
        self.lock().cmd_history.iter().copied().collect()
    }

    pub fn set_map_available(&self, available: bool) {
        let mut state = self.lock();
        state.map_available = available;
        self.publish(&state);
    }

    /// Velocity in the odom frame added to the robot's own motion.
    pub fn set_disturbance(&self, disturbance_ms: Vector2<f64>) {
        self.lock().disturbance_ms = disturbance_ms;
    }

    /// Remove every obstacle from the world.
    pub fn clear_world(&self) {
        let mut state = self.lock();
        state.world.points.clear();
        state.world.segments.clear();
        self.publish(&state);
    }

    /// Advance the simulation by `dt_s`, then run the hook.
    fn step(&self, dt_s: f64) {
        let time_s = {
            let mut state = self.lock();

            let cmd = state.last_cmd;
            let pose = state.odom_pose;

            // Midpoint integration of the unicycle
            let mid_heading = pose.heading_rad + 0.5 * cmd.angular_rads * dt_s;
            let velocity = Vector2::new(mid_heading.cos(), mid_heading.sin()) * cmd.linear_ms
                + state.disturbance_ms;
            let position = pose.position_m + velocity * dt_s;

            state.odom_pose = Pose::new(
                position[0],
                position[1],
                pose.heading_rad + cmd.angular_rads * dt_s,
            );

            let time_s = self.inner.clock.now_s() + dt_s;
            self.inner.clock.set(time_s);
            self.publish(&state);

            trace!(
                "Sim t = {:.3} s, pose ({:.3}, {:.3}, {:.3})",
                time_s,
                position[0],
                position[1],
                state.odom_pose.heading_rad
            );

            time_s
        };

        if let Some(hook) = self
            .inner
            .hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            hook(time_s);
        }
    }

    /// Publish the frames and the sensor reading for the current state.
    fn publish(&self, state: &SimState) {
        let frames = &self.inner.frames;
        if state.map_available {
            frames.set_transform(MAP_FRAME, ODOM_FRAME, state.map_to_odom);
        } else {
            frames.remove_transform(MAP_FRAME, ODOM_FRAME);
        }
        frames.set_transform(ODOM_FRAME, BASE_FRAME, state.odom_pose);

        // Observe the world from the robot
        let map_to_base = state.map_to_odom.compose(&state.odom_pose).inverse();
        let range = state.world.sensor_range_m;

        let points = state
            .world
            .points
            .iter()
            .map(|p| map_to_base.transform_point(p))
            .filter(|p| p.coords.norm() <= range)
            .collect();

        let segments = state
            .world
            .segments
            .iter()
            .map(|s| {
                Segment::new(
                    map_to_base.transform_point(&s.p0),
                    map_to_base.transform_point(&s.p1),
                )
            })
            .filter(|s| distance_to_origin(s) <= range)
            .collect();

        self.inner
            .obstacles
            .update_sensor(SENSOR_ID, points, segments);
    }

    fn lock(&self) -> MutexGuard<SimState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Timer for SimTimer {
    fn now_s(&self) -> f64 {
        self.sim.inner.clock.now_s()
    }

    fn sleep(&mut self, period_s: f64) {
        if let Some(ref mut pacer) = self.pacer {
            pacer.sleep(period_s);
        }
        self.sim.step(period_s);
    }

    fn reset(&mut self) {
        if let Some(ref mut pacer) = self.pacer {
            pacer.reset();
        }
    }
}

impl VelocitySink for SimVelocitySink {
    fn send(&mut self, cmd: VelocityCmd) {
        let mut state = self.sim.lock();
        state.last_cmd = cmd;
        if state.cmd_history.len() == CMD_HISTORY_LEN {
            state.cmd_history.pop_front();
        }
        state.cmd_history.push_back(cmd);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Shortest distance between the segment and the origin.
fn distance_to_origin(seg: &Segment) -> f64 {
    let d = seg.p1 - seg.p0;
    let len_sq = d.norm_squared();

    let t = if len_sq > 0.0 {
        (-seg.p0.coords.dot(&d) / len_sq).max(0.0).min(1.0)
    } else {
        0.0
    };

    (seg.p0 + d * t).coords.norm()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_unicycle() {
        let sim = Sim::new(SimWorld::default());
        let mut sink = sim.velocity_sink();
        let mut timer = sim.timer();

        sink.send(VelocityCmd::new(0.0, 1.0));
        for _ in 0..10 {
            timer.sleep(0.1);
        }
        let pose = sim.robot_pose();
        assert!((pose.position_m[0] - 1.0).abs() < 1e-9);
        assert!(pose.position_m[1].abs() < 1e-9);
        assert!((timer.now_s() - 1.0).abs() < 1e-9);

        // Quarter turn on the spot
        sink.send(VelocityCmd::new(FRAC_PI_2, 0.0));
        timer.sleep(1.0);
        assert!((sim.robot_pose().heading_rad - FRAC_PI_2).abs() < 1e-9);
        assert_eq!(sim.cmd_history().len(), 2);
    }

    #[test]
    fn test_cmd_history_bounded() {
        let sim = Sim::new(SimWorld::default());
        let mut sink = sim.velocity_sink();

        for i in 0..(CMD_HISTORY_LEN + 10) {
            sink.send(VelocityCmd::new(0.0, i as f64));
        }

        let history = sim.cmd_history();
        assert_eq!(history.len(), CMD_HISTORY_LEN);
        assert_eq!(history[0].linear_ms, 10.0);
        assert_eq!(sim.last_cmd().linear_ms, (CMD_HISTORY_LEN + 9) as f64);
    }

    #[test]
    fn test_frames() {
        let sim = Sim::new(SimWorld::default());
        let frames = sim.pose_source();

        sim.velocity_sink().send(VelocityCmd::new(0.0, 0.5));
        sim.timer().sleep(1.0);

        let in_map = frames.lookup(BASE_FRAME, MAP_FRAME).unwrap();
        assert!((in_map.position_m[0] - 0.5).abs() < 1e-9);

        sim.set_map_available(false);
        assert!(frames.lookup(BASE_FRAME, MAP_FRAME).is_err());
        assert!(frames.lookup(BASE_FRAME, ODOM_FRAME).is_ok());
    }

    #[test]
    fn test_sensor() {
        let mut world = SimWorld::default();
        world.points.push(Point2::new(1.0, 0.0));
        world.points.push(Point2::new(10.0, 0.0));
        world.segments.push(Segment::new(Point2::new(2.0, -5.0), Point2::new(2.0, 5.0)));
        world.segments.push(Segment::new(Point2::new(8.0, -1.0), Point2::new(8.0, 1.0)));
        let sim = Sim::new(world);
        let obstacles = sim.obstacles();

        let snap = obstacles.snapshot(1.0);
        assert_eq!(snap.points, vec![Point2::new(1.0, 0.0)]);
        assert_eq!(snap.segments.len(), 1);

        // Turn left, the point ends up on the right
        sim.velocity_sink().send(VelocityCmd::new(FRAC_PI_2, 0.0));
        sim.timer().sleep(1.0);
        let snap = obstacles.snapshot(1.0);
        assert!((snap.points[0] - Point2::new(0.0, -1.0)).norm() < 1e-9);

        sim.clear_world();
        assert!(obstacles.snapshot(1.0).is_empty());
    }

    #[test]
    fn test_hook_and_disturbance() {
        let sim = Sim::new(SimWorld::default());
        sim.set_disturbance(Vector2::new(0.0, 0.1));

        let times = Arc::new(Mutex::new(Vec::new()));
        let hook_times = times.clone();
        sim.set_hook(move |t| hook_times.lock().unwrap().push(t));

        let mut timer = sim.timer();
        timer.sleep(0.5);
        timer.sleep(0.5);

        assert_eq!(*times.lock().unwrap(), vec![0.5, 1.0]);
        assert!((sim.robot_pose().position_m[1] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_real_time_timer() {
        let sim = Sim::new(SimWorld::default());
        let mut timer = sim.real_time_timer();

        let start = std::time::Instant::now();
        timer.sleep(0.02);
        timer.sleep(0.02);

        assert!(start.elapsed().as_secs_f64() >= 0.039);
        assert!((timer.now_s() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_distance_to_origin() {
        let seg = Segment::new(Point2::new(1.0, -1.0), Point2::new(1.0, 1.0));
        assert!((distance_to_origin(&seg) - 1.0).abs() < 1e-12);

        let seg = Segment::new(Point2::new(3.0, 4.0), Point2::new(6.0, 8.0));
        assert!((distance_to_origin(&seg) - 5.0).abs() < 1e-12);
    }
}
