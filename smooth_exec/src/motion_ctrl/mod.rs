//! # Motion control module
//!
//! Drives the robot to goal poses in two phases. `translate` follows the
//! straight line to the goal position, `rotate` then turns on the spot to the
//! goal heading. Both phases are fixed-rate loops consulting the pose source
//! and the collision checker every tick, and both poll the goal interface for
//! preemption and newly queued goals.
//!
//! `execute_goal` wraps the phases for one goal: it picks the driving frame,
//! validates the goal, runs the phases and reports the outcome exactly once.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod config;
mod controllers;
mod params;
mod rotate;
mod translate;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info, warn};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use thiserror::Error;

// Internal
pub use config::{ActiveConfig, ConfigSlot};
pub use controllers::{ramp, PidController};
pub use params::{Params, ParamsError};

use crate::{
    goal::{Goal, GoalInterface},
    loc::{LocError, Pose, PoseSource},
    obstacles::ObstacleModel,
};
use comms_if::eqpt::drive::VelocityCmd;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    time::Timer,
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination of the velocity commands.
pub trait VelocitySink: Send {
    fn send(&mut self, cmd: VelocityCmd);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The motion controller.
pub struct MotionCtrl {
    config: Arc<ConfigSlot>,

    pose_source: Arc<dyn PoseSource>,

    obstacles: Arc<dyn ObstacleModel>,

    goals: Arc<dyn GoalInterface>,

    sink: Box<dyn VelocitySink>,

    timer: Box<dyn Timer>,

    /// While set every command sent is replaced by a stop
    force_stop: Arc<AtomicBool>,

    report: StatusReport,

    archiver: Option<Archiver>,
}

/// Status of the controller during the last tick.
///
/// Flat so that it can be archived as one CSV row per tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub time_s: f64,

    pub phase: MotionPhase,

    /// Identifier of the goal being executed, 0 if none yet
    pub goal_id: u64,

    pub dist_remaining_m: f64,
    pub angle_remaining_rad: f64,
    pub lat_error_m: f64,

    pub linear_margin_m: f64,
    pub left_clearance_m: f64,
    pub right_clearance_m: f64,
    pub rotation_margin_rad: f64,

    /// Arc margin for the previous command. Informational only, it does not
    /// limit the commands.
    pub arc_margin_rad: f64,

    pub linear_cmd_ms: f64,
    pub angular_cmd_rads: f64,

    /// True while translation waits for an obstacle to clear
    pub obstacle_blocked: bool,

    pub oscillations: u32,

    pub force_stopped: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotionPhase {
    Idle,
    Rotate,
    Translate,
}

/// How a motion phase, or a whole goal, ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutcome {
    Completed,
    Preempted,
    Failed(MotionCtrlError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MotionCtrlError {
    #[error("Cannot determine robot or goal pose: {0}")]
    FrameUnavailable(#[from] LocError),

    #[error("Neither the {preferred} nor the {alternate} driving frame is available")]
    NoDrivingFrame { preferred: String, alternate: String },

    #[error("Goal pose is not finite")]
    InvalidGoal,

    #[error("Already at goal, {0:.3} m away")]
    AlreadyAtGoal(f64),

    #[error("Moving away from goal for more than {0} s")]
    RunawayTimeout(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MotionPhase {
    fn default() -> Self {
        MotionPhase::Idle
    }
}

impl MotionCtrl {
    /// Create a new controller around its collaborators.
    pub fn new(
        config: Arc<ConfigSlot>,
        pose_source: Arc<dyn PoseSource>,
        obstacles: Arc<dyn ObstacleModel>,
        goals: Arc<dyn GoalInterface>,
        sink: Box<dyn VelocitySink>,
        timer: Box<dyn Timer>,
    ) -> Self {
        Self {
            config,
            pose_source,
            obstacles,
            goals,
            sink,
            timer,
            force_stop: Arc::new(AtomicBool::new(false)),
            report: StatusReport::default(),
            archiver: None,
        }
    }

    /// Archive a status report for every control tick.
    pub fn set_archiver(&mut self, archiver: Archiver) {
        self.archiver = Some(archiver);
    }

    /// Handle to the force-stop flag, which may be set from anywhere.
    pub fn force_stop_flag(&self) -> Arc<AtomicBool> {
        self.force_stop.clone()
    }

    /// Report of the last tick.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Execute a goal, reporting the outcome to the goal interface.
    ///
    /// Every outcome other than `Completed` leaves the robot stopped.
    pub fn execute_goal(&mut self, goal: &Goal) -> PhaseOutcome {
        info!(
            "Executing goal {}: ({:.3}, {:.3}, {:.3}) in {}",
            goal.id,
            goal.pose.position_m[0],
            goal.pose.position_m[1],
            goal.pose.heading_rad,
            goal.frame_id
        );
        self.report.goal_id = goal.id;

        let outcome = self.run_goal(goal).unwrap_or_else(PhaseOutcome::Failed);

        match &outcome {
            PhaseOutcome::Completed => {
                info!("Goal {} reached", goal.id);
                self.goals.set_succeeded();
            }
            PhaseOutcome::Preempted => {
                info!("Goal {} preempted", goal.id);
                self.goals.set_preempted();
            }
            PhaseOutcome::Failed(e) => {
                error!("Goal {} aborted: {}", goal.id, e);
                self.stop();
                self.goals.set_aborted(&e.to_string());
            }
        }

        self.report.phase = MotionPhase::Idle;
        outcome
    }

    fn run_goal(&mut self, goal: &Goal) -> Result<PhaseOutcome, MotionCtrlError> {
        if !goal.pose.is_finite() {
            return Err(MotionCtrlError::InvalidGoal);
        }

        let config = self.config.snapshot();
        let params = &config.params;

        let (driving_frame, robot_in_drv) = self.resolve_driving_frame(params)?;

        // The straight line path as seen from the goal's own frame
        let robot_in_goal = self
            .pose_source
            .lookup(&params.collision.base_frame, &goal.frame_id)?;
        info!(
            "Planned path from ({:.3}, {:.3}) to ({:.3}, {:.3}) in {}",
            robot_in_goal.position_m[0],
            robot_in_goal.position_m[1],
            goal.pose.position_m[0],
            goal.pose.position_m[1],
            goal.frame_id
        );

        let goal_in_drv = self
            .pose_source
            .lookup(&goal.frame_id, &driving_frame)?
            .compose(&goal.pose);

        let dist = (goal_in_drv.position_m - robot_in_drv.position_m).norm();
        if dist <= params.max_lateral_deviation {
            return Err(MotionCtrlError::AlreadyAtGoal(dist));
        }

        match self.translate(&goal_in_drv, &driving_frame) {
            PhaseOutcome::Completed => (),
            other => return Ok(other),
        }

        if self.goals.is_new_goal_available() {
            info!("Next goal queued, skipping final rotation");
            return Ok(PhaseOutcome::Completed);
        }

        Ok(self.rotate(goal_in_drv.heading_rad, &driving_frame))
    }

    /// Pick the frame to drive in, returning it with the robot pose in it.
    pub fn resolve_driving_frame(
        &self,
        params: &Params,
    ) -> Result<(String, Pose), MotionCtrlError> {
        let base = &params.collision.base_frame;

        match self.pose_source.lookup(base, &params.preferred_driving_frame) {
            Ok(pose) => Ok((params.preferred_driving_frame.clone(), pose)),
            Err(e) => {
                warn!(
                    "{}, driving in {} instead",
                    e, params.alternate_driving_frame
                );
                self.pose_source
                    .lookup(base, &params.alternate_driving_frame)
                    .map(|pose| (params.alternate_driving_frame.clone(), pose))
                    .map_err(|_| MotionCtrlError::NoDrivingFrame {
                        preferred: params.preferred_driving_frame.clone(),
                        alternate: params.alternate_driving_frame.clone(),
                    })
            }
        }
    }

    /// Wait for the next tick of the given phase and take the configuration
    /// for it.
    fn next_tick(&mut self, phase: MotionPhase) -> Arc<ActiveConfig> {
        let rate_hz = {
            let config = self.config.snapshot();
            match phase {
                MotionPhase::Rotate => config.params.rotate_rate_hz,
                _ => config.params.translate_rate_hz,
            }
        };
        self.timer.sleep(1.0 / rate_hz);

        self.report.time_s = self.timer.now_s();
        self.report.phase = phase;
        self.config.snapshot()
    }

    /// Send a command, or a stop if the force-stop flag is set.
    fn send_cmd(&mut self, cmd: VelocityCmd) {
        let force_stopped = self.force_stop.load(Ordering::SeqCst);
        let cmd = if force_stopped { VelocityCmd::stop() } else { cmd };

        self.report.linear_cmd_ms = cmd.linear_ms;
        self.report.angular_cmd_rads = cmd.angular_rads;
        self.report.force_stopped = force_stopped;

        self.sink.send(cmd);
    }

    fn stop(&mut self) {
        self.send_cmd(VelocityCmd::stop());
    }

    /// Archive the report of the tick that just ended.
    fn end_tick(&mut self) {
        if let Err(e) = self.write() {
            warn!("Could not archive status report: {}", e);
        }
    }
}

impl Archived for MotionCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        match self.archiver {
            Some(ref mut a) => a.serialise(&self.report),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
