//! Straight line translation phase
//!
//! Each tick resolves to exactly one `TranslateStep`, which decides whether the
//! loop carries on and whether a final stop command is still owed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};

use super::*;
use crate::collision::{LinearDirection, RotationDirection};
use util::maths::{normalize_angle, sign};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State carried between translate ticks.
#[derive(Debug)]
struct TranslateState {
    prev_linear_ms: f64,

    /// Magnitude of the previous angular command
    prev_angular_rads: f64,

    lateral_pid: PidController,

    /// Closest distance to the goal seen since last heading towards it
    ref_dist_m: f64,

    /// Last time the robot was not moving away from the goal
    last_progress_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of a single translate tick.
#[derive(Debug, Clone, PartialEq)]
enum TranslateStep {
    /// Command sent, keep going
    Continue,

    /// Stopped for an obstacle, try again next tick
    Blocked,

    /// Goal reached, the robot must be stopped
    CompleteWithStop,

    /// Goal reached and the next goal is queued, keep moving
    CompleteWithoutStop,

    Preempted,

    Fail(MotionCtrlError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionCtrl {
    /// Drive in a straight line to the position of `goal_in_drv`, a pose in
    /// `driving_frame`.
    ///
    /// The robot only drives forwards. A goal exactly behind it is never
    /// reached: the bearing derate stops linear motion, the lateral error is
    /// zero so the robot does not turn, and as the distance does not grow the
    /// runaway timeout never fires. Such a translation only ends on preemption.
    pub fn translate(&mut self, goal_in_drv: &Pose, driving_frame: &str) -> PhaseOutcome {
        info!(
            "Translating to ({:.3}, {:.3}) in {}",
            goal_in_drv.position_m[0], goal_in_drv.position_m[1], driving_frame
        );

        self.timer.reset();
        self.report.oscillations = 0;

        let initial_dist = {
            let config = self.config.snapshot();
            self.pose_source
                .lookup(&config.params.collision.base_frame, driving_frame)
                .map(|p| (goal_in_drv.position_m - p.position_m).norm())
                .unwrap_or(std::f64::INFINITY)
        };

        let mut state = TranslateState {
            prev_linear_ms: 0.0,
            prev_angular_rads: 0.0,
            lateral_pid: PidController::default(),
            ref_dist_m: initial_dist,
            last_progress_s: self.timer.now_s(),
        };

        loop {
            let step = self.translate_tick(goal_in_drv, driving_frame, &mut state);

            let outcome = match step {
                TranslateStep::Continue | TranslateStep::Blocked => None,
                TranslateStep::CompleteWithStop => {
                    self.stop();
                    Some(PhaseOutcome::Completed)
                }
                TranslateStep::CompleteWithoutStop => Some(PhaseOutcome::Completed),
                TranslateStep::Preempted => {
                    self.stop();
                    Some(PhaseOutcome::Preempted)
                }
                TranslateStep::Fail(e) => {
                    self.stop();
                    Some(PhaseOutcome::Failed(e))
                }
            };

            self.end_tick();

            if let Some(o) = outcome {
                return o;
            }
        }
    }

    fn translate_tick(
        &mut self,
        goal_in_drv: &Pose,
        driving_frame: &str,
        state: &mut TranslateState,
    ) -> TranslateStep {
        let config = self.next_tick(MotionPhase::Translate);
        let params = &config.params;

        if self.goals.is_preempt_requested() {
            info!("Stopping translation on preempt request");
            return TranslateStep::Preempted;
        }

        let robot_in_drv = match self
            .pose_source
            .lookup(&params.collision.base_frame, driving_frame)
        {
            Ok(p) => p,
            Err(e) => return TranslateStep::Fail(e.into()),
        };
        let drv_to_base = robot_in_drv.inverse();

        // Goal as seen from the robot
        let remaining = drv_to_base.compose(goal_in_drv);
        let dist = remaining.distance();
        let bearing = normalize_angle(remaining.bearing());
        let lat_error = remaining.position_m[1];

        self.report.dist_remaining_m = dist;
        self.report.angle_remaining_rad = bearing;
        self.report.lat_error_m = lat_error;

        let obstacles = self.obstacles.snapshot(params.collision.max_age);
        let linear = config.checker.obstacle_linear_margin(
            LinearDirection::from_speed(state.prev_linear_ms),
            &obstacles,
        );
        let rot_margin = config
            .checker
            .obstacle_rotation_margin(RotationDirection::towards(bearing), &obstacles);

        self.report.linear_margin_m = linear.distance;
        self.report.left_clearance_m = linear.left_clearance;
        self.report.right_clearance_m = linear.right_clearance;
        self.report.rotation_margin_rad = rot_margin;
        self.report.arc_margin_rad = config.checker.obstacle_arc_margin(
            self.report.linear_cmd_ms,
            self.report.angular_cmd_rads,
            &obstacles,
        );

        // Moving away from the goal, beyond what localisation noise explains
        let now = self.timer.now_s();
        if bearing.cos() < 0.0 && dist > state.ref_dist_m + params.localization_dev_m {
            if now - state.last_progress_s > params.runaway_timeout {
                return TranslateStep::Fail(MotionCtrlError::RunawayTimeout(
                    params.runaway_timeout,
                ));
            }
        } else {
            state.last_progress_s = now;
            state.ref_dist_m = if bearing.cos() < 0.0 {
                state.ref_dist_m.min(dist)
            } else {
                dist
            };
        }

        if dist < params.max_lateral_deviation {
            let (x, y) = (remaining.position_m[0], remaining.position_m[1]);
            return if self.goals.is_new_goal_available() {
                info!("Intermediate goal reached, error x: {:.3} m, y: {:.3} m", x, y);
                TranslateStep::CompleteWithoutStop
            } else {
                info!("Translation done, error x: {:.3} m, y: {:.3} m", x, y);
                TranslateStep::CompleteWithStop
            };
        }

        let blocked = linear.distance <= params.forward_obstacle_threshold;
        if blocked && !self.report.obstacle_blocked {
            warn!(
                "Waiting for obstacle {:.3} m ahead to clear",
                linear.distance
            );
        }
        self.report.obstacle_blocked = blocked;
        if blocked {
            self.stop();
            state.prev_linear_ms = 0.0;
            state.prev_angular_rads = 0.0;
            return TranslateStep::Blocked;
        }

        // Linear command
        let max_angle_dev = params.max_lateral_deviation.atan2(1.0);
        let bearing_derate = ((max_angle_dev - bearing.abs() / 2.0) / max_angle_dev).max(0.0)
            * params.max_linear_velocity;
        let accel_bound = ramp(
            state.prev_linear_ms,
            params.max_linear_acceleration,
            linear.distance.min(dist),
        );
        let mut linear_ms = bearing_derate
            .min(dist)
            .min(accel_bound)
            .min(params.max_linear_velocity);

        // Angular command
        state
            .lateral_pid
            .set_gains(params.lateral_kp, params.lateral_ki, params.lateral_kd);
        let pid = state.lateral_pid.get(lat_error);
        let angular_bound = ramp(
            state.prev_angular_rads,
            params.max_angular_acceleration,
            bearing.abs().min(rot_margin.abs()),
        );
        let angular_rads = (sign(pid) * pid.abs().min(angular_bound))
            .max(-params.max_angular_velocity)
            .min(params.max_angular_velocity);

        // Keep up speed into the corner towards the next goal
        if let Some(next) = self.goals.queued_goal() {
            let next_in_drv = match self.pose_source.lookup(&next.frame_id, driving_frame) {
                Ok(frame_in_drv) => frame_in_drv.compose(&next.pose),
                Err(e) => {
                    warn!("Cannot determine next goal pose in driving frame");
                    return TranslateStep::Fail(e.into());
                }
            };
            let next_remaining = drv_to_base.compose(&next_in_drv);
            let next_dist = next_remaining.distance();
            let next_angle = normalize_angle(next_remaining.bearing());

            let turn_speed = (params.gravity_mss
                * params.max_incline_without_slipping
                * params.max_lateral_deviation
                / (1.0 - (next_angle / 2.0).cos()))
            .sqrt();

            linear_ms = next_dist
                .min(linear_ms.max(turn_speed))
                .min(params.max_linear_velocity);

            debug!(
                "Next goal {:.3} m away at {:.3} rad, turn speed {:.3} m/s",
                next_dist, next_angle, turn_speed
            );
        }

        debug!(
            "Translate: dist {:.3} m, bearing {:.3} rad, lat {:.3} m, cmd ({:.3} m/s, {:.3} rad/s)",
            dist, bearing, lat_error, linear_ms, angular_rads
        );

        state.prev_linear_ms = linear_ms;
        state.prev_angular_rads = angular_rads.abs();

        self.send_cmd(VelocityCmd::new(angular_rads, linear_ms));

        TranslateStep::Continue
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
