//! On the spot rotation phase

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};

use super::*;
use crate::collision::RotationDirection;
use util::maths::{normalize_angle, sign};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionCtrl {
    /// Turn on the spot until the robot heading in the driving frame is
    /// `target_yaw_rad`.
    ///
    /// The turn rate accelerates at most at the maximum angular acceleration
    /// over the free angle ahead, so the robot slows down for obstacles within
    /// reach of the footprint. A heading error which keeps changing sign is
    /// taken as converged.
    pub fn rotate(&mut self, target_yaw_rad: f64, driving_frame: &str) -> PhaseOutcome {
        let target_yaw_rad = normalize_angle(target_yaw_rad);
        info!("Rotating to {:.3} rad in {}", target_yaw_rad, driving_frame);

        self.timer.reset();
        self.report.obstacle_blocked = false;

        let mut prev_speed = 0.0;
        let mut prev_sign: Option<f64> = None;
        let mut oscillations = 0u32;

        loop {
            let config = self.next_tick(MotionPhase::Rotate);
            let params = &config.params;

            if self.goals.is_preempt_requested() {
                info!("Stopping rotation on preempt request");
                self.stop();
                self.end_tick();
                return PhaseOutcome::Preempted;
            }

            let pose = match self
                .pose_source
                .lookup(&params.collision.base_frame, driving_frame)
            {
                Ok(p) => p,
                Err(e) => {
                    self.stop();
                    self.end_tick();
                    return PhaseOutcome::Failed(e.into());
                }
            };

            let angle_remaining = normalize_angle(target_yaw_rad - pose.heading_rad);

            let obstacles = self.obstacles.snapshot(params.collision.max_age);
            let margin = config
                .checker
                .obstacle_rotation_margin(RotationDirection::towards(angle_remaining), &obstacles);
            let effective_margin = angle_remaining.abs().min(margin.abs());

            let angle_sign = sign(angle_remaining);
            if let Some(s) = prev_sign {
                if s != angle_sign {
                    oscillations += 1;
                }
            }
            prev_sign = Some(angle_sign);

            self.report.angle_remaining_rad = angle_remaining;
            self.report.rotation_margin_rad = margin;
            self.report.oscillations = oscillations;

            if angle_remaining.abs() < params.angular_tolerance
                || oscillations > params.max_oscillations
            {
                info!(
                    "Rotation done, heading error {:.2} deg after {} oscillations",
                    angle_remaining.to_degrees(),
                    oscillations
                );
                self.stop();
                self.end_tick();
                return PhaseOutcome::Completed;
            }

            if self.goals.is_new_goal_available() {
                info!("Next goal queued, ending rotation");
                self.stop();
                self.end_tick();
                return PhaseOutcome::Completed;
            }

            let speed = ramp(prev_speed, params.max_angular_acceleration, effective_margin)
                .min(params.max_angular_velocity);
            prev_speed = speed;

            debug!(
                "Rotate: error {:.3} rad, margin {:.3} rad, speed {:.3} rad/s",
                angle_remaining, margin, speed
            );

            self.send_cmd(VelocityCmd::new(angle_sign * speed, 0.0));
            self.end_tick();
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::test::sim_ctrl;
    use super::*;
    use crate::sim::SimWorld;
    use comms_if::tc::goal::GoalCmd;
    use nalgebra::Point2;
    use std::f64::consts::PI;

    #[test]
    fn test_rotate_from_behind() {
        let (sim, _queue, mut ctrl) = sim_ctrl(SimWorld::default());

        assert_eq!(ctrl.rotate(PI, "map"), PhaseOutcome::Completed);

        let heading = sim.robot_pose().heading_rad;
        assert!(normalize_angle(PI - heading).abs() < 0.1);
        assert!(ctrl.report().oscillations <= 1);
        assert!(sim.last_cmd().is_stop());

        // Only ever turned one way and never exceeded the limit
        let history = sim.cmd_history();
        assert!(history.iter().all(|c| c.angular_rads >= 0.0));
        assert!(history.iter().all(|c| c.angular_rads <= 2.0 && c.linear_ms == 0.0));
    }

    #[test]
    fn test_rotate_right() {
        let (sim, _queue, mut ctrl) = sim_ctrl(SimWorld::default());

        assert_eq!(ctrl.rotate(-1.0, "odom"), PhaseOutcome::Completed);
        assert!((sim.robot_pose().heading_rad + 1.0).abs() < 0.1);
        assert!(sim.cmd_history().iter().all(|c| c.angular_rads <= 0.0));
    }

    #[test]
    fn test_rotate_already_aligned() {
        let (sim, _queue, mut ctrl) = sim_ctrl(SimWorld::default());

        assert_eq!(ctrl.rotate(0.05, "map"), PhaseOutcome::Completed);
        assert_eq!(sim.cmd_history().len(), 1);
        assert!(sim.last_cmd().is_stop());
    }

    #[test]
    fn test_rotate_preempted_within_one_tick() {
        let (sim, queue, mut ctrl) = sim_ctrl(SimWorld::default());
        queue.submit(&GoalCmd::from_yaw("map", 0.0, 0.0, PI));
        queue.accept_next().unwrap();

        let hook_queue = queue.clone();
        sim.set_hook(move |t| {
            if t > 0.2 {
                hook_queue.request_preempt();
            }
        });

        assert_eq!(ctrl.rotate(PI, "map"), PhaseOutcome::Preempted);
        assert!(sim.last_cmd().is_stop());

        // The request appears during the sleep before the tick at t > 0.2,
        // which is the tick that stops
        assert!(ctrl.report().time_s < 0.2 + 0.021);
    }

    #[test]
    fn test_rotate_oscillation_limit() {
        // A tolerance the discrete turn steps cannot meet, so the heading error
        // keeps flipping sign about the target
        let (sim, _queue, mut ctrl) = sim_ctrl(SimWorld::default());
        let mut params = Params::default();
        params.angular_tolerance = 1e-9;
        ctrl.config.publish(params.clone()).unwrap();

        assert_eq!(ctrl.rotate(1.037, "map"), PhaseOutcome::Completed);
        assert_eq!(ctrl.report().oscillations, params.max_oscillations + 1);
        assert!(sim.last_cmd().is_stop());
        assert!((sim.robot_pose().heading_rad - 1.037).abs() < 0.1);
    }

    #[test]
    fn test_rotate_pose_lost() {
        let (sim, _queue, mut ctrl) = sim_ctrl(SimWorld::default());
        sim.set_map_available(false);

        assert!(matches!(
            ctrl.rotate(1.0, "map"),
            PhaseOutcome::Failed(MotionCtrlError::FrameUnavailable(_))
        ));
        assert!(sim.last_cmd().is_stop());
    }

    #[test]
    fn test_rotate_with_obstacle_nearby() {
        // Within reach of the back of the footprint while turning left
        let mut world = SimWorld::default();
        world.points.push(Point2::new(-0.15, 0.12));
        let (sim, _queue, mut ctrl) = sim_ctrl(world);

        assert_eq!(ctrl.rotate(1.0, "map"), PhaseOutcome::Completed);
        assert!(sim
            .cmd_history()
            .iter()
            .all(|c| c.angular_rads.abs() <= 2.0));
    }
}
