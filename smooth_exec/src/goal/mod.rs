//! # Goal module
//!
//! Goals are planar target poses expressed in a named frame. The motion
//! controller talks to whatever accepts and queues goals through the
//! `GoalInterface` trait. `GoalQueue` implements it with one executing goal and
//! at most one goal waiting behind it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod queue;
pub use queue::{GoalQueue, GoalRecord, GoalStatus};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Quaternion, UnitQuaternion};
use serde::Serialize;

use comms_if::tc::goal::GoalCmd;

use crate::loc::Pose;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The goal signalling capabilities the controller relies on.
///
/// The controller only ever polls these, once per control tick, and reports
/// the outcome of each goal exactly once.
pub trait GoalInterface: Send + Sync {
    /// A goal is waiting behind the one being executed.
    fn is_new_goal_available(&self) -> bool;

    /// Someone asked for the executing goal to be stopped.
    fn is_preempt_requested(&self) -> bool;

    /// The goal waiting behind the executing one, if any.
    fn queued_goal(&self) -> Option<Goal>;

    fn set_succeeded(&self);

    fn set_aborted(&self, reason: &str);

    fn set_preempted(&self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A navigation goal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Goal {
    /// Identifier assigned when the goal was submitted
    pub id: u64,

    /// Frame the pose is expressed in, without any leading `/`
    pub frame_id: String,

    /// Target pose in `frame_id`. The heading is NaN if the submitted
    /// orientation was not a valid rotation.
    pub pose: Pose,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Goal {
    /// Build a goal from a submitted goal command.
    pub fn from_cmd(id: u64, cmd: &GoalCmd) -> Self {
        let frame_id = cmd.frame_id.trim_start_matches('/').to_string();

        let [qx, qy, qz, qw] = cmd.orientation_q;
        let q = Quaternion::new(qw, qx, qy, qz);

        // A zero quaternion cannot be normalised
        let yaw = if q.norm() > 0.0 && q.norm().is_finite() {
            UnitQuaternion::from_quaternion(q).euler_angles().2
        } else {
            std::f64::NAN
        };

        Self {
            id,
            frame_id,
            pose: Pose::new(cmd.position_m[0], cmd.position_m[1], yaw),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_cmd() {
        let cmd = GoalCmd::from_yaw("/map", 1.0, 2.0, 0.5);
        let goal = Goal::from_cmd(7, &cmd);

        assert_eq!(goal.id, 7);
        assert_eq!(goal.frame_id, "map");
        assert_eq!(goal.pose.position_m[0], 1.0);
        assert!((goal.pose.heading_rad - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_orientation() {
        let mut cmd = GoalCmd::from_yaw("odom", 1.0, 0.0, 0.0);
        cmd.orientation_q = [0.0, 0.0, 0.0, 0.0];
        assert!(Goal::from_cmd(1, &cmd).pose.heading_rad.is_nan());

        cmd.orientation_q = [0.0, 0.0, std::f64::NAN, 1.0];
        assert!(!Goal::from_cmd(1, &cmd).pose.is_finite());
    }
}
