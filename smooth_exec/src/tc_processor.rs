//! # Telecommand processor module
//!
//! The telecommand processor handles TCs coming from any source, forwarding
//! them to the goal queue, the force-stop flag or the configuration slot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use thiserror::Error;

// Internal
use crate::{
    goal::GoalQueue,
    motion_ctrl::{ConfigSlot, Params, ParamsError},
};
use comms_if::tc::{goal::GoalCmd, ForceStopCmd, Tc, TcParseError, TcType};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything a telecommand can act upon.
#[derive(Clone)]
pub struct TcTargets {
    pub goals: Arc<GoalQueue>,
    pub config: Arc<ConfigSlot>,
    pub force_stop: Arc<AtomicBool>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TcProcessError {
    #[error("Invalid TC: {0}")]
    Parse(#[from] TcParseError),

    #[error("Configuration rejected: {0}")]
    Reconfigure(#[from] ParamsError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
pub fn exec(targets: &TcTargets, tc: &Tc) -> Result<(), TcProcessError> {
    match tc.tc_type {
        TcType::None => {
            debug!("Recieved empty TC");
        }
        TcType::Goal => {
            let cmd: GoalCmd = tc.parse_payload()?;
            let id = targets.goals.submit(&cmd);
            info!(
                "Goal {} received: ({:.3}, {:.3}) in {}",
                id, cmd.position_m[0], cmd.position_m[1], cmd.frame_id
            );
        }
        TcType::Cancel => {
            info!("Cancel requested");
            targets.goals.request_preempt();
        }
        TcType::ForceStop => {
            let cmd: ForceStopCmd = tc.parse_payload()?;
            if cmd.stop {
                warn!("Force stop engaged");
            } else {
                info!("Force stop released");
            }
            targets.force_stop.store(cmd.stop, Ordering::SeqCst);
        }
        TcType::Reconfigure => {
            let params: Params = tc.parse_payload()?;
            targets.config.publish(params)?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::goal::{GoalInterface, GoalStatus};

    fn targets() -> TcTargets {
        TcTargets {
            goals: Arc::new(GoalQueue::new()),
            config: Arc::new(ConfigSlot::new(Params::default()).unwrap()),
            force_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    fn run(targets: &TcTargets, json: &str) -> Result<(), TcProcessError> {
        exec(targets, &Tc::from_json(json).unwrap())
    }

    #[test]
    fn test_goal_and_cancel() {
        let t = targets();

        run(&t, r#"{"type": "GOAL", "payload": {"frame_id": "map", "position_m": [2.0, 0.0]}}"#)
            .unwrap();
        let goal = t.goals.accept_next().unwrap();
        assert_eq!(goal.id, 1);

        run(&t, r#"{"type": "CANCEL"}"#).unwrap();
        assert!(t.goals.is_preempt_requested());
        assert_eq!(t.goals.status(1), Some(GoalStatus::Active));
    }

    #[test]
    fn test_force_stop() {
        let t = targets();

        run(&t, r#"{"type": "STOP", "payload": {"stop": true}}"#).unwrap();
        assert!(t.force_stop.load(Ordering::SeqCst));

        run(&t, r#"{"type": "STOP", "payload": {"stop": false}}"#).unwrap();
        assert!(!t.force_stop.load(Ordering::SeqCst));
    }

    #[test]
    fn test_reconfigure() {
        let t = targets();

        run(
            &t,
            r#"{"type": "RECONFIG", "payload": {"max_linear_velocity": 0.3, "robot_width": 0.1}}"#,
        )
        .unwrap();
        let active = t.config.snapshot();
        assert_eq!(active.params.max_linear_velocity, 0.3);
        assert_eq!(active.checker.footprint().width(), 0.1);

        // Rejected, the previous configuration stays
        assert!(matches!(
            run(&t, r#"{"type": "RECONFIG", "payload": {"robot_width": -1.0}}"#),
            Err(TcProcessError::Reconfigure(_))
        ));
        assert_eq!(t.config.snapshot().params.max_linear_velocity, 0.3);

        assert!(matches!(
            run(&t, r#"{"type": "RECONFIG", "payload": {"max_linear_velocity": "fast"}}"#),
            Err(TcProcessError::Parse(_))
        ));
    }
}
