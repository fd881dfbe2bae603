//! Goal queue

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use comms_if::tc::goal::GoalCmd;

use super::{Goal, GoalInterface};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Single-slot goal queue shared between whoever submits goals and the
/// motion controller.
#[derive(Debug)]
pub struct GoalQueue {
    inner: Mutex<QueueState>,
}

/// Record of what happened to a goal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalRecord {
    pub id: u64,
    pub frame_id: String,
    pub position_m: [f64; 2],
    pub status: GoalStatus,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Id given to the next submitted goal
    next_id: u64,

    /// Goal being executed
    current: Option<Goal>,

    /// Goal waiting behind the current one
    pending: Option<Goal>,

    preempt_requested: bool,

    history: BTreeMap<u64, GoalRecord>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GoalStatus {
    /// Waiting to be executed
    Pending,

    /// Being executed
    Active,

    Succeeded,

    Aborted(String),

    /// Stopped on request while executing
    Preempted,

    /// Replaced or cancelled before it was executed
    Recalled,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GoalQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueState {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Submit a new goal, returning its id.
    ///
    /// The goal waits behind the executing one. A goal already waiting is
    /// recalled in favour of the new one.
    pub fn submit(&self, cmd: &GoalCmd) -> u64 {
        let mut state = self.lock();

        let id = state.next_id;
        state.next_id += 1;

        let goal = Goal::from_cmd(id, cmd);
        info!(
            "Goal {} submitted: ({:.3}, {:.3}, {:.1} deg) in \"{}\"",
            id,
            goal.pose.position_m[0],
            goal.pose.position_m[1],
            goal.pose.heading_rad.to_degrees(),
            goal.frame_id
        );

        state.history.insert(id, GoalRecord::new(&goal, GoalStatus::Pending));

        if let Some(old) = state.pending.replace(goal) {
            info!("Goal {} recalled, replaced by goal {}", old.id, id);
            state.set_status(old.id, GoalStatus::Recalled);
        }

        id
    }

    /// Ask for the executing goal to stop, and drop any waiting goal.
    pub fn request_preempt(&self) {
        let mut state = self.lock();

        if let Some(old) = state.pending.take() {
            state.set_status(old.id, GoalStatus::Recalled);
        }

        if state.current.is_some() {
            info!("Preempt requested");
            state.preempt_requested = true;
        }
    }

    /// Start executing the waiting goal, if there is one.
    pub fn accept_next(&self) -> Option<Goal> {
        let mut state = self.lock();

        let goal = state.pending.take()?;

        if let Some(old) = state.current.take() {
            warn!("Goal {} was never resolved, marking as aborted", old.id);
            state.set_status(old.id, GoalStatus::Aborted(String::from("Superseded")));
        }

        state.preempt_requested = false;
        state.set_status(goal.id, GoalStatus::Active);
        state.current = Some(goal.clone());

        Some(goal)
    }

    /// Id of the goal being executed.
    #[cfg(test)]
    pub(crate) fn current_id(&self) -> Option<u64> {
        self.lock().current.as_ref().map(|g| g.id)
    }

    pub fn status(&self, id: u64) -> Option<GoalStatus> {
        self.lock().history.get(&id).map(|r| r.status.clone())
    }

    /// Everything submitted so far, in submission order.
    pub fn history(&self) -> Vec<GoalRecord> {
        self.lock().history.values().cloned().collect()
    }

    /// Whether there is nothing executing or waiting.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.current.is_none() && state.pending.is_none()
    }

    fn lock(&self) -> MutexGuard<QueueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the executing goal with the given status.
    fn resolve(&self, status: GoalStatus) {
        let mut state = self.lock();

        match state.current.take() {
            Some(goal) => {
                state.preempt_requested = false;
                state.set_status(goal.id, status);
            }
            None => warn!("Attempted to set {:?} with no active goal", status),
        }
    }
}

impl Default for GoalQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalInterface for GoalQueue {
    fn is_new_goal_available(&self) -> bool {
        self.lock().pending.is_some()
    }

    fn is_preempt_requested(&self) -> bool {
        self.lock().preempt_requested
    }

    fn queued_goal(&self) -> Option<Goal> {
        self.lock().pending.clone()
    }

    fn set_succeeded(&self) {
        self.resolve(GoalStatus::Succeeded);
    }

    fn set_aborted(&self, reason: &str) {
        self.resolve(GoalStatus::Aborted(reason.to_string()));
    }

    fn set_preempted(&self) {
        self.resolve(GoalStatus::Preempted);
    }
}

impl QueueState {
    fn set_status(&mut self, id: u64, status: GoalStatus) {
        if let Some(rec) = self.history.get_mut(&id) {
            rec.status = status;
        }
    }
}

impl GoalRecord {
    fn new(goal: &Goal, status: GoalStatus) -> Self {
        Self {
            id: goal.id,
            frame_id: goal.frame_id.clone(),
            position_m: [goal.pose.position_m[0], goal.pose.position_m[1]],
            status,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn cmd(x: f64) -> GoalCmd {
        GoalCmd::from_yaw("map", x, 0.0, 0.0)
    }

    #[test]
    fn test_submit_accept_succeed() {
        let q = GoalQueue::new();
        assert!(q.is_idle());

        let id = q.submit(&cmd(1.0));
        assert_eq!(id, 1);
        assert!(q.is_new_goal_available());
        assert_eq!(q.queued_goal().map(|g| g.id), Some(1));

        let goal = q.accept_next().unwrap();
        assert_eq!(goal.id, 1);
        assert!(!q.is_new_goal_available());
        assert_eq!(q.status(1), Some(GoalStatus::Active));
        assert_eq!(q.current_id(), Some(1));

        q.set_succeeded();
        assert_eq!(q.status(1), Some(GoalStatus::Succeeded));
        assert!(q.is_idle());

        // Resolving twice does nothing
        q.set_aborted("late");
        assert_eq!(q.status(1), Some(GoalStatus::Succeeded));
    }

    #[test]
    fn test_pending_goal_recalled() {
        let q = GoalQueue::new();
        q.submit(&cmd(1.0));
        q.submit(&cmd(2.0));

        assert_eq!(q.status(1), Some(GoalStatus::Recalled));
        assert_eq!(q.accept_next().map(|g| g.id), Some(2));
        assert!(q.accept_next().is_none());
    }

    #[test]
    fn test_preempt() {
        let q = GoalQueue::new();

        // Nothing to preempt
        q.request_preempt();
        assert!(!q.is_preempt_requested());

        q.submit(&cmd(1.0));
        q.accept_next();
        q.submit(&cmd(2.0));
        q.request_preempt();

        assert!(q.is_preempt_requested());
        assert!(!q.is_new_goal_available());
        assert_eq!(q.status(2), Some(GoalStatus::Recalled));

        q.set_preempted();
        assert!(!q.is_preempt_requested());
        assert_eq!(q.status(1), Some(GoalStatus::Preempted));

        let hist = q.history();
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[1].position_m, [2.0, 0.0]);
    }
}
