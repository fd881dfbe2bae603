//! Hot-swappable configuration
//!
//! The reconfiguration channel publishes complete parameter sets into a
//! `ConfigSlot`. Control ticks take a snapshot once at their start and use it
//! for the whole tick, so a new configuration is only ever seen between ticks
//! and never half applied.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use std::sync::{Arc, PoisonError, RwLock};

use super::params::{Params, ParamsError};
use crate::collision::CollisionChecker;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A validated configuration together with the collision checker built from
/// it.
#[derive(Debug, Clone)]
pub struct ActiveConfig {
    pub params: Params,
    pub checker: CollisionChecker,
}

/// Shared slot holding the active configuration.
#[derive(Debug)]
pub struct ConfigSlot {
    active: RwLock<Arc<ActiveConfig>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ActiveConfig {
    pub fn new(params: Params) -> Result<Self, ParamsError> {
        params.validate()?;
        let checker = CollisionChecker::new(&params.collision)?;

        Ok(Self { params, checker })
    }
}

impl ConfigSlot {
    pub fn new(params: Params) -> Result<Self, ParamsError> {
        Ok(Self {
            active: RwLock::new(Arc::new(ActiveConfig::new(params)?)),
        })
    }

    /// Replace the active configuration. Invalid parameters are rejected and
    /// the previous configuration stays active.
    pub fn publish(&self, params: Params) -> Result<(), ParamsError> {
        let config = match ActiveConfig::new(params) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                warn!("Rejected configuration change: {}", e);
                return Err(e);
            }
        };

        *self.active.write().unwrap_or_else(PoisonError::into_inner) = config;
        info!("Configuration change applied");

        Ok(())
    }

    /// The configuration to use for one tick.
    pub fn snapshot(&self) -> Arc<ActiveConfig> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_publish_and_snapshot() {
        let slot = ConfigSlot::new(Params::default()).unwrap();
        let before = slot.snapshot();

        let mut p = Params::default();
        p.max_linear_velocity = 0.25;
        p.collision.robot_width = 0.2;
        slot.publish(p).unwrap();

        // Snapshots already taken are unaffected
        assert_eq!(before.params.max_linear_velocity, 0.5);

        let after = slot.snapshot();
        assert_eq!(after.params.max_linear_velocity, 0.25);
        assert_eq!(after.checker.footprint().width(), 0.2);
    }

    #[test]
    fn test_invalid_rejected() {
        let slot = ConfigSlot::new(Params::default()).unwrap();

        let mut p = Params::default();
        p.collision.robot_front_length = -0.1;
        assert!(matches!(slot.publish(p), Err(ParamsError::Footprint(_))));

        let mut p = Params::default();
        p.translate_rate_hz = 0.0;
        assert!(slot.publish(p).is_err());

        assert_eq!(slot.snapshot().params, Params::default());
    }
}
