//! Motion control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use crate::collision::{CollisionError, CollisionParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for motion control.
///
/// Every field has a default, so parameter files and reconfiguration requests
/// only need to list what they change. The footprint parameters sit at the
/// same level as the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Footprint and obstacle query parameters
    #[serde(flatten)]
    pub collision: CollisionParams,

    /// Maximum turn rate in rad/s
    pub max_angular_velocity: f64,

    /// Maximum angular acceleration in rad/s^2
    pub max_angular_acceleration: f64,

    /// Maximum forward speed in m/s
    pub max_linear_velocity: f64,

    /// Maximum linear acceleration in m/s^2
    pub max_linear_acceleration: f64,

    /// Heading error under which a rotation is complete, in rad
    pub angular_tolerance: f64,

    /// Lateral controller proportional gain
    pub lateral_kp: f64,

    /// Lateral controller integral gain
    pub lateral_ki: f64,

    /// Lateral controller derivative gain
    pub lateral_kd: f64,

    /// Slope the robot can stand on without slipping, limits cornering speed
    pub max_incline_without_slipping: f64,

    /// Maximum deviation from the straight line to the goal, in m. Also the
    /// distance under which a goal is considered reached.
    pub max_lateral_deviation: f64,

    /// Side clearance under which a warning is raised, in m
    pub min_side_dist: f64,

    /// Forward clearance under which the robot waits, in m
    pub forward_obstacle_threshold: f64,

    /// How long the robot may move away from the goal before aborting, in s
    pub runaway_timeout: f64,

    /// Frame to drive in if available
    pub preferred_driving_frame: String,

    /// Frame to drive in otherwise
    pub alternate_driving_frame: String,

    /// Rate of the rotate control loop
    pub rotate_rate_hz: f64,

    /// Rate of the translate control loop
    pub translate_rate_hz: f64,

    /// Rate of the obstacle distance report loop
    pub report_rate_hz: f64,

    /// Number of heading error sign changes after which a rotation is
    /// considered complete
    pub max_oscillations: u32,

    /// Localisation noise tolerated before motion counts as moving away from
    /// the goal, in m
    pub localization_dev_m: f64,

    /// Gravitational acceleration in m/s^2
    pub gravity_mss: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParamsError {
    #[error("Parameter {0} must be finite and greater than zero, found {1}")]
    NotPositive(&'static str, f64),

    #[error("Parameter {0} must be finite, found {1}")]
    NotFinite(&'static str, f64),

    #[error("Parameter {0} must not be empty")]
    EmptyFrame(&'static str),

    #[error("Invalid footprint: {0}")]
    Footprint(#[from] CollisionError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            collision: CollisionParams::default(),
            max_angular_velocity: 2.0,
            max_angular_acceleration: 5.0,
            max_linear_velocity: 0.5,
            max_linear_acceleration: 1.1,
            angular_tolerance: 0.1,
            lateral_kp: 0.5,
            lateral_ki: 0.0,
            lateral_kd: 3.0,
            max_incline_without_slipping: 0.01,
            max_lateral_deviation: 1.0,
            min_side_dist: 0.3,
            forward_obstacle_threshold: 0.5,
            runaway_timeout: 1.0,
            preferred_driving_frame: String::from("map"),
            alternate_driving_frame: String::from("odom"),
            rotate_rate_hz: 50.0,
            translate_rate_hz: 50.0,
            report_rate_hz: 20.0,
            max_oscillations: 2,
            localization_dev_m: 0.02,
            gravity_mss: 9.81,
        }
    }
}

impl Params {
    /// Check the parameters are usable. The footprint itself is checked when
    /// building the collision checker.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let positive = [
            ("max_angular_velocity", self.max_angular_velocity),
            ("max_angular_acceleration", self.max_angular_acceleration),
            ("max_linear_velocity", self.max_linear_velocity),
            ("max_linear_acceleration", self.max_linear_acceleration),
            ("angular_tolerance", self.angular_tolerance),
            ("max_lateral_deviation", self.max_lateral_deviation),
            ("runaway_timeout", self.runaway_timeout),
            ("rotate_rate_hz", self.rotate_rate_hz),
            ("translate_rate_hz", self.translate_rate_hz),
            ("report_rate_hz", self.report_rate_hz),
            ("gravity_mss", self.gravity_mss),
            ("max_age", self.collision.max_age),
        ];
        for &(name, val) in positive.iter() {
            if !val.is_finite() || val <= 0.0 {
                return Err(ParamsError::NotPositive(name, val));
            }
        }

        let finite = [
            ("lateral_kp", self.lateral_kp),
            ("lateral_ki", self.lateral_ki),
            ("lateral_kd", self.lateral_kd),
            ("max_incline_without_slipping", self.max_incline_without_slipping),
            ("min_side_dist", self.min_side_dist),
            ("forward_obstacle_threshold", self.forward_obstacle_threshold),
            ("localization_dev_m", self.localization_dev_m),
        ];
        for &(name, val) in finite.iter() {
            if !val.is_finite() {
                return Err(ParamsError::NotFinite(name, val));
            }
        }

        let frames = [
            ("preferred_driving_frame", &self.preferred_driving_frame),
            ("alternate_driving_frame", &self.alternate_driving_frame),
            ("base_frame", &self.collision.base_frame),
        ];
        for &(name, frame) in frames.iter() {
            if frame.is_empty() {
                return Err(ParamsError::EmptyFrame(name));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_toml() {
        let params: Params = util::params::load_str(
            r#"
            max_linear_velocity = 0.3
            robot_width = 0.2
            preferred_driving_frame = "world"
            "#,
        )
        .unwrap();

        assert_eq!(params.max_linear_velocity, 0.3);
        assert_eq!(params.collision.robot_width, 0.2);
        assert_eq!(params.preferred_driving_frame, "world");

        // Everything else is defaulted
        assert_eq!(params.max_angular_velocity, 2.0);
        assert_eq!(params.collision.robot_back_length, 0.19);
        assert_eq!(params.collision.base_frame, "base_link");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(Params::default().validate().is_ok());

        let mut p = Params::default();
        p.max_linear_velocity = 0.0;
        assert_eq!(
            p.validate(),
            Err(ParamsError::NotPositive("max_linear_velocity", 0.0))
        );

        let mut p = Params::default();
        p.lateral_kd = f64::INFINITY;
        assert!(matches!(p.validate(), Err(ParamsError::NotFinite("lateral_kd", _))));

        let mut p = Params::default();
        p.alternate_driving_frame.clear();
        assert_eq!(p.validate(), Err(ParamsError::EmptyFrame("alternate_driving_frame")));
    }
}
