//! Arc margin calculation
//!
//! Only the swing of the leading corner of the footprint is predicted. The
//! trailing corner swinging out on the other side of the turn and obstacle
//! segments crossing the arc are not taken into account, so the result is a
//! best-effort estimate and must not be relied on for stopping.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Point2, Vector2};
use std::f64::consts::PI;
use util::maths::{map_pi_to_2pi, normalize_angle};

// Internal
use super::*;
use crate::obstacles::ObstacleSnapshot;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CollisionChecker {
    /// Find the angle the robot can travel along the arc given by the linear
    /// and angular velocities before an obstacle point enters the swept
    /// annulus ahead of it.
    ///
    /// The centre of rotation is at `(0, +-radius)`. A point matters if its
    /// distance to the centre lies between the distances of the inner front
    /// corner and the outer back corner. The smallest angle between the outer
    /// corner and such a point, measured in the direction of the sweep, is
    /// returned. Returns `PI` if nothing is found or the motion is not an arc.
    ///
    /// Only the leading corner is swept. The trailing side of the footprint
    /// swinging out is not checked.
    pub fn obstacle_arc_margin(
        &self,
        linear_ms: f64,
        angular_rads: f64,
        obstacles: &ObstacleSnapshot,
    ) -> f64 {
        let fp = &self.footprint;

        let radius = (linear_ms / angular_rads).abs();
        if angular_rads == 0.0 || !radius.is_finite() {
            return PI;
        }

        let forward = linear_ms >= 0.0;
        let left = angular_rads >= 0.0;
        let side = if left { 1.0 } else { -1.0 };

        // Point of rotation relative to the base frame
        let centre = Vector2::new(0.0, side * radius);

        // Critical corners relative to the point of rotation
        let outer = Point2::new(-fp.back_length, -side * fp.width) - centre;
        let inner = Point2::new(fp.front_length, side * fp.width) - centre;

        let outer_r_sq = outer.coords.norm_squared();
        let outer_theta = outer.y.atan2(outer.x);
        let inner_r_sq = inner.coords.norm_squared();

        // The robot sweeps anticlockwise about the centre when driving
        // forwards round a left turn or backwards round a right one
        let anticlockwise = forward == left;

        let mut closest = PI;

        for p in &obstacles.points {
            let rel = *p - centre;
            let r_sq = rel.coords.norm_squared();

            if r_sq <= inner_r_sq || r_sq >= outer_r_sq {
                continue;
            }

            let theta = rel.y.atan2(rel.x);
            let offset = if anticlockwise {
                map_pi_to_2pi(normalize_angle(theta - outer_theta))
            } else {
                map_pi_to_2pi(normalize_angle(outer_theta - theta))
            };

            if offset < closest {
                closest = offset;
            }
        }

        trace!(
            "Arc margin (v {:.2} m/s, w {:.2} rad/s, r {:.2} m): {:.1} deg",
            linear_ms,
            angular_rads,
            radius,
            closest.to_degrees()
        );

        closest
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::collision::test::default_checker;

    fn points(pts: &[(f64, f64)]) -> ObstacleSnapshot {
        ObstacleSnapshot {
            points: pts.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            segments: vec![],
        }
    }

    #[test]
    fn test_not_an_arc() {
        let cc = default_checker();
        let obs = points(&[(0.5, 0.0)]);
        assert_eq!(cc.obstacle_arc_margin(0.5, 0.0, &obs), PI);
        assert_eq!(cc.obstacle_arc_margin(0.5, 1.0, &ObstacleSnapshot::default()), PI);
    }

    #[test]
    fn test_point_on_left_arc() {
        let cc = default_checker();

        // Radius 1 m left turn, point a quarter turn round the circle
        let obs = points(&[(1.0, 1.0)]);
        let margin = cc.obstacle_arc_margin(0.5, 0.5, &obs);

        let outer_theta = (-1.08f64).atan2(-0.19);
        assert!((margin - (0.0 - outer_theta)).abs() < 1e-9);

        // The mirrored right turn gives the same margin
        let obs = points(&[(1.0, -1.0)]);
        let mirrored = cc.obstacle_arc_margin(0.5, -0.5, &obs);
        assert!((margin - mirrored).abs() < 1e-9);
    }

    #[test]
    fn test_points_off_the_arc_ignored() {
        let cc = default_checker();

        // Inside the inner radius and well outside the outer radius
        let obs = points(&[(0.0, 0.5), (2.0, 0.0)]);
        assert_eq!(cc.obstacle_arc_margin(0.5, 0.5, &obs), PI);

        // On the arc but behind the robot
        let obs = points(&[(-1.0, 1.0)]);
        assert_eq!(cc.obstacle_arc_margin(0.5, 0.5, &obs), PI);
    }

    #[test]
    fn test_reversing_sweeps_the_other_way() {
        let cc = default_checker();

        // Behind the robot on a left arc is ahead when reversing
        let obs = points(&[(-1.0, 1.0)]);
        let margin = cc.obstacle_arc_margin(-0.5, 0.5, &obs);
        assert!(margin > 0.0 && margin < PI);
    }
}
