//! Rotation (turn on the spot) margin calculation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use std::f64::consts::PI;
use util::maths::normalize_angle;

// Internal
use super::*;
use crate::obstacles::ObstacleSnapshot;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CollisionChecker {
    /// Find the angle the robot can turn on the spot in the given direction
    /// before one of the footprint edges meets an obstacle point.
    ///
    /// Each point is put in polar form about the origin, and the intersections
    /// of its circle with the four footprint edges are found. The rotation
    /// needed to bring the point onto each intersection is a candidate. Only
    /// points are considered, segments are ignored. Returns `PI` when nothing
    /// constrains the turn.
    pub fn obstacle_rotation_margin(
        &self,
        direction: RotationDirection,
        obstacles: &ObstacleSnapshot,
    ) -> f64 {
        let fp = &self.footprint;
        let left = direction == RotationDirection::Left;
        let mut min_angle = PI;

        for p in &obstacles.points {
            let (x, y) = (p.x, p.y);

            // Initial orientation wrt the base frame
            let theta = y.atan2(x);
            let r_sq = x * x + y * y;

            // Outside the circle enclosing the footprint nothing can be hit
            if r_sq > fp.max_diag() {
                continue;
            }

            // Left and right sides:
            //   y = +-width, -back_length <= x <= front_length
            if fp.width_sq <= r_sq {
                let xi = (r_sq - fp.width_sq).sqrt();
                for &xe in &[xi, -xi] {
                    if -fp.back_length <= xe && xe <= fp.front_length {
                        check_angle(theta, xe, fp.width, left, &mut min_angle);
                        check_angle(theta, xe, -fp.width, left, &mut min_angle);
                    }
                }
            }

            // Back edge:
            //   x = -back_length, -width <= y <= width
            if x < 0.0 && fp.back_length_sq <= r_sq {
                let yi = (r_sq - fp.back_length_sq).sqrt();
                if yi <= fp.width {
                    check_angle(theta, -fp.back_length, yi, left, &mut min_angle);
                    check_angle(theta, -fp.back_length, -yi, left, &mut min_angle);
                }
            }

            // Front edge:
            //   x = front_length, -width <= y <= width
            if x > 0.0 && r_sq <= fp.front_diag && fp.front_length_sq <= r_sq {
                let yi = (r_sq - fp.front_length_sq).sqrt();
                if yi <= fp.width {
                    check_angle(theta, fp.front_length, yi, left, &mut min_angle);
                    check_angle(theta, fp.front_length, -yi, left, &mut min_angle);
                }
            }
        }

        trace!("Rotation margin {:?}: {:.1} deg", direction, min_angle.to_degrees());

        min_angle
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Rotation needed to move a point at polar angle `theta` onto the footprint
/// point `(x, y)`, keeping it if it is the smallest in the turn direction.
fn check_angle(theta: f64, x: f64, y: f64, left: bool, min_angle: &mut f64) {
    let theta_int = normalize_angle(theta - y.atan2(x));

    if left && theta_int > 0.0 && theta_int < *min_angle {
        *min_angle = theta_int;
    }
    if !left && theta_int < 0.0 && -theta_int < *min_angle {
        *min_angle = -theta_int;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::collision::test::default_checker;
    use nalgebra::Point2;

    fn points(pts: &[(f64, f64)]) -> ObstacleSnapshot {
        ObstacleSnapshot {
            points: pts.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            segments: vec![],
        }
    }

    #[test]
    fn test_unconstrained() {
        let cc = default_checker();

        assert_eq!(
            cc.obstacle_rotation_margin(RotationDirection::Left, &ObstacleSnapshot::default()),
            PI
        );

        // Far away points can never be hit
        let far = points(&[(1.0, 0.0), (0.0, -2.0)]);
        assert_eq!(cc.obstacle_rotation_margin(RotationDirection::Right, &far), PI);
    }

    #[test]
    fn test_point_beside_back_corner() {
        let cc = default_checker();

        // A point just off the left side, towards the back. Turning left
        // swings the left side away from it and the right side would need
        // more than half a turn to reach it, so only a right turn is limited.
        let obs = points(&[(-0.15, 0.1)]);
        let left = cc.obstacle_rotation_margin(RotationDirection::Left, &obs);
        let right = cc.obstacle_rotation_margin(RotationDirection::Right, &obs);

        assert_eq!(left, PI);
        assert!(right > 0.0 && right < PI);

        // Turning right brings the left side onto it almost immediately
        let r_sq: f64 = 0.15 * 0.15 + 0.1 * 0.1;
        let xi = (r_sq - 0.08 * 0.08).sqrt();
        let expected = (0.08f64).atan2(-xi) - (0.1f64).atan2(-0.15);
        assert!((right - expected).abs() < 1e-9, "{} != {}", right, expected);
    }

    #[test]
    fn test_front_edge() {
        let cc = default_checker();

        // Point just ahead of the front edge on the centreline, turning either
        // way brings a front corner round to it.
        let obs = points(&[(0.1, 0.0)]);
        let left = cc.obstacle_rotation_margin(RotationDirection::Left, &obs);
        let yi = (0.1f64 * 0.1 - 0.09 * 0.09).sqrt();
        let expected = (yi).atan2(0.09);
        assert!((left - expected).abs() < 1e-9);
    }

    #[test]
    fn test_symmetry() {
        let cc = default_checker();

        for &(x, y) in &[(-0.15, 0.1), (0.1, 0.03), (-0.2, 0.0), (0.05, 0.1)] {
            let obs = points(&[(x, y), (x, -y)]);
            let left = cc.obstacle_rotation_margin(RotationDirection::Left, &obs);
            let right = cc.obstacle_rotation_margin(RotationDirection::Right, &obs);
            assert!((left - right).abs() < 1e-9, "({}, {}): {} != {}", x, y, left, right);
        }
    }
}
