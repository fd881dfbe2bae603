//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range (-pi, pi].
///
/// Angles already inside the range are returned untouched, so applying this
/// function twice gives the same result as applying it once. Non-finite
/// angles are passed through as NaN.
pub fn normalize_angle<T>(angle: T) -> T
where
    T: Float
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::nan);
    let tau_t = pi_t + pi_t;

    if angle > -pi_t && angle <= pi_t {
        return angle
    }

    let wrapped = pi_t - rem_euclid(pi_t - angle, tau_t);

    // Round-off in rem_euclid can land exactly on -pi
    if wrapped <= -pi_t {
        pi_t
    }
    else {
        wrapped
    }
}

/// Map a value in the range [-pi, pi] to [0, 2pi]
pub fn map_pi_to_2pi<T>(value: T) -> T 
where
    T: Float
{
    let tau_t = T::from(std::f64::consts::TAU).unwrap_or_else(T::nan);

    if value < T::zero() {
        tau_t + value
    }
    else {
        value
    }
}

/// Sign of a number where zero counts as positive, returning either -1 or 1.
pub fn sign<T>(value: T) -> T
where
    T: Float
{
    if value < T::zero() { -T::one() } else { T::one() }
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;
    const TAU: f64 = std::f64::consts::TAU;

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(0.5f64), 0.5);
        assert_eq!(normalize_angle(PI), PI);
        assert_eq!(normalize_angle(-PI), PI);
        assert!((normalize_angle(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
        assert!((normalize_angle(-1.5 * PI) - 0.5 * PI).abs() < 1e-12);
        assert!((normalize_angle(7.0 * TAU + 0.25) - 0.25).abs() < 1e-9);
        assert!(normalize_angle(f64::NAN).is_nan());

        // Always in range and idempotent
        let mut a = -20.0f64;
        while a < 20.0 {
            let n = normalize_angle(a);
            assert!(n > -PI && n <= PI, "{} -> {}", a, n);
            assert_eq!(normalize_angle(n), n);
            a += 0.173;
        }
    }

    #[test]
    fn test_map_pi_to_2pi() {
        assert_eq!(map_pi_to_2pi(1f64), 1f64);
        assert!((map_pi_to_2pi(-1f64) - (TAU - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(-0.1f64), -1.0);
        assert_eq!(sign(0f64), 1.0);
        assert_eq!(sign(3f64), 1.0);
    }
}
