//! Angle utilities shared by every subsystem.
//!
//! Headings are canonical in (-π, π]. Canonicalization goes through
//! `atan2(sin, cos)` rather than arithmetic wrapping; wrapped arithmetic
//! accumulates drift once an angle passes through several subsystems in a
//! single control tick.

/// Reduce an angle to the canonical range (-π, π].
///
/// Idempotent: `canonicalize_angle(canonicalize_angle(a)) == canonicalize_angle(a)`.
#[inline]
pub fn canonicalize_angle(angle: f32) -> f32 {
    angle.sin().atan2(angle.cos())
}

/// Signed shortest rotation from angle `a` to angle `b`.
///
/// Returns the angle to add to `a` to reach `b`, taking the short way
/// around the circle.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    canonicalize_angle(b - a)
}

/// Interpolate between two angles along the shortest arc.
///
/// `t` in [0, 1] where 0 returns `a` and 1 returns `b`.
#[inline]
pub fn angle_lerp(a: f32, b: f32, t: f32) -> f32 {
    canonicalize_angle(a + angle_diff(a, b) * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_canonicalize_zero() {
        assert_relative_eq!(canonicalize_angle(0.0), 0.0);
    }

    #[test]
    fn test_canonicalize_in_range_unchanged() {
        assert_relative_eq!(canonicalize_angle(1.0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(canonicalize_angle(-1.0), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_canonicalize_wraps_full_turns() {
        assert_relative_eq!(canonicalize_angle(2.0 * PI), 0.0, epsilon = 1e-5);
        assert_relative_eq!(canonicalize_angle(-2.0 * PI), 0.0, epsilon = 1e-5);
        // 3π is equivalent to π; floating sin/cos may land on either sign
        // of the boundary, so compare magnitudes.
        assert_relative_eq!(canonicalize_angle(3.0 * PI).abs(), PI, epsilon = 1e-5);
    }

    #[test]
    fn test_canonicalize_idempotent() {
        for &a in &[0.0, 0.7, -2.9, 3.0 * PI, -5.5 * PI, 100.0] {
            let once = canonicalize_angle(a);
            let twice = canonicalize_angle(once);
            assert_relative_eq!(once, twice, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_angle_diff_simple() {
        assert_relative_eq!(angle_diff(0.0, PI / 2.0), PI / 2.0, epsilon = 1e-6);
        assert_relative_eq!(angle_diff(PI / 2.0, 0.0), -PI / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_angle_diff_crossing_pi() {
        // Crossing the ±π boundary takes the short way.
        assert_relative_eq!(angle_diff(PI - 0.1, -PI + 0.1), 0.2, epsilon = 1e-5);
        assert_relative_eq!(angle_diff(-PI + 0.1, PI - 0.1), -0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_angle_lerp_shortest_arc() {
        assert_relative_eq!(angle_lerp(0.0, PI / 2.0, 0.5), PI / 4.0, epsilon = 1e-6);
        let mid = angle_lerp(PI - 0.1, -PI + 0.1, 0.5);
        assert!(mid.abs() > PI - 0.05, "lerp should cross the boundary: {}", mid);
    }

    #[test]
    fn test_canonicalize_nan_propagates() {
        assert!(canonicalize_angle(f32::NAN).is_nan());
    }
}
