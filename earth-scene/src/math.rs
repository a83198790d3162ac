use std::f64::consts::{PI, TAU};

pub const EPSILON1: f64 = 0.1;
pub const EPSILON7: f64 = 0.0000001;
pub const EPSILON9: f64 = 0.000000001;
pub const EPSILON10: f64 = 0.0000000001;
pub const EPSILON12: f64 = 0.000000000001;
pub const EPSILON14: f64 = 0.00000000000001;
pub const EPSILON15: f64 = 0.000000000000001;

/// Compares two scalars using an absolute tolerance, falling back to a
/// tolerance relative to the larger magnitude. `absolute_epsilon` defaults to
/// `relative_epsilon`.
pub fn equals_epsilon(
    left: f64,
    right: f64,
    relative_epsilon: Option<f64>,
    absolute_epsilon: Option<f64>,
) -> bool {
    let relative_epsilon = relative_epsilon.unwrap_or(0.0);
    let absolute_epsilon = absolute_epsilon.unwrap_or(relative_epsilon);
    let absolute_difference = (left - right).abs();
    return absolute_difference <= absolute_epsilon
        || absolute_difference <= relative_epsilon * left.abs().max(right.abs());
}

/// Remainder that always carries the sign of `n`.
pub fn mod_value(m: f64, n: f64) -> f64 {
    if m.signum() == n.signum() && m.abs() < n.abs() {
        return m;
    }
    return ((m % n) + n) % n;
}

/// Reduces an angle to `[0, 2π]`. A non-zero angle whose residue is within
/// `EPSILON14` of zero maps to `2π` rather than `0`.
pub fn zero_to_two_pi(angle: f64) -> f64 {
    if angle >= 0. && angle <= TAU {
        return angle;
    }
    let mode = mod_value(angle, TAU);
    if mode.abs() < EPSILON14 && angle.abs() > EPSILON14 {
        return TAU;
    }
    return mode;
}

/// Reduces an angle to `[-π, π]`.
pub fn negative_pi_to_pi(angle: f64) -> f64 {
    if angle >= -PI && angle <= PI {
        return angle;
    }
    return zero_to_two_pi(angle + PI) - PI;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_to_two_pi_keeps_full_turns() {
        assert_eq!(zero_to_two_pi(0.0), 0.0);
        assert!(equals_epsilon(zero_to_two_pi(-TAU), TAU, Some(EPSILON14), None));
        assert!(equals_epsilon(zero_to_two_pi(3.0 * TAU), TAU, Some(EPSILON14), None));
        assert!(equals_epsilon(zero_to_two_pi(-PI / 2.0), 1.5 * PI, Some(EPSILON14), None));
    }

    #[test]
    fn negative_pi_to_pi_wraps() {
        assert_eq!(negative_pi_to_pi(PI), PI);
        assert!(equals_epsilon(negative_pi_to_pi(1.5 * PI), -0.5 * PI, Some(EPSILON14), None));
        assert!(equals_epsilon(negative_pi_to_pi(-1.5 * PI), 0.5 * PI, Some(EPSILON14), None));
        assert!(equals_epsilon(negative_pi_to_pi(3.0 * PI), PI, Some(EPSILON14), None));
    }

    #[test]
    fn equals_epsilon_relative_and_absolute() {
        assert!(equals_epsilon(1.0, 1.0 + 1e-12, Some(EPSILON10), None));
        assert!(!equals_epsilon(1.0, 1.1, Some(EPSILON10), None));
        assert!(equals_epsilon(6378137.0, 6378137.0001, Some(EPSILON10), None));
        assert!(equals_epsilon(0.0, 0.05, Some(0.0), Some(EPSILON1)));
    }
}
