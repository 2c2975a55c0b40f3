//! Deterministic float ordering.
//!
//! Sorting and tie-breaking on `f64` must not depend on the sign of zero or on
//! which NaN payload happened to be produced.

use core::cmp::Ordering;

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        // Handles +0.0 and -0.0.
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
///
/// Prefer this any time you sort floats or use them in ordered keys.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// Wrap `value` into `[-half_period, half_period)`.
pub fn wrap_symmetric(value: f64, half_period: f64) -> f64 {
    let period = 2.0 * half_period;
    (value + half_period).rem_euclid(period) - half_period
}

#[cfg(test)]
mod tests {
    use super::{canonical_f64, stable_total_cmp_f64, wrap_symmetric};
    use core::cmp::Ordering;

    #[test]
    fn canonicalizes_negative_zero() {
        assert_eq!(canonical_f64(-0.0), 0.0);
        assert_eq!(stable_total_cmp_f64(-0.0, 0.0), Ordering::Equal);
    }

    #[test]
    fn stable_cmp_is_total() {
        assert_eq!(stable_total_cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(f64::NAN, f64::NAN), Ordering::Equal);
    }

    #[test]
    fn wraps_longitudes() {
        assert_eq!(wrap_symmetric(190.0, 180.0), -170.0);
        assert_eq!(wrap_symmetric(-190.0, 180.0), 170.0);
        assert_eq!(wrap_symmetric(180.0, 180.0), -180.0);
        assert_eq!(wrap_symmetric(45.0, 180.0), 45.0);
        assert_eq!(wrap_symmetric(720.0 + 20.0, 180.0), 20.0);
    }
}
