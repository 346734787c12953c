//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the closed range `[min, max]`.
///
/// `min` must not be greater than `max`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Returns true if `a` and `b` differ by strictly more than `tolerance`.
pub fn differs_by_more_than<T>(a: T, b: T, tolerance: T) -> bool
where
    T: Float
{
    (a - b).abs() > tolerance
}

/// Move `from` toward `to` by at most `max_step`, never passing `to`.
pub fn step_toward<T>(from: T, to: T, max_step: T) -> T
where
    T: Float
{
    from + clamp(to - from, -max_step.abs(), max_step.abs())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(0.5f64, 0.0, 1.0), 0.5);
        assert_eq!(clamp(2.0f64, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-2.0f64, -1.0, 1.0), -1.0);
    }

    #[test]
    fn test_differs_by_more_than() {
        assert!(!differs_by_more_than(5.0f64, 5.0, 1e-6));
        assert!(!differs_by_more_than(5.0f64, 5.0 + 1e-7, 1e-6));
        assert!(differs_by_more_than(5.0f64, 3.0, 1e-6));
    }

    #[test]
    fn test_step_toward() {
        assert_eq!(step_toward(0.0f64, 1.0, 0.25), 0.25);
        assert_eq!(step_toward(0.0f64, -1.0, 0.25), -0.25);
        assert_eq!(step_toward(0.9f64, 1.0, 0.25), 1.0);
        assert_eq!(step_toward(1.0f64, 1.0, 0.25), 1.0);
    }
}
