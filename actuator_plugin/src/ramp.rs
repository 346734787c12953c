//! # Velocity ramp
//!
//! Limits how quickly the instructed surface speed of the actuator may change.

use serde::Serialize;
use util::maths;

/// Speed difference below which the target is considered reached.
///
/// Units: meters/second
pub const SPEED_EPSILON_MS: f64 = 0.01;

/// Acceleration-limited ramp of the instructed surface speed toward a target.
///
/// The only state carried between ticks is the previously instructed speed.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct VelocityRamp {
    /// Acceleration limit, zero disables the ramp.
    ///
    /// Units: meters/second^2
    accel_limit_ms2: f64,

    /// Speed instructed on the previous tick.
    ///
    /// Units: meters/second
    instructed_ms: f64,
}

impl VelocityRamp {
    pub fn new(accel_limit_ms2: f64) -> Self {
        Self {
            accel_limit_ms2,
            instructed_ms: 0.0,
        }
    }

    /// The speed instructed on the most recent call to [`VelocityRamp::update`].
    pub fn instructed_ms(&self) -> f64 {
        self.instructed_ms
    }

    /// Forget the previously instructed speed.
    pub fn reset(&mut self) {
        self.instructed_ms = 0.0;
    }

    /// Compute the speed to instruct this tick.
    ///
    /// If ramping is disabled, or the measured speed is already within [`SPEED_EPSILON_MS`] of the
    /// target, the target is instructed directly. Otherwise the previously instructed speed is
    /// moved toward the target by at most `accel_limit * elapsed_s`.
    pub fn update(&mut self, target_ms: f64, measured_ms: f64, elapsed_s: f64) -> f64 {
        self.instructed_ms = next_instructed_speed(
            target_ms,
            measured_ms,
            self.instructed_ms,
            self.accel_limit_ms2,
            elapsed_s
        );

        self.instructed_ms
    }
}

/// Pure form of the ramp step.
///
/// The epsilon is absolute, so it is coarse for very slow actuators and fine for very fast ones.
pub fn next_instructed_speed(
    target_ms: f64,
    measured_ms: f64,
    prev_instructed_ms: f64,
    accel_limit_ms2: f64,
    elapsed_s: f64
) -> f64 {
    if accel_limit_ms2 == 0.0 || (target_ms - measured_ms).abs() < SPEED_EPSILON_MS {
        return target_ms
    }

    maths::step_toward(prev_instructed_ms, target_ms, accel_limit_ms2 * elapsed_s)
}
