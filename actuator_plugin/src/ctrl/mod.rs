//! Actuator control module
//!
//! Drives a single joint from the latest velocity command: ramps the instructed surface speed
//! under the acceleration limit, writes the resulting angular velocity setpoint to the joint, and
//! integrates encoder odometry when configured to.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use state::*;

use comms_if::msg::VelCmd;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Difference between the joint's reported max force and the configured torque beyond which the
/// torque is re-applied.
///
/// Units: newton meters
pub const TORQUE_DRIFT_TOLERANCE_NM: f64 = 1e-6;

/// Index of the actuated joint axis.
pub const JOINT_AXIS: usize = 0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The surface speed demanded by a command.
///
/// A single actuator cannot realise both components independently, so the yaw component is folded
/// into one scalar.
///
/// Units: meters/second
pub fn target_speed_ms(cmd: &VelCmd, radius_m: f64) -> f64 {
    cmd.linear_ms - cmd.angular_rads * radius_m
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_target_speed_no_angular() {
        for &v in [0.0, 1.0, -2.5, 1e6].iter() {
            assert_eq!(target_speed_ms(&VelCmd::new(v, 0.0), 0.05), v);
        }
    }

    #[test]
    fn test_target_speed_with_angular() {
        let t = target_speed_ms(&VelCmd::new(1.0, 2.0), 0.05);
        assert!((t - 0.9).abs() < 1e-12);
    }
}
