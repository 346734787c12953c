//! # Velocity command

use serde::{Deserialize, Serialize};

/// A velocity command for the actuator.
///
/// Only the forward and yaw components of a full twist are meaningful to a single rotary joint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelCmd {
    /// Linear (forward) speed.
    ///
    /// Units: meters/second
    pub linear_ms: f64,

    /// Angular speed about the Z+ (upwards) axis.
    ///
    /// Units: radians/second
    pub angular_rads: f64,
}

impl VelCmd {
    /// Create a new command.
    pub fn new(linear_ms: f64, angular_rads: f64) -> Self {
        Self { linear_ms, angular_rads }
    }

    /// The command which brings the actuator to rest.
    pub fn stop() -> Self {
        Self::default()
    }
}
