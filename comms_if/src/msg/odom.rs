//! # Odometry message

use serde::{Deserialize, Serialize};

/// Odometry published by the actuator plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdomMsg {
    /// Simulation time at which the estimate was computed.
    ///
    /// Units: seconds
    pub stamp_s: f64,

    /// Frame the pose is expressed in.
    pub frame_id: String,

    /// Frame the pose describes.
    pub child_frame_id: String,

    /// Position of the child frame.
    ///
    /// Units: meters
    pub position_m: [f64; 3],

    /// Attitude of the child frame as a quaternion in `[x, y, z, w]` order.
    pub orientation_q: [f64; 4],

    /// Linear velocity.
    ///
    /// Units: meters/second
    pub linear_ms: [f64; 3],

    /// Angular velocity.
    ///
    /// Units: radians/second
    pub angular_rads: [f64; 3],
}
