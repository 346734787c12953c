//! # Encoder odometry
//!
//! Dead-reckoning of a single contact point from the joint's measured angular velocity. Since only
//! one actuator is modelled the contact point never translates, only the heading is integrated.
//!
//! The heading increment is `arc_length * radius`. This differs from unicycle odometry, which
//! divides by the radius.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::msg::OdomMsg;
use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A planar pose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pose2D {
    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Heading about the Z+ axis, not wrapped.
    ///
    /// Units: radians
    pub theta_rad: f64,
}

/// An odometry estimate, projected from a [`Pose2D`] and the rates of the last integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometrySample {
    /// Simulation time of the estimate.
    ///
    /// Units: seconds
    pub stamp_s: f64,

    /// Units: meters
    pub position_m: Vector3<f64>,

    pub orientation_q: UnitQuaternion<f64>,

    /// Units: meters/second
    pub linear_ms: Vector3<f64>,

    /// Units: radians/second
    pub angular_rads: Vector3<f64>,
}

/// Integrates joint motion into a running [`Pose2D`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OdometryIntegrator {
    pose: Pose2D,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OdometryIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current integrated pose.
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Return the pose to the origin.
    pub fn reset(&mut self) {
        self.pose = Pose2D::default();
    }

    /// Integrate the joint's angular velocity over `elapsed_s`.
    ///
    /// Returns `None`, leaving the pose untouched, if no time has elapsed.
    pub fn integrate(
        &mut self,
        joint_vel_rads: f64,
        radius_m: f64,
        elapsed_s: f64,
        stamp_s: f64
    ) -> Option<OdometrySample> {
        if !(elapsed_s > 0.0) {
            return None
        }

        let arc_m = joint_vel_rads * radius_m * elapsed_s;

        // A single contact point does not translate
        let dx_m = 0.0;
        let dy_m = 0.0;
        let dtheta_rad = arc_m * radius_m;

        self.pose.x_m += dx_m;
        self.pose.y_m += dy_m;
        self.pose.theta_rad += dtheta_rad;

        let angular_rate_rads = dtheta_rad / elapsed_s;

        Some(OdometrySample {
            stamp_s,
            position_m: Vector3::new(self.pose.x_m, self.pose.y_m, 0.0),
            orientation_q: UnitQuaternion::from_euler_angles(0.0, 0.0, self.pose.theta_rad),
            linear_ms: Vector3::new(dx_m / elapsed_s, dy_m / elapsed_s, 0.0),
            angular_rads: Vector3::new(0.0, 0.0, angular_rate_rads),
        })
    }
}

impl OdometrySample {
    /// Heading encoded in the orientation.
    pub fn yaw_rad(&self) -> f64 {
        self.orientation_q.euler_angles().2
    }

    /// Build the wire message for this sample.
    pub fn to_msg(&self, frame_id: &str, child_frame_id: &str) -> OdomMsg {
        let q = self.orientation_q.quaternion().coords;

        OdomMsg {
            stamp_s: self.stamp_s,
            frame_id: frame_id.to_string(),
            child_frame_id: child_frame_id.to_string(),
            position_m: [self.position_m.x, self.position_m.y, self.position_m.z],
            orientation_q: [q.x, q.y, q.z, q.w],
            linear_ms: [self.linear_ms.x, self.linear_ms.y, self.linear_ms.z],
            angular_rads: [self.angular_rads.x, self.angular_rads.y, self.angular_rads.z],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_velocity_keeps_heading() {
        let mut odom = OdometryIntegrator::new();

        for &dt in [0.001, 0.1, 5.0].iter() {
            let sample = odom.integrate(0.0, 0.05, dt, 1.0).unwrap();
            assert_eq!(odom.pose().theta_rad, 0.0);
            assert_eq!(sample.angular_rads.z, 0.0);
        }
    }

    #[test]
    fn test_no_translation() {
        let mut odom = OdometryIntegrator::new();

        for &(vel, dt) in [(20.0, 0.1), (-3.0, 0.5), (1e6, 1e-3)].iter() {
            let sample = odom.integrate(vel, 0.05, dt, 0.0).unwrap();
            assert_eq!(odom.pose().x_m, 0.0);
            assert_eq!(odom.pose().y_m, 0.0);
            assert_eq!(sample.position_m, Vector3::zeros());
            assert_eq!(sample.linear_ms, Vector3::zeros());
        }
    }

    #[test]
    fn test_heading_increment() {
        let mut odom = OdometryIntegrator::new();

        // 20 rad/s on a 5 cm radius for 0.1 s: arc = 0.1 m, dtheta = 0.1 * 0.05
        let sample = odom.integrate(20.0, 0.05, 0.1, 2.0).unwrap();

        assert!((odom.pose().theta_rad - 0.005).abs() < 1e-12);
        assert!((sample.angular_rads.z - 0.05).abs() < 1e-12);
        assert!((sample.yaw_rad() - 0.005).abs() < 1e-12);
        assert_eq!(sample.stamp_s, 2.0);

        // Increments accumulate
        odom.integrate(20.0, 0.05, 0.1, 2.1).unwrap();
        assert!((odom.pose().theta_rad - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_zero_elapsed_skipped() {
        let mut odom = OdometryIntegrator::new();
        odom.integrate(20.0, 0.05, 0.1, 0.0).unwrap();
        let before = odom.pose();

        assert!(odom.integrate(20.0, 0.05, 0.0, 0.0).is_none());
        assert!(odom.integrate(20.0, 0.05, -0.1, 0.0).is_none());
        assert_eq!(odom.pose(), before);
    }

    #[test]
    fn test_reset() {
        let mut odom = OdometryIntegrator::new();
        odom.integrate(20.0, 0.05, 0.1, 0.0).unwrap();
        odom.reset();
        assert_eq!(odom.pose(), Pose2D::default());
    }

    #[test]
    fn test_to_msg() {
        let mut odom = OdometryIntegrator::new();
        let sample = odom.integrate(std::f64::consts::PI * 400.0, 0.05, 1.0, 3.0).unwrap();

        // dtheta = pi * 400 * 0.05 * 0.05 = pi, so a half turn about Z
        let msg = sample.to_msg("odom", "servo_joint");

        assert_eq!(msg.frame_id, "odom");
        assert_eq!(msg.child_frame_id, "servo_joint");
        assert_eq!(msg.position_m, [0.0; 3]);
        assert!(msg.orientation_q[0].abs() < 1e-9);
        assert!(msg.orientation_q[1].abs() < 1e-9);
        assert!((msg.orientation_q[2].abs() - 1.0).abs() < 1e-9);
        assert!(msg.orientation_q[3].abs() < 1e-9);
        assert!((msg.angular_rads[2] - std::f64::consts::PI).abs() < 1e-9);
    }
}
