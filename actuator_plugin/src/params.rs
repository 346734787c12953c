//! # Actuator plugin parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the actuator plugin.
///
/// Loaded once when the plugin is configured and never modified afterwards.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Params {

    // ---- BINDING ----

    /// Name of the joint to actuate. If not set the plugin is loaded but cannot do anything.
    #[serde(default)]
    pub joint_name: Option<String>,

    /// Namespace prepended to the command topic.
    #[serde(default)]
    pub robot_namespace: String,

    /// Topic on which velocity commands are received.
    #[serde(default = "default_command_topic")]
    pub command_topic: String,

    // ---- SERVO ----

    /// Maximum torque the joint may exert (the joint's `fmax` parameter).
    ///
    /// Units: newton meters
    pub servo_torque_nm: f64,

    /// Diameter of the wheel or servo horn driven by the joint.
    ///
    /// Units: meters
    pub servo_diameter_m: f64,

    /// Acceleration limit on the instructed surface speed. Zero disables ramping.
    ///
    /// Units: meters/second^2
    #[serde(default)]
    pub servo_accel_ms2: f64,

    // ---- CONTROL LOOP ----

    /// Rate at which the control loop runs. Zero means every simulation step.
    ///
    /// Units: hertz
    #[serde(default = "default_update_rate_hz")]
    pub update_rate_hz: f64,

    // ---- ODOMETRY ----

    /// Where the odometry estimate comes from.
    #[serde(default)]
    pub odometry_source: OdomSource,

    /// Frame the odometry is expressed in.
    #[serde(default = "default_odometry_frame")]
    pub odometry_frame: String,

    /// Topic on which odometry is published.
    #[serde(default = "default_odometry_topic")]
    pub odometry_topic: String,

    // ---- NETWORK ----

    /// Transport endpoints, only used by socket-backed hosts.
    #[serde(default)]
    pub net: NetParams,
}

/// Endpoints used by the socket transport.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NetParams {
    /// Endpoint the command subscriber connects to.
    pub command_endpoint: String,

    /// Endpoint the odometry publisher binds to.
    pub odometry_endpoint: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible sources of odometry.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OdomSource {
    /// Integrate the joint's measured velocity.
    Encoder,

    /// Ground truth from the host, nothing is integrated by the plugin.
    World,
}

/// Errors found while validating a set of parameters.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParamsError {
    #[error("servo_diameter_m must be positive and finite, found {0}")]
    InvalidDiameter(f64),

    #[error("update_rate_hz must be zero or positive and finite, found {0}")]
    InvalidUpdateRate(f64),

    #[error("servo_torque_nm must be zero or positive and finite, found {0}")]
    InvalidTorque(f64),

    #[error("servo_accel_ms2 must be zero or positive and finite, found {0}")]
    InvalidAccel(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Params {
    /// Check that the parameters describe a usable actuator.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.servo_diameter_m.is_finite() && self.servo_diameter_m > 0.0) {
            return Err(ParamsError::InvalidDiameter(self.servo_diameter_m))
        }
        if !(self.update_rate_hz.is_finite() && self.update_rate_hz >= 0.0) {
            return Err(ParamsError::InvalidUpdateRate(self.update_rate_hz))
        }
        if !(self.servo_torque_nm.is_finite() && self.servo_torque_nm >= 0.0) {
            return Err(ParamsError::InvalidTorque(self.servo_torque_nm))
        }
        if !(self.servo_accel_ms2.is_finite() && self.servo_accel_ms2 >= 0.0) {
            return Err(ParamsError::InvalidAccel(self.servo_accel_ms2))
        }

        Ok(())
    }

    /// Radius of the wheel or servo horn.
    ///
    /// Units: meters
    pub fn servo_radius_m(&self) -> f64 {
        self.servo_diameter_m / 2.0
    }

    /// Period of the control loop, zero if the loop runs on every simulation step.
    ///
    /// Units: seconds
    pub fn update_period_s(&self) -> f64 {
        if self.update_rate_hz > 0.0 {
            1.0 / self.update_rate_hz
        }
        else {
            0.0
        }
    }

    /// The command topic including the robot namespace.
    pub fn full_command_topic(&self) -> String {
        namespaced(&self.robot_namespace, &self.command_topic)
    }

    /// The odometry topic including the robot namespace.
    pub fn full_odometry_topic(&self) -> String {
        namespaced(&self.robot_namespace, &self.odometry_topic)
    }

    /// The frame the odometry describes, which is named after the joint.
    pub fn odometry_child_frame(&self) -> String {
        namespaced(
            &self.robot_namespace,
            self.joint_name.as_deref().unwrap_or("joint")
        )
    }
}

impl Default for OdomSource {
    fn default() -> Self {
        OdomSource::World
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            command_endpoint: "tcp://localhost:5030".into(),
            odometry_endpoint: "tcp://*:5031".into(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn namespaced(namespace: &str, name: &str) -> String {
    let namespace = namespace.trim_matches('/');
    let name = name.trim_start_matches('/');

    if namespace.is_empty() {
        name.to_string()
    }
    else {
        format!("{}/{}", namespace, name)
    }
}

fn default_command_topic() -> String {
    "cmd_vel".into()
}

fn default_odometry_topic() -> String {
    "odom".into()
}

fn default_odometry_frame() -> String {
    "odom".into()
}

fn default_update_rate_hz() -> f64 {
    100.0
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Parameters matching a 10 cm servo horn with a 5 Nm limit, running at 10 Hz.
    pub(crate) fn test_params() -> Params {
        Params {
            joint_name: Some("servo_joint".into()),
            robot_namespace: String::new(),
            command_topic: default_command_topic(),
            servo_torque_nm: 5.0,
            servo_diameter_m: 0.1,
            servo_accel_ms2: 0.0,
            update_rate_hz: 10.0,
            odometry_source: OdomSource::World,
            odometry_frame: default_odometry_frame(),
            odometry_topic: default_odometry_topic(),
            net: NetParams::default(),
        }
    }

    #[test]
    fn test_load_defaults() {
        let p: Params = util::params::from_str(
            "servo_torque_nm = 5.0\nservo_diameter_m = 0.1\n"
        ).unwrap();

        assert_eq!(p.joint_name, None);
        assert_eq!(p.command_topic, "cmd_vel");
        assert_eq!(p.update_rate_hz, 100.0);
        assert_eq!(p.servo_accel_ms2, 0.0);
        assert_eq!(p.odometry_source, OdomSource::World);
        assert_eq!(p.net, NetParams::default());
    }

    #[test]
    fn test_load_full() {
        let p: Params = util::params::from_str(r#"
            joint_name = "wheel_joint"
            robot_namespace = "/rover/"
            command_topic = "servo_velcmd"
            servo_torque_nm = 2.5
            servo_diameter_m = 0.2
            servo_accel_ms2 = 0.5
            update_rate_hz = 0.0
            odometry_source = "encoder"

            [net]
            command_endpoint = "tcp://localhost:6000"
            odometry_endpoint = "tcp://*:6001"
        "#).unwrap();

        assert_eq!(p.joint_name.as_deref(), Some("wheel_joint"));
        assert_eq!(p.odometry_source, OdomSource::Encoder);
        assert_eq!(p.full_command_topic(), "rover/servo_velcmd");
        assert_eq!(p.full_odometry_topic(), "rover/odom");
        assert_eq!(p.odometry_child_frame(), "rover/wheel_joint");
        assert_eq!(p.net.command_endpoint, "tcp://localhost:6000");
        assert_eq!(p.update_period_s(), 0.0);
        assert_eq!(p.servo_radius_m(), 0.1);
    }

    #[test]
    fn test_unknown_odom_source_rejected() {
        let r: Result<Params, _> = util::params::from_str(
            "servo_torque_nm = 5.0\nservo_diameter_m = 0.1\nodometry_source = \"gps\"\n"
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_validate() {
        let mut p = test_params();
        assert_eq!(p.validate(), Ok(()));
        assert_eq!(p.update_period_s(), 0.1);

        p.servo_diameter_m = 0.0;
        assert_eq!(p.validate(), Err(ParamsError::InvalidDiameter(0.0)));

        let mut p = test_params();
        p.update_rate_hz = -1.0;
        assert_eq!(p.validate(), Err(ParamsError::InvalidUpdateRate(-1.0)));

        let mut p = test_params();
        p.servo_accel_ms2 = -0.5;
        assert_eq!(p.validate(), Err(ParamsError::InvalidAccel(-0.5)));
    }
}
