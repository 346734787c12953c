//! # Joint interface
//!
//! The abstraction over the host engine's simulated joint. The controller only needs to read and
//! write a few named parameters and read the measured velocity.

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Joint parameters the controller reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointParam {
    /// Maximum force/torque the joint may exert (`fmax`).
    MaxForce,

    /// Velocity setpoint of the joint motor (`vel`).
    Velocity,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A single degree of freedom rotary joint owned by the host engine.
///
/// `index` selects the joint axis, it is always 0 for the revolute joints driven by this plugin.
pub trait Joint {
    /// The name of the joint in the host's model.
    fn name(&self) -> &str;

    /// Set a joint parameter.
    fn set_param(&mut self, param: JointParam, index: usize, value: f64);

    /// Get a joint parameter.
    fn get_param(&self, param: JointParam, index: usize) -> f64;

    /// Get the measured angular velocity of the joint.
    ///
    /// Units: radians/second
    fn get_velocity(&self, index: usize) -> f64;

    /// Apply a velocity setpoint.
    ///
    /// Units: radians/second
    fn set_velocity_setpoint(&mut self, index: usize, vel_rads: f64) {
        self.set_param(JointParam::Velocity, index, vel_rads)
    }
}

impl JointParam {
    /// The name the host engine uses for this parameter.
    pub fn host_name(&self) -> &'static str {
        match self {
            JointParam::MaxForce => "fmax",
            JointParam::Velocity => "vel",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Joint which records every parameter write.
    #[derive(Default)]
    struct RecordingJoint {
        writes: Vec<(JointParam, usize, f64)>,
    }

    impl Joint for RecordingJoint {
        fn name(&self) -> &str {
            "recording"
        }

        fn set_param(&mut self, param: JointParam, index: usize, value: f64) {
            self.writes.push((param, index, value));
        }

        fn get_param(&self, param: JointParam, index: usize) -> f64 {
            self.writes
                .iter()
                .rev()
                .find(|(p, i, _)| *p == param && *i == index)
                .map(|(_, _, v)| *v)
                .unwrap_or(0.0)
        }

        fn get_velocity(&self, _index: usize) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_velocity_setpoint_writes_vel() {
        let mut joint = RecordingJoint::default();

        joint.set_velocity_setpoint(0, 12.5);
        joint.set_param(JointParam::MaxForce, 0, 5.0);

        assert_eq!(
            joint.writes,
            vec![(JointParam::Velocity, 0, 12.5), (JointParam::MaxForce, 0, 5.0)]
        );
        assert_eq!(joint.get_param(JointParam::Velocity, 0), 12.5);
    }

    #[test]
    fn test_host_names() {
        assert_eq!(JointParam::MaxForce.host_name(), "fmax");
        assert_eq!(JointParam::Velocity.host_name(), "vel");
    }
}
