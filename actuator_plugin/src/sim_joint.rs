//! # Simulated joint
//!
//! A minimal velocity-servo joint model used by the bench host and the tests. The joint's velocity
//! follows its setpoint with a first order response whose acceleration is bounded by the
//! available torque. With zero max force the joint is not driven at all.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use util::maths;

use crate::joint::{Joint, JointParam};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A handle to a simulated joint.
///
/// Clones share the same joint, so the host can step the physics while the plugin holds another
/// handle.
#[derive(Debug, Clone)]
pub struct SimJoint {
    name: String,
    config: SimJointConfig,
    state: Arc<Mutex<SimJointState>>,
}

/// Physical properties of a [`SimJoint`].
#[derive(Debug, Clone, Copy)]
pub struct SimJointConfig {
    /// Rotational inertia seen by the joint.
    ///
    /// Units: kilogram meters^2
    pub inertia_kgm2: f64,

    /// Time constant of the velocity response.
    ///
    /// Units: seconds
    pub time_constant_s: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimJointState {
    max_force_nm: f64,
    vel_setpoint_rads: f64,
    vel_rads: f64,
    pos_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimJoint {
    pub fn new(name: &str, config: SimJointConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            state: Arc::new(Mutex::new(SimJointState::default())),
        }
    }

    /// Advance the joint by one physics step.
    pub fn step(&self, dt_s: f64) {
        if !(dt_s > 0.0) {
            return
        }

        let mut s = self.lock();

        let max_accel = if self.config.inertia_kgm2 > 0.0 {
            s.max_force_nm / self.config.inertia_kgm2
        }
        else {
            std::f64::INFINITY
        };

        let desired_accel = if self.config.time_constant_s > 0.0 {
            (s.vel_setpoint_rads - s.vel_rads) / self.config.time_constant_s
        }
        else {
            (s.vel_setpoint_rads - s.vel_rads) / dt_s
        };

        // Never step past the setpoint within a single physics step
        let accel = maths::clamp(desired_accel, -max_accel, max_accel);
        let dv = accel * dt_s;
        s.vel_rads = if dv.abs() > (s.vel_setpoint_rads - s.vel_rads).abs() {
            s.vel_setpoint_rads
        }
        else {
            s.vel_rads + dv
        };
        s.pos_rad += s.vel_rads * dt_s;
    }

    /// Emulate the host engine resetting the joint, which zeroes its max force.
    pub fn host_reset(&self) {
        self.lock().max_force_nm = 0.0;
    }

    /// Force the measured velocity, as if an external load moved the joint.
    pub fn set_measured_velocity(&self, vel_rads: f64) {
        self.lock().vel_rads = vel_rads;
    }

    /// Joint angle.
    ///
    /// Units: radians
    pub fn position_rad(&self) -> f64 {
        self.lock().pos_rad
    }

    fn lock(&self) -> MutexGuard<'_, SimJointState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Joint for SimJoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_param(&mut self, param: JointParam, index: usize, value: f64) {
        if index != 0 {
            log::warn!("SimJoint {} has no axis {}", self.name, index);
            return
        }

        let mut s = self.lock();
        match param {
            JointParam::MaxForce => s.max_force_nm = value,
            JointParam::Velocity => s.vel_setpoint_rads = value,
        }
    }

    fn get_param(&self, param: JointParam, _index: usize) -> f64 {
        let s = self.lock();
        match param {
            JointParam::MaxForce => s.max_force_nm,
            JointParam::Velocity => s.vel_setpoint_rads,
        }
    }

    fn get_velocity(&self, _index: usize) -> f64 {
        self.lock().vel_rads
    }
}

impl Default for SimJointConfig {
    fn default() -> Self {
        Self {
            inertia_kgm2: 1e-3,
            time_constant_s: 0.05,
        }
    }
}
