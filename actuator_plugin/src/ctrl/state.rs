//! Implementations for the ActuatorCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{target_speed_ms, JOINT_AXIS, TORQUE_DRIFT_TOLERANCE_NM};
use crate::{
    inbox::CommandInbox,
    joint::{Joint, JointParam},
    odom::{OdometryIntegrator, OdometrySample, Pose2D},
    params::{OdomSource, Params},
    ramp::VelocityRamp,
};
use util::{
    archive::{Archived, Archiver},
    maths,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Actuator control state.
///
/// Owns the joint handle for as long as the plugin is attached.
pub struct ActuatorCtrl<J: Joint> {
    params: Params,

    joint: J,

    inbox: Arc<CommandInbox>,

    ramp: VelocityRamp,

    odom: OdometryIntegrator,

    /// Simulation time of the last control update, advanced in steps of the update period.
    last_update_s: f64,

    /// Simulation time of the last odometry integration.
    last_odom_update_s: f64,

    report: StatusReport,
    arch_report: Archiver,
}

/// Status report for a single tick.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Simulation time of the tick.
    pub sim_time_s: f64,

    /// True if the update period had elapsed and the control update ran.
    pub qualified: bool,

    /// True if the joint's max force had drifted and was re-applied.
    pub torque_reapplied: bool,

    /// Surface speed demanded by the latest command.
    ///
    /// Units: meters/second
    pub target_speed_ms: Option<f64>,

    /// Surface speed measured from the joint.
    ///
    /// Units: meters/second
    pub measured_speed_ms: Option<f64>,

    /// Surface speed instructed to the joint.
    ///
    /// Units: meters/second
    pub instructed_speed_ms: f64,

    /// Angular velocity setpoint written to the joint.
    ///
    /// Units: radians/second
    pub vel_setpoint_rads: Option<f64>,

    /// Integrated heading.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Odometry produced on this tick, if any.
    #[serde(skip)]
    pub odometry: Option<OdometrySample>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<J: Joint> ActuatorCtrl<J> {

    /// Create a new controller bound to `joint`.
    ///
    /// The parameters must already have been validated. The configured torque is applied to the
    /// joint and both clocks start at `sim_time_s`.
    pub fn new(params: Params, mut joint: J, inbox: Arc<CommandInbox>, sim_time_s: f64) -> Self {
        joint.set_param(JointParam::MaxForce, JOINT_AXIS, params.servo_torque_nm);

        debug!(
            "ActuatorCtrl bound to joint \"{}\" (period {:.4} s, odometry {:?})",
            joint.name(),
            params.update_period_s(),
            params.odometry_source
        );

        Self {
            ramp: VelocityRamp::new(params.servo_accel_ms2),
            odom: OdometryIntegrator::new(),
            last_update_s: sim_time_s,
            last_odom_update_s: sim_time_s,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
            params,
            joint,
            inbox,
        }
    }

    /// Archive status reports into the given session.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report = Archiver::from_path(session, "actuator_ctrl/status_report.csv")?;
        Ok(())
    }

    /// Run one tick of the control loop at simulation time `sim_time_s`.
    ///
    /// The torque limit is enforced on every tick. Everything else, encoder odometry included, only
    /// runs once the update period has elapsed, so rate limited ticks leave the pose untouched.
    /// Integrating odometry on every tick, ahead of the rate check, would let the pose move between
    /// control updates.
    pub fn tick(&mut self, sim_time_s: f64) -> StatusReport {
        let mut report = StatusReport {
            sim_time_s,
            ..Default::default()
        };

        // The host can silently reset the joint's max force, so check it every tick
        report.torque_reapplied = self.enforce_torque_limit();

        let period_s = self.params.update_period_s();
        let elapsed_s = sim_time_s - self.last_update_s;

        if elapsed_s <= period_s {
            report.instructed_speed_ms = self.ramp.instructed_ms();
            report.heading_rad = self.odom.pose().theta_rad;
            self.report = report;
            return report
        }

        report.qualified = true;

        let radius_m = self.params.servo_radius_m();

        if self.params.odometry_source == OdomSource::Encoder {
            report.odometry = self.update_odometry(sim_time_s);
        }

        let cmd = self.inbox.read_command();
        let target_ms = target_speed_ms(&cmd, radius_m);
        let measured_ms = self.joint.get_velocity(JOINT_AXIS) * radius_m;

        let instructed_ms = self.ramp.update(target_ms, measured_ms, elapsed_s);
        let setpoint_rads = instructed_ms / radius_m;

        self.joint.set_velocity_setpoint(JOINT_AXIS, setpoint_rads);

        // Advance by whole periods so that jitter in the host's step does not accumulate
        if period_s > 0.0 {
            self.last_update_s += period_s;
        }
        else {
            self.last_update_s = sim_time_s;
        }

        trace!(
            "ActuatorCtrl: target {:.4} m/s, measured {:.4} m/s, instructed {:.4} m/s ({:.4} rad/s)",
            target_ms,
            measured_ms,
            instructed_ms,
            setpoint_rads
        );

        report.target_speed_ms = Some(target_ms);
        report.measured_speed_ms = Some(measured_ms);
        report.instructed_speed_ms = instructed_ms;
        report.vel_setpoint_rads = Some(setpoint_rads);
        report.heading_rad = self.odom.pose().theta_rad;

        self.report = report;
        report
    }

    /// Return to the freshly loaded state at simulation time `sim_time_s`.
    pub fn reset(&mut self, sim_time_s: f64) {
        self.last_update_s = sim_time_s;
        self.last_odom_update_s = sim_time_s;
        self.odom.reset();
        self.ramp.reset();
        self.inbox.clear();
        self.joint.set_param(JointParam::MaxForce, JOINT_AXIS, self.params.servo_torque_nm);
        self.report = StatusReport {
            sim_time_s,
            ..Default::default()
        };

        debug!("ActuatorCtrl reset at {:.4} s", sim_time_s);
    }

    /// The current integrated pose.
    pub fn pose(&self) -> Pose2D {
        self.odom.pose()
    }

    /// The surface speed instructed on the last control update.
    pub fn instructed_speed_ms(&self) -> f64 {
        self.ramp.instructed_ms()
    }

    /// The report from the most recent tick.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn joint(&self) -> &J {
        &self.joint
    }

    /// Re-apply the configured torque if the joint's max force has drifted from it.
    ///
    /// Returns true if the torque had to be re-applied.
    fn enforce_torque_limit(&mut self) -> bool {
        let fmax = self.joint.get_param(JointParam::MaxForce, JOINT_AXIS);

        if maths::differs_by_more_than(self.params.servo_torque_nm, fmax, TORQUE_DRIFT_TOLERANCE_NM) {
            debug!(
                "Joint {} {} drifted to {}, re-applying {}",
                self.joint.name(),
                JointParam::MaxForce.host_name(),
                fmax,
                self.params.servo_torque_nm
            );
            self.joint.set_param(JointParam::MaxForce, JOINT_AXIS, self.params.servo_torque_nm);
            true
        }
        else {
            false
        }
    }

    fn update_odometry(&mut self, sim_time_s: f64) -> Option<OdometrySample> {
        let elapsed_s = sim_time_s - self.last_odom_update_s;
        self.last_odom_update_s = sim_time_s;

        let sample = self.odom.integrate(
            self.joint.get_velocity(JOINT_AXIS),
            self.params.servo_radius_m(),
            elapsed_s,
            sim_time_s
        );

        if sample.is_none() {
            warn!("Skipping odometry integration, {:.6} s elapsed", elapsed_s);
        }

        sample
    }
}

impl<J: Joint> Archived for ActuatorCtrl<J> {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        params::test::test_params,
        sim_joint::{SimJoint, SimJointConfig},
    };

    /// Just past one 10 Hz period, so the first tick qualifies.
    const FIRST_TICK_S: f64 = 0.1 + 1e-9;

    fn make_ctrl(params: Params) -> (ActuatorCtrl<SimJoint>, SimJoint, Arc<CommandInbox>) {
        let joint = SimJoint::new("servo_joint", SimJointConfig::default());
        let inbox = Arc::new(CommandInbox::new());
        let ctrl = ActuatorCtrl::new(params, joint.clone(), inbox.clone(), 0.0);
        (ctrl, joint, inbox)
    }

    #[test]
    fn test_new_applies_torque() {
        let (_ctrl, joint, _inbox) = make_ctrl(test_params());
        assert_eq!(joint.get_param(JointParam::MaxForce, 0), 5.0);
    }

    #[test]
    fn test_snap_without_accel_limit() {
        let (mut ctrl, joint, inbox) = make_ctrl(test_params());

        inbox.set_command(1.0, 0.0);
        let report = ctrl.tick(FIRST_TICK_S);

        assert!(report.qualified);
        assert_eq!(report.target_speed_ms, Some(1.0));
        assert_eq!(ctrl.instructed_speed_ms(), 1.0);
        assert!((joint.get_param(JointParam::Velocity, 0) - 20.0).abs() < 1e-9);
        assert_eq!(report.vel_setpoint_rads, Some(joint.get_param(JointParam::Velocity, 0)));
    }

    #[test]
    fn test_ramped_with_accel_limit() {
        let mut params = test_params();
        params.servo_accel_ms2 = 0.5;
        let (mut ctrl, joint, inbox) = make_ctrl(params);

        inbox.set_command(1.0, 0.0);
        ctrl.tick(FIRST_TICK_S);

        assert!((ctrl.instructed_speed_ms() - 0.05).abs() < 1e-6);
        assert!((joint.get_param(JointParam::Velocity, 0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_rate_limited_ticks_change_nothing() {
        let mut params = test_params();
        params.servo_accel_ms2 = 0.5;
        params.odometry_source = OdomSource::Encoder;
        let (mut ctrl, joint, inbox) = make_ctrl(params);

        joint.set_measured_velocity(20.0);
        inbox.set_command(1.0, 0.0);

        for i in 0..100 {
            let t = i as f64 * 0.001;
            let report = ctrl.tick(t);
            assert!(!report.qualified, "tick at {} qualified", t);
            assert!(report.odometry.is_none());
            assert_eq!(ctrl.instructed_speed_ms(), 0.0);
            assert_eq!(ctrl.pose(), Pose2D::default());
            assert_eq!(joint.get_param(JointParam::Velocity, 0), 0.0);
        }
    }

    #[test]
    fn test_clock_advances_by_period() {
        let (mut ctrl, _joint, inbox) = make_ctrl(test_params());
        inbox.set_command(1.0, 0.0);

        // A late first tick leaves the clock at 0.1, so 0.2 + a little qualifies again even
        // though less than a full period has passed since the late tick
        assert!(ctrl.tick(0.15).qualified);
        assert!(!ctrl.tick(0.2).qualified);
        assert!(ctrl.tick(0.2 + 1e-9).qualified);
        assert!(!ctrl.tick(0.25).qualified);
    }

    #[test]
    fn test_zero_rate_updates_every_tick() {
        let mut params = test_params();
        params.update_rate_hz = 0.0;
        let (mut ctrl, _joint, _inbox) = make_ctrl(params);

        for i in 1..10 {
            assert!(ctrl.tick(i as f64 * 0.001).qualified);
        }

        // Repeated time does not qualify
        assert!(!ctrl.tick(0.009).qualified);
    }

    #[test]
    fn test_torque_drift_reapplied() {
        let (mut ctrl, mut joint, _inbox) = make_ctrl(test_params());

        joint.set_param(JointParam::MaxForce, 0, 3.0);

        // Gated tick, the torque is still corrected
        let report = ctrl.tick(0.01);
        assert!(!report.qualified);
        assert!(report.torque_reapplied);
        assert_eq!(joint.get_param(JointParam::MaxForce, 0), 5.0);

        // No drift, no re-application
        assert!(!ctrl.tick(0.02).torque_reapplied);

        // Host reset zeroes it
        joint.host_reset();
        assert!(ctrl.tick(0.03).torque_reapplied);
        assert_eq!(joint.get_param(JointParam::MaxForce, 0), 5.0);
    }

    #[test]
    fn test_encoder_odometry() {
        let mut params = test_params();
        params.odometry_source = OdomSource::Encoder;
        let (mut ctrl, joint, _inbox) = make_ctrl(params);

        joint.set_measured_velocity(20.0);
        let report = ctrl.tick(0.2);

        // 20 rad/s * 0.05 m * 0.2 s = 0.2 m arc, heading += 0.2 * 0.05
        let sample = report.odometry.unwrap();
        assert!((ctrl.pose().theta_rad - 0.01).abs() < 1e-12);
        assert!((sample.angular_rads.z - 0.05).abs() < 1e-12);
        assert_eq!(sample.position_m.x, 0.0);
        assert_eq!(sample.position_m.y, 0.0);
        assert_eq!(report.heading_rad, ctrl.pose().theta_rad);
    }

    #[test]
    fn test_world_odometry_not_integrated() {
        let (mut ctrl, joint, _inbox) = make_ctrl(test_params());

        joint.set_measured_velocity(20.0);
        let report = ctrl.tick(0.2);

        assert!(report.qualified);
        assert!(report.odometry.is_none());
        assert_eq!(ctrl.pose(), Pose2D::default());
    }

    #[test]
    fn test_reset() {
        let mut params = test_params();
        params.odometry_source = OdomSource::Encoder;
        params.servo_accel_ms2 = 0.5;
        let (mut ctrl, mut joint, inbox) = make_ctrl(params);

        joint.set_measured_velocity(20.0);
        inbox.set_command(1.0, 0.5);
        ctrl.tick(0.2);
        assert!(ctrl.pose().theta_rad != 0.0);
        assert!(ctrl.instructed_speed_ms() != 0.0);

        joint.set_param(JointParam::MaxForce, 0, 0.0);
        ctrl.reset(10.0);

        assert_eq!(ctrl.pose(), Pose2D::default());
        assert_eq!(ctrl.instructed_speed_ms(), 0.0);
        assert_eq!(joint.get_param(JointParam::MaxForce, 0), 5.0);
        assert_eq!(inbox.read_command(), comms_if::msg::VelCmd::stop());

        // The clock restarts from the reset time
        assert!(!ctrl.tick(10.05).qualified);
        assert!(ctrl.tick(10.1 + 1e-9).qualified);
    }

    #[test]
    fn test_ramp_converges_with_sim_joint() {
        let mut params = test_params();
        params.servo_accel_ms2 = 1.0;
        params.update_rate_hz = 100.0;
        let (mut ctrl, mut joint, inbox) = make_ctrl(params);
        joint.set_param(JointParam::MaxForce, 0, 5.0);

        inbox.set_command(0.5, 0.0);

        let dt = 0.001;
        let mut prev_instructed = 0.0;
        for i in 1..=3000 {
            joint.step(dt);
            let report = ctrl.tick(i as f64 * dt);
            if report.qualified {
                // Each control period may add at most accel * elapsed
                assert!(report.instructed_speed_ms - prev_instructed <= 1.0 * 0.011 + 1e-9);
                assert!(report.instructed_speed_ms <= 0.5 + 1e-12);
                prev_instructed = report.instructed_speed_ms;
            }
        }

        assert!((joint.get_velocity(0) * 0.05 - 0.5).abs() < 0.01);
    }
}
