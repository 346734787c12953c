//! # Actuator library.
//!
//! Drives a single simulated joint so that its surface speed tracks the latest velocity command,
//! optionally limited by an acceleration ramp, and integrates the joint's encoder into an odometry
//! estimate.
//!
//! The host owns the joint and the simulation clock. It hands both to an
//! [`ActuatorPlugin`](plugin::ActuatorPlugin) and calls it once per simulation step.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator control - the per-tick control loop
pub mod ctrl;

/// Command inbox - latest command shared between the listener and the control loop
pub mod inbox;

/// Joint abstraction - the host's view of the actuated joint
pub mod joint;

/// Command listener - background thread feeding the inbox
pub mod listener;

/// Odometry integration from the joint's encoder
pub mod odom;

/// Plugin parameters
pub mod params;

/// Plugin lifecycle adapter
pub mod plugin;

/// Acceleration limited velocity ramp
pub mod ramp;

/// Simulated joint used by the bench host
pub mod sim_joint;

/// Odometry sinks
pub mod sink;

/// Socket transport for commands and odometry
pub mod transport;
