//! # Actuator plugin
//!
//! Binds the actuator controller to the host's lifecycle. The host configures the plugin once,
//! ticks it on every simulation step, may reset it, and finally shuts it down:
//!
//! ```text
//! Uninitialized --configure--> Ready --shutdown--> Unloaded
//!                              |   ^
//!                              +---+ tick / reset
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use util::{archive::Archived, module::Plugin, session::Session};

use crate::{
    ctrl::{ActuatorCtrl, StatusReport},
    inbox::CommandInbox,
    joint::Joint,
    listener::{CmdListener, CmdSource, ListenerError, DEFAULT_LISTEN_TIMEOUT},
    params::{Params, ParamsError},
    sink::OdometrySink,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything the host hands over when loading the plugin.
pub struct PluginLoad<J> {
    pub params: Params,

    /// The joint named in the parameters, or `None` if the host could not find it.
    pub joint: Option<J>,

    /// Where velocity commands come from. Without one the plugin only holds its last command.
    pub cmd_source: Option<Box<dyn CmdSource>>,
}

/// The actuator plugin.
pub struct ActuatorPlugin<J: Joint, K: OdometrySink> {
    state: PluginState,

    inbox: Arc<CommandInbox>,

    ctrl: Option<ActuatorCtrl<J>>,

    listener: Option<CmdListener>,

    sink: Option<K>,

    listen_timeout: Duration,

    odom_frame_id: String,
    odom_child_frame_id: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Lifecycle state of the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Uninitialized,
    Ready,
    Unloaded,
}

#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(ParamsError),

    #[error("Cannot {0} the plugin while it is {1:?}")]
    InvalidState(&'static str, PluginState),

    #[error("Could not start the command listener: {0}")]
    ListenerStart(ListenerError),

    #[error("Could not stop the command listener: {0}")]
    ListenerJoin(ListenerError),

    #[error("Could not initialise the archive: {0}")]
    ArchiveError(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<J: Joint, K: OdometrySink> ActuatorPlugin<J, K> {
    /// Create an unconfigured plugin which will publish odometry into `sink`.
    pub fn new(sink: K) -> Self {
        Self {
            state: PluginState::Uninitialized,
            inbox: Arc::new(CommandInbox::new()),
            ctrl: None,
            listener: None,
            sink: Some(sink),
            listen_timeout: DEFAULT_LISTEN_TIMEOUT,
            odom_frame_id: String::new(),
            odom_child_frame_id: String::new(),
        }
    }

    /// Set the bound on each wait of the command listener.
    pub fn with_listen_timeout(mut self, timeout: Duration) -> Self {
        self.listen_timeout = timeout;
        self
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    /// True if the plugin is ready and bound to a joint.
    pub fn is_functional(&self) -> bool {
        self.state == PluginState::Ready && self.ctrl.is_some()
    }

    /// The inbox commands are delivered to.
    pub fn inbox(&self) -> Arc<CommandInbox> {
        self.inbox.clone()
    }

    pub fn ctrl(&self) -> Option<&ActuatorCtrl<J>> {
        self.ctrl.as_ref()
    }

    /// Archive the controller's status reports into the session.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), PluginError> {
        match self.ctrl {
            Some(ref mut c) => c.init_archive(session)
                .map_err(|e| PluginError::ArchiveError(e.to_string())),
            None => Ok(())
        }
    }

    fn publish_odometry(&mut self, report: &StatusReport) {
        let (sample, sink) = match (report.odometry, self.sink.as_mut()) {
            (Some(s), Some(k)) => (s, k),
            _ => return
        };

        let msg = sample.to_msg(&self.odom_frame_id, &self.odom_child_frame_id);

        if let Err(e) = sink.publish(&msg) {
            warn!("Could not publish odometry: {}", e);
        }
    }
}

impl<J: Joint, K: OdometrySink> Plugin for ActuatorPlugin<J, K> {
    type LoadData = PluginLoad<J>;
    type Error = PluginError;
    type StatusReport = Option<StatusReport>;

    fn configure(&mut self, load_data: PluginLoad<J>, sim_time_s: f64) -> Result<(), PluginError> {
        if self.state != PluginState::Uninitialized {
            return Err(PluginError::InvalidState("configure", self.state))
        }

        let PluginLoad { params, joint, cmd_source } = load_data;

        params.validate().map_err(PluginError::InvalidParams)?;

        self.odom_frame_id = params.odometry_frame.clone();
        self.odom_child_frame_id = params.odometry_child_frame();

        let command_topic = params.full_command_topic();

        // Start listening before touching the joint, so a failure leaves it as it was
        let listener = match cmd_source {
            Some(source) => Some(
                CmdListener::spawn(source, self.inbox.clone(), self.listen_timeout)
                    .map_err(PluginError::ListenerStart)?
            ),
            None => {
                debug!("No command source provided, the inbox must be written directly");
                None
            }
        };

        self.ctrl = match (params.joint_name.clone(), joint) {
            (None, _) => {
                warn!("ActuatorPlugin missing <joint>, the actuator will not be driven");
                None
            },
            (Some(name), None) => {
                warn!("ActuatorPlugin could not find joint \"{}\", the actuator will not be driven", name);
                None
            },
            (Some(name), Some(j)) => {
                if j.name() != name {
                    warn!("Expected joint \"{}\" but the host provided \"{}\"", name, j.name());
                }
                Some(ActuatorCtrl::new(params, j, self.inbox.clone(), sim_time_s))
            }
        };

        self.listener = listener;

        self.state = PluginState::Ready;

        info!("Actuator plugin ready, listening on \"{}\"", command_topic);

        Ok(())
    }

    fn tick(&mut self, sim_time_s: f64) -> Option<StatusReport> {
        if self.state != PluginState::Ready {
            warn!("Tick at {:.4} s ignored, the plugin is {:?}", sim_time_s, self.state);
            return None
        }

        let report = self.ctrl.as_mut()?.tick(sim_time_s);

        self.publish_odometry(&report);

        if report.qualified {
            if let Some(ref mut c) = self.ctrl {
                if let Err(e) = c.write() {
                    warn!("Could not archive the controller state: {}", e);
                }
            }
        }

        Some(report)
    }

    fn reset(&mut self, sim_time_s: f64) {
        if self.state != PluginState::Ready {
            warn!("Reset ignored, the plugin is {:?}", self.state);
            return
        }

        match self.ctrl {
            Some(ref mut c) => c.reset(sim_time_s),
            None => self.inbox.clear()
        }

        info!("Actuator plugin reset at {:.4} s", sim_time_s);
    }

    fn shutdown(&mut self) -> Result<(), PluginError> {
        if self.state == PluginState::Unloaded {
            return Ok(())
        }

        self.state = PluginState::Unloaded;

        let result = match self.listener.take() {
            Some(l) => l.stop().map_err(PluginError::ListenerJoin),
            None => Ok(())
        };

        // Release the joint and the sink
        self.ctrl = None;
        self.sink = None;

        info!("Actuator plugin unloaded");

        result
    }
}

impl<J: Joint, K: OdometrySink> Drop for ActuatorPlugin<J, K> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Error shutting down the actuator plugin: {}", e);
        }
    }
}
