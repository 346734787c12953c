//! # Odometry sinks
//!
//! Consumers of the odometry produced by the plugin.

use std::sync::{Arc, Mutex, PoisonError};

use comms_if::{msg::{FrameError, OdomMsg}, net::zmq};

/// Something which accepts odometry messages.
pub trait OdometrySink {
    fn publish(&mut self, msg: &OdomMsg) -> Result<(), SinkError>;
}

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("Could not encode the odometry message: {0}")]
    FrameError(FrameError),

    #[error("Could not send the odometry message: {0}")]
    SendError(zmq::Error),
}

/// Keeps every published message in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    msgs: Arc<Mutex<Vec<OdomMsg>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages published so far.
    pub fn msgs(&self) -> Vec<OdomMsg> {
        self.msgs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl OdometrySink for MemorySink {
    fn publish(&mut self, msg: &OdomMsg) -> Result<(), SinkError> {
        self.msgs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(msg.clone());
        Ok(())
    }
}
