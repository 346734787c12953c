//! # Command inbox
//!
//! Holds the latest velocity command. Written by the command listener thread and read by the
//! control loop once per tick. There is no queue, a new command simply replaces the old one.

use std::sync::{Mutex, PoisonError};

use comms_if::msg::VelCmd;

/// Thread-safe holder of the most recent velocity command.
#[derive(Debug, Default)]
pub struct CommandInbox {
    latest: Mutex<VelCmd>,
}

impl CommandInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored command.
    pub fn set_command(&self, linear_ms: f64, angular_rads: f64) {
        // The command is plain data so a poisoned lock still holds a valid value
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest = VelCmd::new(linear_ms, angular_rads);
    }

    /// Get the most recently set command.
    pub fn read_command(&self) -> VelCmd {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored command with a stop command.
    pub fn clear(&self) {
        self.set_command(0.0, 0.0);
    }
}
