//! # Messages
//!
//! Wire-level messages sent to and from the actuator plugin. All messages are serialised as JSON
//! and sent as a single frame prefixed by their topic, see [`encode_frame`] and [`decode_frame`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod cmd;
mod odom;

pub use cmd::VelCmd;
pub use odom::OdomMsg;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{de::DeserializeOwned, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while decoding a topic frame.
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("Expected a frame on topic \"{expected}\" but it was addressed to another topic")]
    WrongTopic { expected: String },

    #[error("Could not serialize the message: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the message: {0}")]
    DeserializeError(serde_json::Error)
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a message as a `"<topic> <json>"` frame.
pub fn encode_frame<T: Serialize>(topic: &str, msg: &T) -> Result<String, FrameError> {
    let json = serde_json::to_string(msg)
        .map_err(FrameError::SerializationError)?;

    Ok(format!("{} {}", topic, json))
}

/// Decode a `"<topic> <json>"` frame, checking that it was sent on `topic`.
pub fn decode_frame<T: DeserializeOwned>(topic: &str, frame: &str) -> Result<T, FrameError> {
    let body = frame
        .strip_prefix(topic)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(|| FrameError::WrongTopic { expected: topic.into() })?;

    serde_json::from_str(body).map_err(FrameError::DeserializeError)
}
