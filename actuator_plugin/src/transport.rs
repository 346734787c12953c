//! # Socket transport
//!
//! Command subscription and odometry publication over the process-wide ZMQ transport. Every
//! message is a single `"<topic> <json>"` frame.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use comms_if::{
    msg::{self, OdomMsg, VelCmd},
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
};
use log::{debug, warn};

use crate::{
    listener::{CmdSource, CmdSourceError},
    params::Params,
    sink::{OdometrySink, SinkError},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Receives velocity commands published on the command topic.
pub struct CmdSubscriber {
    socket: MonitoredSocket,
    topic: String,
    recv_timeout_ms: i32,
}

/// Publishes odometry on the odometry topic.
pub struct OdomPublisher {
    socket: MonitoredSocket,
    topic: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdSubscriber {
    /// Connect to the command endpoint and subscribe to the command topic.
    ///
    /// Does not wait for the publisher to be available.
    pub fn new(ctx: &zmq::Context, params: &Params) -> Result<Self, MonitoredSocketError> {
        let topic = params.full_command_topic();

        let socket_options = SocketOptions {
            block_on_first_connect: false,
            subscriptions: vec![topic.clone()],
            linger: 0,
            // Only the newest command matters
            recv_hwm: 1,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            socket_options,
            &params.net.command_endpoint
        )?;

        debug!("Subscribed to \"{}\" on {}", topic, params.net.command_endpoint);

        Ok(Self {
            socket,
            topic,
            recv_timeout_ms: -1,
        })
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), zmq::Error> {
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

        if timeout_ms != self.recv_timeout_ms {
            self.socket.set_rcvtimeo(timeout_ms)?;
            self.recv_timeout_ms = timeout_ms;
        }

        Ok(())
    }
}

impl CmdSource for CmdSubscriber {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<VelCmd>, CmdSourceError> {
        self.set_timeout(timeout).map_err(CmdSourceError::RecvError)?;

        let frame = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 message on the command topic");
                return Ok(None)
            },
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(zmq::Error::ETERM) => return Err(CmdSourceError::Disconnected),
            Err(e) => return Err(CmdSourceError::RecvError(e))
        };

        match msg::decode_frame(&self.topic, &frame) {
            Ok(cmd) => Ok(Some(cmd)),
            Err(e) => {
                warn!("Discarding command: {}", e);
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.socket.set_unsubscribe(self.topic.as_bytes()) {
            warn!("Could not unsubscribe from \"{}\": {}", self.topic, e);
        }
    }
}

impl OdomPublisher {
    /// Bind the odometry endpoint.
    pub fn new(ctx: &zmq::Context, params: &Params) -> Result<Self, MonitoredSocketError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 0,
            send_timeout: 0,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            socket_options,
            &params.net.odometry_endpoint
        )?;

        Ok(Self {
            socket,
            topic: params.full_odometry_topic(),
        })
    }
}

impl OdometrySink for OdomPublisher {
    fn publish(&mut self, odom: &OdomMsg) -> Result<(), SinkError> {
        let frame = msg::encode_frame(&self.topic, odom)
            .map_err(SinkError::FrameError)?;

        match self.socket.send(&frame, 0) {
            Ok(()) => Ok(()),
            // Nobody listening, or the consumer is too slow
            Err(zmq::Error::EAGAIN) => Ok(()),
            Err(e) => Err(SinkError::SendError(e))
        }
    }
}
