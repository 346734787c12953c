//! # Command listener
//!
//! A background thread which drains a [`CmdSource`] into the [`CommandInbox`]. Each receive waits
//! for at most a bounded timeout so that a stop request is noticed promptly.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use comms_if::{msg::VelCmd, net::zmq};
use log::{debug, error, trace, warn};

use crate::inbox::CommandInbox;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default bound on how long the listener waits for a command before checking for shutdown.
pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_millis(10);

/// Pause between receive attempts while the source keeps failing. Never longer than the listen
/// timeout, so a stop request is still noticed promptly.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(5);

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of velocity commands, such as a network subscription.
pub trait CmdSource: Send {
    /// Wait up to `timeout` for the next command.
    ///
    /// `Ok(None)` means no command arrived within the timeout. `RecvError` is treated as transient,
    /// only `Disconnected` ends the listener.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<VelCmd>, CmdSourceError>;

    /// Stop accepting input. Called once, from the listener thread, before it exits.
    fn close(&mut self) {}
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle to the running listener thread.
pub struct CmdListener {
    run: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

/// A [`CmdSource`] fed through an in-process channel.
pub struct ChannelCmdSource {
    receiver: Receiver<VelCmd>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum CmdSourceError {
    #[error("The command source has been disconnected")]
    Disconnected,

    #[error("Could not receive from the command socket: {0}")]
    RecvError(zmq::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ListenerError {
    #[error("The listen timeout must be non-zero")]
    ZeroTimeout,

    #[error("Could not spawn the listener thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The listener thread panicked")]
    JoinError,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdListener {
    /// Start listening on `source`, writing every command received into `inbox`.
    pub fn spawn(
        source: Box<dyn CmdSource>,
        inbox: Arc<CommandInbox>,
        timeout: Duration
    ) -> Result<Self, ListenerError> {
        if timeout == Duration::from_millis(0) {
            return Err(ListenerError::ZeroTimeout)
        }

        let run = Arc::new(AtomicBool::new(true));
        let alive = Arc::new(AtomicBool::new(true));

        let run_clone = run.clone();
        let alive_clone = alive.clone();

        let join_handle = thread::Builder::new()
            .name("cmd_listener".into())
            .spawn(move || {
                listen(source, inbox, run_clone, timeout);
                alive_clone.store(false, Ordering::Release);
            })
            .map_err(ListenerError::SpawnError)?;

        Ok(Self {
            run,
            alive,
            join_handle: Some(join_handle),
        })
    }

    /// True until the listener thread has exited.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Signal the listener to stop and wait for it to exit.
    pub fn stop(mut self) -> Result<(), ListenerError> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<(), ListenerError> {
        self.run.store(false, Ordering::Release);

        match self.join_handle.take() {
            Some(jh) => jh.join().map_err(|_| ListenerError::JoinError),
            None => Ok(())
        }
    }
}

impl Drop for CmdListener {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_join() {
            error!("Error stopping the command listener: {}", e);
        }
    }
}

impl ChannelCmdSource {
    /// Create a channel source and the sender feeding it.
    pub fn new() -> (Sender<VelCmd>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self { receiver })
    }
}

impl CmdSource for ChannelCmdSource {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<VelCmd>, CmdSourceError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(cmd) => Ok(Some(cmd)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(CmdSourceError::Disconnected),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Listener thread body.
fn listen(
    mut source: Box<dyn CmdSource>,
    inbox: Arc<CommandInbox>,
    run: Arc<AtomicBool>,
    timeout: Duration
) {
    debug!("Command listener started");

    let mut consecutive_errors: u32 = 0;

    while run.load(Ordering::Acquire) {
        match source.recv_timeout(timeout) {
            Ok(Some(cmd)) => {
                consecutive_errors = 0;
                trace!("Received {:?}", cmd);
                inbox.set_command(cmd.linear_ms, cmd.angular_rads);
            },
            Ok(None) => consecutive_errors = 0,
            Err(CmdSourceError::Disconnected) => {
                warn!("Command source disconnected, no further commands will be received");
                break
            },
            Err(e) => {
                consecutive_errors = consecutive_errors.saturating_add(1);

                // Only the first of a run of errors is worth reporting loudly
                if consecutive_errors == 1 {
                    error!("Error receiving commands: {}", e);
                }
                else {
                    debug!("Error receiving commands ({} in a row): {}", consecutive_errors, e);
                    thread::sleep(RECV_ERROR_BACKOFF.min(timeout));
                }
            }
        }
    }

    source.close();

    debug!("Command listener stopped");
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Instant;

    /// Wait for a condition to become true, panicking after a generous timeout.
    fn wait_for<F: Fn() -> bool>(cond: F) {
        let start = Instant::now();
        while !cond() {
            assert!(start.elapsed() < Duration::from_secs(5), "condition not met in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_commands_reach_inbox() {
        let inbox = Arc::new(CommandInbox::new());
        let (tx, source) = ChannelCmdSource::new();

        let listener = CmdListener::spawn(
            Box::new(source),
            inbox.clone(),
            DEFAULT_LISTEN_TIMEOUT
        ).unwrap();

        tx.send(VelCmd::new(1.0, 0.0)).unwrap();
        tx.send(VelCmd::new(0.5, 0.25)).unwrap();

        wait_for(|| inbox.read_command() == VelCmd::new(0.5, 0.25));

        assert!(listener.is_alive());
        listener.stop().unwrap();
    }

    #[test]
    fn test_stop_is_prompt() {
        let inbox = Arc::new(CommandInbox::new());
        let (_tx, source) = ChannelCmdSource::new();

        let listener = CmdListener::spawn(
            Box::new(source),
            inbox,
            DEFAULT_LISTEN_TIMEOUT
        ).unwrap();

        let start = Instant::now();
        listener.stop().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let (_tx, source) = ChannelCmdSource::new();

        let r = CmdListener::spawn(
            Box::new(source),
            Arc::new(CommandInbox::new()),
            Duration::from_millis(0)
        );

        assert!(matches!(r, Err(ListenerError::ZeroTimeout)));
    }

    #[test]
    fn test_exits_on_disconnect() {
        let inbox = Arc::new(CommandInbox::new());
        let (tx, source) = ChannelCmdSource::new();

        let listener = CmdListener::spawn(
            Box::new(source),
            inbox,
            DEFAULT_LISTEN_TIMEOUT
        ).unwrap();

        drop(tx);
        wait_for(|| !listener.is_alive());
        listener.stop().unwrap();
    }

    struct ClosingSource {
        closed: Arc<AtomicBool>,
    }

    impl CmdSource for ClosingSource {
        fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<VelCmd>, CmdSourceError> {
            thread::sleep(timeout);
            Ok(None)
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::Release);
        }
    }

    #[test]
    fn test_source_closed_before_join_returns() {
        let closed = Arc::new(AtomicBool::new(false));
        let listener = CmdListener::spawn(
            Box::new(ClosingSource { closed: closed.clone() }),
            Arc::new(CommandInbox::new()),
            DEFAULT_LISTEN_TIMEOUT
        ).unwrap();

        listener.stop().unwrap();
        assert!(closed.load(Ordering::Acquire));
    }

    /// Fails once with an interrupted receive, then delivers one command.
    struct InterruptedSource {
        calls: u32,
    }

    impl CmdSource for InterruptedSource {
        fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<VelCmd>, CmdSourceError> {
            self.calls += 1;
            match self.calls {
                1 => Err(CmdSourceError::RecvError(zmq::Error::EINTR)),
                2 => Ok(Some(VelCmd::new(1.0, 0.0))),
                _ => {
                    thread::sleep(timeout);
                    Ok(None)
                }
            }
        }
    }

    #[test]
    fn test_survives_transient_recv_error() {
        let inbox = Arc::new(CommandInbox::new());
        let listener = CmdListener::spawn(
            Box::new(InterruptedSource { calls: 0 }),
            inbox.clone(),
            DEFAULT_LISTEN_TIMEOUT
        ).unwrap();

        wait_for(|| inbox.read_command() == VelCmd::new(1.0, 0.0));

        assert!(listener.is_alive());
        listener.stop().unwrap();
    }

    /// Fails on every receive.
    struct FailingSource;

    impl CmdSource for FailingSource {
        fn recv_timeout(&mut self, _timeout: Duration) -> Result<Option<VelCmd>, CmdSourceError> {
            Err(CmdSourceError::RecvError(zmq::Error::EAGAIN))
        }
    }

    #[test]
    fn test_repeated_errors_do_not_stop_listener() {
        let listener = CmdListener::spawn(
            Box::new(FailingSource),
            Arc::new(CommandInbox::new()),
            DEFAULT_LISTEN_TIMEOUT
        ).unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(listener.is_alive());

        let start = Instant::now();
        listener.stop().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
