//! # Logging
//!
//! Console and session log file output for the bench executable. Each line is stamped with the
//! seconds elapsed since the session started, which makes it easy to line log output up with the
//! archived controller reports.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Targets whose output is capped regardless of the requested level.
///
/// The zmq internals and the command listener (which logs every received command at trace) would
/// otherwise drown out the controller.
const CAPPED_TARGETS: &[(&str, LevelFilter)] = &[
    ("zmq", LevelFilter::Info),
    ("actuator_lib::listener", LevelFilter::Debug),
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Could not open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been installed: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// Messages go to stdout and to the session's log file. Debug and trace lines also carry their
/// target module.
///
/// # Notes
///
/// - `min_level` must be at least `log::Level::Info`.
/// - Only one logger can be installed per process, a second call fails with `FernInitError`.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                format_line(session::get_elapsed_seconds(), record, message)
            ))
        })
        .level(min_level);

    for &(target, cap) in CAPPED_TARGETS {
        dispatch = dispatch.level_for(target, cap.min(min_level));
    }

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging to {:?} at {:?}", session.log_file_path, min_level);
    info!("Session epoch: {}", session::get_epoch());

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build one log line.
fn format_line(elapsed_s: f64, record: &Record, message: &std::fmt::Arguments) -> String {
    if record.level() > Level::Info {
        format!(
            "[{:10.6} {}] {}: {}",
            elapsed_s,
            level_tag(record.level()),
            record.target(),
            message
        )
    }
    else {
        format!("[{:10.6} {}] {}", elapsed_s, level_tag(record.level()), message)
    }
}

/// Three letter, coloured tag for a level.
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info  => "INF".normal(),
        Level::Warn  => "WRN".yellow(),
        Level::Error => "ERR".red().bold()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn line(level: Level, target: &str, msg: &str) -> String {
        colored::control::set_override(false);
        format_line(
            1.5,
            &Record::builder().level(level).target(target).build(),
            &format_args!("{}", msg)
        )
    }

    #[test]
    fn test_info_line_has_no_target() {
        assert_eq!(
            line(Level::Info, "actuator_lib::plugin", "ready"),
            "[  1.500000 INF] ready"
        );
    }

    #[test]
    fn test_debug_line_has_target() {
        assert_eq!(
            line(Level::Debug, "actuator_lib::ctrl", "reset"),
            "[  1.500000 DBG] actuator_lib::ctrl: reset"
        );
    }

    #[test]
    fn test_rejects_verbose_min_level() {
        let session = Session {
            session_root: "s".into(),
            arch_root: "s/arch".into(),
            log_file_path: "s/log.log".into(),
        };

        assert!(matches!(
            logger_init(LevelFilter::Warn, &session),
            Err(LoggerInitError::InvalidMinLogLevel(LevelFilter::Warn))
        ));
    }
}
