//! Structured logging setup, and the `opcua_core::capability::Logger`
//! adapter that lets the core log through a `slog::Logger` without
//! depending on `slog` itself.

use std::str::FromStr;

use opcua_core::capability::{LogLevel, Logger};
use slog::{crit, debug, error, info, trace, warn};
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

/// Builds a terminal logger at the given level, writing to stderr so
/// stdout stays free for protocol traffic redirected by the caller.
pub fn init(level: &str) -> slog::Logger {
    let severity = Severity::from_str(level).unwrap_or(Severity::Info);
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(severity);
    builder.destination(Destination::Stderr);
    builder.build().expect("error building terminal logger")
}

/// Adapts a `slog::Logger` to the core's `Logger` capability trait.
pub struct SlogLogger(slog::Logger);

impl SlogLogger {
    pub fn new(logger: slog::Logger) -> SlogLogger {
        SlogLogger(logger)
    }
}

impl Logger for SlogLogger {
    fn log(&self, level: LogLevel, category: &'static str, message: &str) {
        match level {
            LogLevel::Trace => trace!(self.0, "{}", message; "category" => category),
            LogLevel::Debug => debug!(self.0, "{}", message; "category" => category),
            LogLevel::Info => info!(self.0, "{}", message; "category" => category),
            LogLevel::Warning => warn!(self.0, "{}", message; "category" => category),
            LogLevel::Error => error!(self.0, "{}", message; "category" => category),
            LogLevel::Fatal => crit!(self.0, "{}", message; "category" => category),
        }
    }
}
