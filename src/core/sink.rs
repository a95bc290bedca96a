//! Sink trait for log output destinations
//!
//! Sinks are supplied by the caller; the tree only needs the contract below.
//! A sink that returns `Err` is never allowed to disturb the logging call: the
//! failure is wrapped in a [`SinkFailure`] and handed to the sink's own
//! [`ErrorChannel`]. A sink that panics is not caught.

use super::error::{LoggerError, Result};
use super::record::LogRecord;
use std::fmt;

pub trait Sink: Send + Sync {
    fn publish(&self, record: &LogRecord) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;

    /// Where delivery failures of this sink are reported
    fn error_channel(&self) -> &dyn ErrorChannel {
        &StderrErrorChannel
    }
}

/// Receives diagnostics for failed sink operations
pub trait ErrorChannel: Send + Sync {
    fn report(&self, failure: &SinkFailure);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Publish,
    Flush,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Publish => write!(f, "publish"),
            FailureKind::Flush => write!(f, "flush"),
        }
    }
}

/// Diagnostic record describing one failed sink operation
#[derive(Debug)]
pub struct SinkFailure {
    pub sink: String,
    pub kind: FailureKind,
    pub logger_name: String,
    /// Message of the record being delivered, absent for flush failures
    pub message: Option<String>,
    pub error: LoggerError,
}

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sink '{}' {} failed for logger '{}': {}",
            self.sink, self.kind, self.logger_name, self.error
        )
    }
}

/// Default channel: writes the failure to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrErrorChannel;

impl ErrorChannel for StderrErrorChannel {
    fn report(&self, failure: &SinkFailure) {
        eprintln!("[LOGGER ERROR] {}", failure);
    }
}

/// Deliver `record` to `sink`, routing an `Err` to the sink's error channel.
///
/// Returns `true` when the sink accepted the record.
pub(crate) fn deliver(sink: &dyn Sink, record: &LogRecord) -> bool {
    match sink.publish(record) {
        Ok(()) => true,
        Err(error) => {
            sink.error_channel().report(&SinkFailure {
                sink: sink.name().to_string(),
                kind: FailureKind::Publish,
                logger_name: record.logger_name.clone(),
                message: Some(record.message.clone()),
                error,
            });
            false
        }
    }
}

/// Flush `sink`, routing an `Err` to the sink's error channel.
pub(crate) fn flush(sink: &dyn Sink, logger_name: &str) -> bool {
    match sink.flush() {
        Ok(()) => true,
        Err(error) => {
            sink.error_channel().report(&SinkFailure {
                sink: sink.name().to_string(),
                kind: FailureKind::Flush,
                logger_name: logger_name.to_string(),
                message: None,
                error,
            });
            false
        }
    }
}
