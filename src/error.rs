//! Error types for the logger.
//!
//! `start` failures are returned to the caller as a [`SessionError`]. Failures
//! that happen once the read loop is running never leave the loop; they are
//! reported through the observer channel instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A start parameter was missing or not a usable number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} must be numeric, got '{value}'")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Failed to open port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Transient(#[from] io::Error),

    #[error("Device channel closed: {0}")]
    Closed(String),
}

impl DeviceError {
    /// Sort a read/write failure into "try again" or "the link is gone".
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset => DeviceError::Closed(err.to_string()),
            _ => DeviceError::Transient(err),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, DeviceError::Closed(_))
    }
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Cannot create CSV file {}: {source}", .path.display())]
    Init {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to append to {}: {source}", .path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Logging is already running")]
    AlreadyRunning,

    #[error("Invalid start parameters: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    DeviceOpen(DeviceError),

    #[error(transparent)]
    LogInit(#[from] LogError),
}
