//! Error kinds surfaced by the connection core.

use crate::port::PortError;
use thiserror::Error;

/// Failures returned by the lifecycle manager and the command writer.
///
/// Every variant keeps the underlying message so the HTTP layer can show it
/// to the user unchanged.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The device is not enumerated by the OS.
    #[error("Port {path} is not available: {detail}")]
    PortUnavailable { path: String, detail: String },

    /// The device is claimed by another process or access was denied.
    #[error("Port {path} is in use by another application")]
    PortBusy { path: String, detail: String },

    /// Opening failed for any other reason.
    #[error("Failed to open port {path}: {source}")]
    PortOpenFailed {
        path: String,
        #[source]
        source: PortError,
    },

    /// A write was attempted on a handle that reports closed.
    #[error("Port is not open")]
    PortNotOpen,

    /// Writing or draining the command failed.
    #[error("Failed to write command: {source}")]
    CommandWriteFailed {
        #[source]
        source: PortError,
    },

    /// Enumerating the OS serial devices failed.
    #[error("Failed to list serial ports: {0}")]
    ProbeFailed(String),
}

impl ConnectionError {
    /// Stable name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PortUnavailable { .. } => "PortUnavailable",
            Self::PortBusy { .. } => "PortBusy",
            Self::PortOpenFailed { .. } => "PortOpenFailed",
            Self::PortNotOpen => "PortNotOpen",
            Self::CommandWriteFailed { .. } => "CommandWriteFailed",
            Self::ProbeFailed(_) => "ProbeFailed",
        }
    }
}

/// Convenient Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;
