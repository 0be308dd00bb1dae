//! Port-specific error types.
//!
//! Backend errors stay separate from the connection-level error kinds so the
//! lifecycle manager can classify an open failure before deciding how to
//! surface it.

use thiserror::Error;

/// Message fragments that mean "someone else holds this device".
const BUSY_MARKERS: [&str; 4] = ["access denied", "in use", "permission denied", "busy"];

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// The device is held by another process or access was denied.
    #[error("{0}")]
    Busy(String),

    /// Opening the port failed for any other reason.
    #[error("{0}")]
    Open(String),

    /// Listing the system's serial devices failed.
    #[error("{0}")]
    Enumeration(String),

    /// Attempted to use a link that has already been closed.
    #[error("Port is not open")]
    NotOpen,

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Build an open failure, routing access-denied/in-use messages to `Busy`.
    pub fn open_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_busy_message(&message) {
            Self::Busy(message)
        } else {
            Self::Open(message)
        }
    }

    /// Whether this error means the device is claimed by another process.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Busy(_) => true,
            Self::Io(e) => {
                e.kind() == std::io::ErrorKind::PermissionDenied || is_busy_message(&e.to_string())
            }
            Self::Serial(e) => {
                matches!(e.kind(), serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied))
                    || is_busy_message(&e.description)
            }
            _ => false,
        }
    }
}

/// Case-insensitive check for access-denied/in-use wording.
pub fn is_busy_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    BUSY_MARKERS.iter().any(|marker| lower.contains(marker))
}
