//! Core traits for the serial backend seam.
//!
//! `SerialBackend` enumerates and opens devices; `SerialLink` is one live
//! connection. Both the OS implementation and the mock sit behind these
//! traits so the connection manager never touches `serialport` directly.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Connection parameters for a serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Upper bound for a single OS write.
    pub timeout: Duration,
}

impl PortConfiguration {
    /// Configuration at the given baud rate with the default write timeout.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Asynchronous notification raised by a link after it was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEvent {
    /// Connection the event belongs to.
    pub connection_id: u64,
    pub kind: PortEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEventKind {
    /// The OS layer reported an error on the link.
    Error(String),
    /// The link was closed, by us or by the OS.
    Closed,
}

/// Sender side of the event channel, handed to a backend before it opens a port.
///
/// Also carries the connection's open flag. Clones share it, so the flag can
/// be read without touching the link while a write is in progress.
#[derive(Debug, Clone)]
pub struct PortObserver {
    connection_id: u64,
    tx: mpsc::UnboundedSender<PortEvent>,
    open: Arc<AtomicBool>,
}

impl PortObserver {
    pub fn new(connection_id: u64, tx: mpsc::UnboundedSender<PortEvent>) -> Self {
        Self {
            connection_id,
            tx,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Mark the connection closed without notifying the manager.
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Report an asynchronous error on this connection.
    pub fn error(&self, message: impl Into<String>) {
        self.emit(PortEventKind::Error(message.into()));
    }

    /// Mark the connection closed and report it. Only the first call emits.
    pub fn closed(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.emit(PortEventKind::Closed);
        }
    }

    fn emit(&self, kind: PortEventKind) {
        // A dropped receiver only means the manager is shutting down.
        let _ = self.tx.send(PortEvent {
            connection_id: self.connection_id,
            kind,
        });
    }
}

/// Access to the operating system's serial devices.
pub trait SerialBackend: Send + Sync + std::fmt::Debug {
    /// Names of all serial devices the OS currently enumerates.
    fn list_ports(&self) -> Result<Vec<String>, PortError>;

    /// Open `path`. The observer is attached before the OS open call and
    /// receives every later error/close notification for this link.
    fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
        observer: PortObserver,
    ) -> Result<Box<dyn SerialLink>, PortError>;
}

/// One live serial connection.
pub trait SerialLink: Send + std::fmt::Debug {
    /// Observer attached at open time. Its flag is the link's open state.
    fn observer(&self) -> &PortObserver;

    /// Whether the OS connection is still open.
    fn is_open(&self) -> bool {
        self.observer().is_open()
    }

    /// Write the whole payload. Returns the number of bytes written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Block until the transmit buffer has been flushed to the device.
    fn drain(&mut self) -> Result<(), PortError>;

    /// Cheap liveness check; an error means the handle is no longer usable.
    fn check_alive(&mut self) -> Result<(), PortError>;

    /// Close the OS connection. Closing twice is a no-op.
    fn close(&mut self) -> Result<(), PortError>;
}
