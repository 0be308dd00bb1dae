//! Operating-system serial backend.
//!
//! Wraps the `serialport` crate behind `SerialBackend`/`SerialLink`.

use super::error::PortError;
use super::traits::{PortConfiguration, PortObserver, SerialBackend, SerialLink};
use std::io::{ErrorKind, Write};
use tracing::debug;

/// Backend that talks to the real serial devices of this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerialBackend;

impl SystemSerialBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SerialBackend for SystemSerialBackend {
    fn list_ports(&self) -> Result<Vec<String>, PortError> {
        serialport::available_ports()
            .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
            .map_err(|e| PortError::Enumeration(e.to_string()))
    }

    fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
        observer: PortObserver,
    ) -> Result<Box<dyn SerialLink>, PortError> {
        let port = serialport::new(path, config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(|e| {
                let message = e.description.clone();
                let no_device = e.kind() == serialport::ErrorKind::NoDevice;
                let err = PortError::Serial(e);
                if err.is_busy() {
                    PortError::Busy(message)
                } else if no_device {
                    PortError::not_found(path)
                } else {
                    PortError::Open(message)
                }
            })?;

        debug!(port = %path, connection_id = observer.connection_id(), "OS port opened");

        Ok(Box::new(SystemSerialLink {
            port: Some(port),
            name: path.to_string(),
            observer,
        }))
    }
}

/// A live `serialport` connection. `port` is `None` once closed, and the
/// observer's flag is cleared at the same time.
pub struct SystemSerialLink {
    port: Option<Box<dyn serialport::SerialPort>>,
    name: String,
    observer: PortObserver,
}

impl SystemSerialLink {
    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, PortError> {
        self.port.as_mut().ok_or(PortError::NotOpen)
    }

    /// Forward an I/O failure to the observer; drop the port if the device is gone.
    fn report(&mut self, err: &std::io::Error) {
        self.observer.error(err.to_string());
        if matches!(
            err.kind(),
            ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof
        ) {
            self.port = None;
            self.observer.closed();
        }
    }
}

impl SerialLink for SystemSerialLink {
    fn observer(&self) -> &PortObserver {
        &self.observer
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let result = self.port_mut()?.write_all(data);
        match result {
            Ok(()) => Ok(data.len()),
            Err(e) => {
                self.report(&e);
                Err(PortError::Io(e))
            }
        }
    }

    fn drain(&mut self) -> Result<(), PortError> {
        let result = self.port_mut()?.flush();
        result.map_err(|e| {
            self.report(&e);
            PortError::Io(e)
        })
    }

    fn check_alive(&mut self) -> Result<(), PortError> {
        // Querying the driver fails once the handle has been revoked or the
        // device unplugged.
        self.port_mut()?
            .bytes_to_write()
            .map(|_| ())
            .map_err(PortError::Serial)
    }

    fn close(&mut self) -> Result<(), PortError> {
        if let Some(port) = self.port.take() {
            drop(port);
            self.observer.closed();
        }
        Ok(())
    }
}

impl std::fmt::Debug for SystemSerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemSerialLink")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field("baud_rate", &self.port.as_ref().and_then(|p| p.baud_rate().ok()))
            .finish()
    }
}
