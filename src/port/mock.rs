//! Mock serial backend for testing.
//!
//! `MockSerialBackend` simulates the OS device list and the links it opens
//! without requiring hardware. Clones share state, so a test keeps one clone
//! for scripting failures and inspecting writes while the connection manager
//! owns another.

use super::error::PortError;
use super::traits::{PortConfiguration, PortObserver, SerialBackend, SerialLink};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Inner state of the mock backend.
#[derive(Debug, Default)]
struct MockBackendState {
    /// Devices reported by `list_ports`.
    devices: Vec<String>,
    /// When set, enumeration fails with this message.
    enumeration_error: Option<String>,
    /// Scripted failures for upcoming open calls.
    open_failures: VecDeque<String>,
    /// Simulated latency of an OS open call.
    open_delay: Option<Duration>,
    /// Number of OS-level open attempts.
    open_count: usize,
    /// Every payload successfully written, across all links.
    write_log: Vec<Vec<u8>>,
    /// Scripted failures for upcoming writes; `true` also drops the link.
    write_failures: VecDeque<(String, bool)>,
    /// Scripted failures for upcoming drains.
    drain_failures: VecDeque<String>,
    /// Simulated time for the transmit buffer to empty.
    drain_delay: Option<Duration>,
    /// Number of completed drains.
    drain_count: usize,
    /// Scripted failures for upcoming closes. A failed close leaves the link open.
    close_failures: VecDeque<String>,
    /// Number of upcoming liveness checks that should fail.
    liveness_failures: usize,
    /// Observers of the opened links, in open order.
    links: Vec<PortObserver>,
}

/// Mock serial backend.
///
/// # Example
/// ```
/// use servo_bridge::port::{
///     MockSerialBackend, PortConfiguration, PortObserver, SerialBackend, SerialLink,
/// };
/// use tokio::sync::mpsc;
///
/// let backend = MockSerialBackend::with_devices(["COM6"]);
/// let (tx, _rx) = mpsc::unbounded_channel();
///
/// let mut link = backend
///     .open("COM6", &PortConfiguration::default(), PortObserver::new(1, tx))
///     .unwrap();
/// link.write_bytes(b"F").unwrap();
///
/// assert_eq!(backend.open_count(), 1);
/// assert_eq!(backend.write_log(), vec![b"F".to_vec()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSerialBackend {
    state: Arc<Mutex<MockBackendState>>,
}

impl MockSerialBackend {
    /// Create a backend with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that enumerates the given devices.
    pub fn with_devices<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        backend.state.lock().devices = devices.into_iter().map(Into::into).collect();
        backend
    }

    /// Plug in a device.
    pub fn add_device(&self, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.state.lock();
        if !state.devices.contains(&name) {
            state.devices.push(name);
        }
    }

    /// Unplug a device. Links to it stay registered until the manager notices.
    pub fn remove_device(&self, name: &str) {
        self.state.lock().devices.retain(|d| d != name);
    }

    /// Make every enumeration fail with `message` until cleared.
    pub fn fail_enumeration(&self, message: impl Into<String>) {
        self.state.lock().enumeration_error = Some(message.into());
    }

    /// Make the next open call fail with `message`.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.state.lock().open_failures.push_back(message.into());
    }

    /// Make every open call take `delay` before completing.
    pub fn set_open_delay(&self, delay: Duration) {
        self.state.lock().open_delay = Some(delay);
    }

    /// Make the next write fail with `message`.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        self.state.lock().write_failures.push_back((message.into(), false));
    }

    /// Make the next write fail as if the device vanished mid-write: the
    /// link closes and its observer is notified.
    pub fn disconnect_on_next_write(&self, message: impl Into<String>) {
        self.state.lock().write_failures.push_back((message.into(), true));
    }

    /// Make the next drain fail with `message`.
    pub fn fail_next_drain(&self, message: impl Into<String>) {
        self.state.lock().drain_failures.push_back(message.into());
    }

    /// Make every drain take `delay` before completing.
    pub fn set_drain_delay(&self, delay: Duration) {
        self.state.lock().drain_delay = Some(delay);
    }

    /// Make the next close fail with `message`.
    pub fn fail_next_close(&self, message: impl Into<String>) {
        self.state.lock().close_failures.push_back(message.into());
    }

    /// Make the next `count` liveness checks fail.
    pub fn fail_liveness_checks(&self, count: usize) {
        self.state.lock().liveness_failures = count;
    }

    /// Number of OS-level open attempts so far.
    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    /// Get a copy of all data written through any link.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Number of completed drains.
    pub fn drain_count(&self) -> usize {
        self.state.lock().drain_count
    }

    /// Number of links that are still open.
    pub fn open_links(&self) -> usize {
        self.state
            .lock()
            .links
            .iter()
            .filter(|observer| observer.is_open())
            .count()
    }

    /// Close the most recent link behind the manager's back, without a notification.
    pub fn drop_link(&self) {
        if let Some(observer) = self.latest_link() {
            observer.mark_closed();
        }
    }

    /// Raise an asynchronous error on the most recent link.
    pub fn emit_error(&self, message: impl Into<String>) {
        if let Some(observer) = self.latest_link() {
            observer.error(message);
        }
    }

    /// Close the most recent link from the OS side and notify its observer.
    pub fn emit_closed(&self) {
        if let Some(observer) = self.latest_link() {
            observer.closed();
        }
    }

    fn latest_link(&self) -> Option<PortObserver> {
        self.state.lock().links.last().cloned()
    }
}

impl SerialBackend for MockSerialBackend {
    fn list_ports(&self) -> Result<Vec<String>, PortError> {
        let state = self.state.lock();
        match &state.enumeration_error {
            Some(message) => Err(PortError::Enumeration(message.clone())),
            None => Ok(state.devices.clone()),
        }
    }

    fn open(
        &self,
        path: &str,
        _config: &PortConfiguration,
        observer: PortObserver,
    ) -> Result<Box<dyn SerialLink>, PortError> {
        let delay = {
            let mut state = self.state.lock();
            state.open_count += 1;
            state.open_delay
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if let Some(message) = state.open_failures.pop_front() {
            return Err(PortError::open_failure(message));
        }
        if !state.devices.iter().any(|d| d == path) {
            return Err(PortError::not_found(path));
        }

        state.links.push(observer.clone());

        Ok(Box::new(MockLink {
            name: path.to_string(),
            observer,
            backend: self.state.clone(),
        }))
    }
}

/// A link opened by `MockSerialBackend`.
struct MockLink {
    name: String,
    observer: PortObserver,
    backend: Arc<Mutex<MockBackendState>>,
}

impl MockLink {
    fn ensure_open(&self) -> Result<(), PortError> {
        if self.observer.is_open() {
            Ok(())
        } else {
            Err(PortError::NotOpen)
        }
    }
}

impl SerialLink for MockLink {
    fn observer(&self) -> &PortObserver {
        &self.observer
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.ensure_open()?;
        let mut state = self.backend.lock();
        if let Some((message, disconnect)) = state.write_failures.pop_front() {
            if disconnect && self.observer.is_open() {
                self.observer.error(message.clone());
                self.observer.closed();
            }
            return Err(PortError::Io(std::io::Error::other(message)));
        }
        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn drain(&mut self) -> Result<(), PortError> {
        self.ensure_open()?;
        let delay = self.backend.lock().drain_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = self.backend.lock();
        if let Some(message) = state.drain_failures.pop_front() {
            return Err(PortError::Io(std::io::Error::other(message)));
        }
        state.drain_count += 1;
        Ok(())
    }

    fn check_alive(&mut self) -> Result<(), PortError> {
        self.ensure_open()?;
        let mut state = self.backend.lock();
        if state.liveness_failures > 0 {
            state.liveness_failures -= 1;
            return Err(PortError::Busy(format!("Access denied: {}", self.name)));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), PortError> {
        if let Some(message) = self.backend.lock().close_failures.pop_front() {
            return Err(PortError::Io(std::io::Error::other(message)));
        }
        self.observer.closed();
        Ok(())
    }
}

impl std::fmt::Debug for MockLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLink")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}
