//! Connection lifecycle: open, reuse, validate and close the single port.
//!
//! # State machine
//!
//! ```text
//! Closed ──ensure_open──> Opening ──ok──> Open ──close / observer──> Closed
//!                            └──err──> Closed
//! ```
//!
//! A handle that is registered but no longer usable (closed by the OS,
//! unplugged, claimed by someone else) is *stale*. Every operation resolves a
//! stale handle back to Closed before doing anything else.
//!
//! All mutations happen under one async operation lock, including the
//! reactions to observer events, so there is never more than one open in
//! flight. Calls that can block on the OS run on the blocking pool while the
//! lock is held.

use super::error::{ConnectionError, ConnectionResult};
use super::prober::{PortStatus, StatusProber, PORT_NOT_FOUND};
use super::registry::{PortHandle, PortRegistry};
use crate::port::{
    is_busy_message, PortConfiguration, PortError, PortEvent, PortEventKind, PortObserver,
    SerialBackend,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Owner of the serial connection.
///
/// Built once per process and shared by cloning; clones refer to the same
/// registry and lock.
#[derive(Clone, Debug)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    backend: Arc<dyn SerialBackend>,
    registry: PortRegistry,
    prober: StatusProber,
    op_lock: Mutex<()>,
    events: mpsc::UnboundedSender<PortEvent>,
    next_id: AtomicU64,
}

impl ConnectionManager {
    /// Create a manager over `backend`.
    ///
    /// Spawns the observer listener, so this must run inside a Tokio runtime.
    pub fn new(backend: Arc<dyn SerialBackend>) -> Self {
        let registry = PortRegistry::new();
        let prober = StatusProber::new(backend.clone(), registry.clone());
        let (events, rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            backend,
            registry,
            prober,
            op_lock: Mutex::new(()),
            events,
            next_id: AtomicU64::new(1),
        });
        tokio::spawn(listen(Arc::downgrade(&inner), rx));

        Self { inner }
    }

    pub fn registry(&self) -> &PortRegistry {
        &self.inner.registry
    }

    pub fn prober(&self) -> &StatusProber {
        &self.inner.prober
    }

    /// Current status of `path`. Does not take the operation lock.
    pub async fn probe(&self, path: &str) -> PortStatus {
        self.inner.prober.probe(path).await
    }

    /// Return a live handle for `path`, opening the port if needed.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::ProbeFailed` if the device list cannot be read
    /// - `ConnectionError::PortUnavailable` if the device is not enumerated
    /// - `ConnectionError::PortBusy` if another process holds the device
    /// - `ConnectionError::PortOpenFailed` for any other open failure
    pub async fn ensure_open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> ConnectionResult<Arc<PortHandle>> {
        self.lock().await.ensure_open(path, config).await
    }

    /// Close the registered handle. Returns whether an open port was closed.
    ///
    /// The registry is always emptied, even if the OS close fails.
    pub async fn close(&self) -> bool {
        self.lock().await.close()
    }

    /// Drop the registered handle if it is no longer usable for `path`.
    pub async fn recover_stale(&self, path: &str) {
        self.lock().await.recover_stale(path).await;
    }

    /// Acquire the operation lock.
    pub(crate) async fn lock(&self) -> Session<'_> {
        Session {
            inner: &self.inner,
            _guard: self.inner.op_lock.lock().await,
        }
    }
}

/// Exclusive access to the connection for the duration of one operation.
pub(crate) struct Session<'a> {
    inner: &'a Inner,
    _guard: MutexGuard<'a, ()>,
}

impl Session<'_> {
    pub(crate) async fn recover_stale(&self, path: &str) {
        self.inner.recover_stale(path).await;
    }

    pub(crate) async fn ensure_open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> ConnectionResult<Arc<PortHandle>> {
        self.inner.ensure_open(path, config).await
    }

    pub(crate) fn close(&self) -> bool {
        self.inner.close()
    }
}

impl Inner {
    async fn recover_stale(&self, path: &str) {
        let Some(handle) = self.registry.get() else {
            return;
        };

        if handle.path() != path {
            info!(
                port = %handle.path(),
                requested = %path,
                "Configured port changed, releasing previous connection"
            );
            self.discard(&handle);
            return;
        }

        match self.prober.try_probe(path).await {
            Ok(status) if !status.open || !status.available => {
                info!(port = %path, "Port is closed or unavailable, cleaning up");
                self.discard(&handle);
            }
            Ok(_) => {
                if let Err(e) = handle.check_alive() {
                    warn!(
                        port = %path,
                        error = %e,
                        "Port appears to be in use by another process, closing"
                    );
                    self.discard(&handle);
                }
            }
            Err(e) => {
                error!(port = %path, error = %e, "Error checking port status, forcing cleanup");
                self.discard(&handle);
            }
        }
    }

    async fn ensure_open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> ConnectionResult<Arc<PortHandle>> {
        self.recover_stale(path).await;

        if let Some(handle) = self.registry.get() {
            if handle.is_open() {
                debug!(port = %path, connection_id = handle.id(), "Reusing open serial port");
                return Ok(handle);
            }
        }

        let status = self.prober.try_probe(path).await?;
        if !status.available {
            return Err(ConnectionError::PortUnavailable {
                path: path.to_string(),
                detail: status.error.unwrap_or_else(|| PORT_NOT_FOUND.to_string()),
            });
        }

        if let Some(stale) = self.registry.get() {
            self.discard(&stale);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let observer = PortObserver::new(id, self.events.clone());

        let opened = {
            let backend = self.backend.clone();
            let path = path.to_string();
            let config = config.clone();
            tokio::task::spawn_blocking(move || backend.open(&path, &config, observer))
                .await
                .map_err(|e| PortError::Io(std::io::Error::other(e)))
                .and_then(|opened| opened)
        };

        match opened {
            Ok(link) => {
                let handle = Arc::new(PortHandle::new(id, path, config.baud_rate, link));
                self.registry.set(handle.clone());
                info!(
                    port = %path,
                    baud_rate = config.baud_rate,
                    connection_id = id,
                    "Serial port opened successfully"
                );
                Ok(handle)
            }
            Err(e) if e.is_busy() => {
                self.registry.clear();
                warn!(port = %path, error = %e, "Port is in use by another application");
                Err(ConnectionError::PortBusy {
                    path: path.to_string(),
                    detail: e.to_string(),
                })
            }
            Err(e) => {
                self.registry.clear();
                error!(port = %path, error = %e, "Failed to open serial port");
                Err(ConnectionError::PortOpenFailed {
                    path: path.to_string(),
                    source: e,
                })
            }
        }
    }

    fn close(&self) -> bool {
        let Some(handle) = self.registry.clear() else {
            return false;
        };

        let was_open = handle.is_open();
        if was_open {
            match handle.close() {
                Ok(()) => info!(port = %handle.path(), connection_id = handle.id(), "Serial port closed"),
                Err(e) => error!(port = %handle.path(), error = %e, "Error closing serial port"),
            }
        }
        was_open
    }

    /// Close `handle` if still open and drop it from the registry.
    fn discard(&self, handle: &PortHandle) {
        if handle.is_open() {
            if let Err(e) = handle.close() {
                warn!(port = %handle.path(), error = %e, "Error closing stale serial port");
            }
        }
        if self.registry.get().is_some_and(|h| h.id() == handle.id()) {
            self.registry.clear();
        }
    }

    async fn handle_event(&self, event: PortEvent) {
        match &event.kind {
            PortEventKind::Error(message) => {
                error!(connection_id = event.connection_id, error = %message, "Serial port error");
            }
            PortEventKind::Closed => {
                info!(connection_id = event.connection_id, "Serial port closed");
            }
        }

        let _guard = self.op_lock.lock().await;
        let Some(current) = self.registry.get() else {
            return;
        };
        if current.id() != event.connection_id {
            debug!(
                connection_id = event.connection_id,
                current = current.id(),
                "Ignoring event from superseded connection"
            );
            return;
        }

        match event.kind {
            PortEventKind::Error(message) if is_busy_message(&message) => {
                warn!(port = %current.path(), "Port is in use, cleaning up");
                self.discard(&current);
            }
            PortEventKind::Error(_) => {}
            PortEventKind::Closed => {
                self.registry.clear();
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.registry.clear() {
            if let Err(e) = handle.close() {
                warn!(port = %handle.path(), error = %e, "Error closing serial port on shutdown");
            }
        }
    }
}

/// Drain observer events until the manager is dropped.
async fn listen(inner: Weak<Inner>, mut rx: mpsc::UnboundedReceiver<PortEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_event(event).await;
    }
    debug!("Port event listener stopped");
}
