//! Read-only status queries.

use super::error::{ConnectionError, ConnectionResult};
use super::registry::PortRegistry;
use crate::port::{PortError, SerialBackend};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Message used when the configured device is not enumerated.
pub const PORT_NOT_FOUND: &str = "port not found";

/// Snapshot of a port's status. Computed fresh on every probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortStatus {
    pub available: bool,
    pub open: bool,
    pub in_use: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PortStatus {
    fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            open: false,
            in_use: false,
            error: Some(error.into()),
        }
    }

    fn available(open: bool) -> Self {
        Self {
            available: true,
            open,
            in_use: open,
            error: None,
        }
    }
}

/// Correlates the OS device list with the registry.
#[derive(Debug, Clone)]
pub struct StatusProber {
    backend: Arc<dyn SerialBackend>,
    registry: PortRegistry,
}

impl StatusProber {
    pub fn new(backend: Arc<dyn SerialBackend>, registry: PortRegistry) -> Self {
        Self { backend, registry }
    }

    /// Status of `path`. Enumeration failures are reported in `error`.
    ///
    /// Never takes the link mutex, so it answers while a write is in flight.
    pub async fn probe(&self, path: &str) -> PortStatus {
        self.try_probe(path)
            .await
            .unwrap_or_else(|e| match e {
                ConnectionError::ProbeFailed(cause) => PortStatus::unavailable(cause),
                other => PortStatus::unavailable(other.to_string()),
            })
    }

    /// Like [`probe`](Self::probe) but fails with `ProbeFailed` when the
    /// device list cannot be read.
    pub async fn try_probe(&self, path: &str) -> ConnectionResult<PortStatus> {
        let ports = self.list_ports().await?;
        if !ports.iter().any(|p| p == path) {
            return Ok(PortStatus::unavailable(PORT_NOT_FOUND));
        }

        Ok(match self.registry.get() {
            Some(handle) => PortStatus::available(handle.is_open()),
            None => PortStatus::available(false),
        })
    }

    /// Names of the serial devices the OS currently enumerates.
    ///
    /// Enumeration can block on the OS, so it runs off the async workers.
    pub async fn list_ports(&self) -> ConnectionResult<Vec<String>> {
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.list_ports())
            .await
            .map_err(|e| PortError::Io(std::io::Error::other(e)))
            .and_then(|listed| listed)
            .map_err(|e| ConnectionError::ProbeFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::registry::PortHandle;
    use crate::port::{MockSerialBackend, PortConfiguration, PortObserver};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn prober(backend: &MockSerialBackend) -> (StatusProber, PortRegistry) {
        let registry = PortRegistry::new();
        (
            StatusProber::new(Arc::new(backend.clone()), registry.clone()),
            registry,
        )
    }

    fn register(backend: &MockSerialBackend, registry: &PortRegistry) -> Arc<PortHandle> {
        let (tx, _rx) = mpsc::unbounded_channel();
        let link = backend
            .open("COM6", &PortConfiguration::default(), PortObserver::new(1, tx))
            .unwrap();
        let handle = Arc::new(PortHandle::new(1, "COM6", 9600, link));
        registry.set(handle.clone());
        handle
    }

    #[tokio::test]
    async fn test_missing_device_is_unavailable() {
        let backend = MockSerialBackend::new();
        let (prober, _) = prober(&backend);

        assert_eq!(
            prober.probe("COM6").await,
            PortStatus {
                available: false,
                open: false,
                in_use: false,
                error: Some("port not found".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_device_ignores_registered_handle() {
        let backend = MockSerialBackend::with_devices(["COM6"]);
        let (prober, registry) = prober(&backend);
        register(&backend, &registry);
        backend.remove_device("COM6");

        let status = prober.probe("COM6").await;
        assert!(!status.available);
        assert!(!status.open);
        assert!(!status.in_use);
    }

    #[tokio::test]
    async fn test_enumerated_device_without_handle() {
        let backend = MockSerialBackend::with_devices(["COM6"]);
        let (prober, _) = prober(&backend);

        assert_eq!(
            prober.probe("COM6").await,
            PortStatus {
                available: true,
                open: false,
                in_use: false,
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn test_registered_handle_reports_open_and_in_use() {
        let backend = MockSerialBackend::with_devices(["COM6"]);
        let (prober, registry) = prober(&backend);
        let handle = register(&backend, &registry);

        let status = prober.probe("COM6").await;
        assert!(status.available && status.open && status.in_use);

        handle.close().unwrap();
        let status = prober.probe("COM6").await;
        assert!(status.available);
        assert!(!status.open);
        assert!(!status.in_use);
    }

    #[tokio::test]
    async fn test_enumeration_failure() {
        let backend = MockSerialBackend::with_devices(["COM6"]);
        backend.fail_enumeration("driver crashed");
        let (prober, _) = prober(&backend);

        let status = prober.probe("COM6").await;
        assert!(!status.available);
        assert_eq!(status.error.as_deref(), Some("driver crashed"));
        assert!(matches!(
            prober.try_probe("COM6").await,
            Err(ConnectionError::ProbeFailed(_))
        ));
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let json = serde_json::to_value(PortStatus::available(true)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"available": true, "open": true, "inUse": true})
        );
    }
}
