//! Single-command writes with a health check right before the OS write.

use super::error::{ConnectionError, ConnectionResult};
use super::manager::ConnectionManager;
use super::registry::PortHandle;
use crate::port::{PortConfiguration, PortError};
use std::sync::Arc;
use tracing::{debug, error};

/// Sends one command at a time over the managed connection.
#[derive(Clone, Debug)]
pub struct CommandWriter {
    manager: ConnectionManager,
}

impl CommandWriter {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Write `command` to `path`, opening the port if necessary.
    ///
    /// Returns once the transmit buffer has been drained. Failed commands are
    /// not retried.
    ///
    /// # Errors
    ///
    /// - any error of [`ConnectionManager::ensure_open`]
    /// - `ConnectionError::PortNotOpen` if the handle reports closed right
    ///   before the write
    /// - `ConnectionError::CommandWriteFailed` if the write or drain fails
    pub async fn send(
        &self,
        path: &str,
        config: &PortConfiguration,
        command: &str,
    ) -> ConnectionResult<()> {
        let session = self.manager.lock().await;

        session.recover_stale(path).await;
        let handle = session.ensure_open(path, config).await?;

        match transmit(handle, command.as_bytes().to_vec()).await {
            Err(ConnectionError::CommandWriteFailed { source }) => {
                error!(port = %path, error = %source, "Failed to write to serial port");
                session.recover_stale(path).await;
                Err(ConnectionError::CommandWriteFailed { source })
            }
            other => other,
        }
    }
}

/// Write and drain `payload`, refusing to touch a handle that reports closed.
///
/// The write and the drain block until the OS is done, so both run on the
/// blocking pool.
pub(crate) async fn transmit(handle: Arc<PortHandle>, payload: Vec<u8>) -> ConnectionResult<()> {
    if !handle.is_open() {
        return Err(ConnectionError::PortNotOpen);
    }

    let port = handle.clone();
    let bytes = payload.len();
    tokio::task::spawn_blocking(move || port.write(&payload).and_then(|_| port.drain()))
        .await
        .map_err(|e| PortError::Io(std::io::Error::other(e)))
        .and_then(|written| written)
        .map_err(|source| ConnectionError::CommandWriteFailed { source })?;

    debug!(
        port = %handle.path(),
        connection_id = handle.id(),
        bytes,
        "Command written and drained"
    );
    Ok(())
}
