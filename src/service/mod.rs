//! Service layer for the servo bridge.
//!
//! Decouples the route flows from the HTTP handlers. Every flow resolves the
//! serial settings afresh, so configuration changes apply to the next call.
//!
//! # Architecture
//!
//! ```text
//! REST API ──> ServoService ──┬──> ConnectionManager
//!                             └──> CommandWriter
//! ```

use crate::command::{Direction, InvalidDirection};
use crate::config::{ConfigError, SettingsSource};
use crate::connection::{CommandWriter, ConnectionError, ConnectionManager, PortStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

// ========== Error Types ==========

/// Errors surfaced by the route flows.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Direction name with no servo command
    #[error(transparent)]
    InvalidDirection(#[from] InvalidDirection),
    /// Connection core failure
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// Serial settings could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The open call returned but the port does not report open
    #[error("Failed to open port {0}")]
    OpenNotConfirmed(String),
}

/// Convenient Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

// ========== Response DTOs ==========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResult {
    pub message: String,
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectResult {
    pub message: String,
    pub port: String,
    pub was_open: bool,
}

/// Port status together with the path it was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub port: String,
    #[serde(flatten)]
    pub status: PortStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub direction: Direction,
}

// ========== Service Implementation ==========

/// Route flows over the shared connection.
#[derive(Debug, Clone)]
pub struct ServoService {
    manager: ConnectionManager,
    writer: CommandWriter,
    settings: Arc<SettingsSource>,
}

impl ServoService {
    pub fn new(manager: ConnectionManager, settings: SettingsSource) -> Self {
        Self {
            writer: CommandWriter::new(manager.clone()),
            manager,
            settings: Arc::new(settings),
        }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Open the configured port unless it is already open.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Connection` if the open fails
    /// - `ServiceError::OpenNotConfirmed` if the port does not report open
    ///   after a successful open call
    /// - `ServiceError::Config` if the serial settings are invalid
    pub async fn connect(&self) -> ServiceResult<ConnectResult> {
        let serial = self.settings.resolve()?;
        let port = serial.port.clone();

        let status = self.manager.probe(&port).await;
        if status.open && status.available {
            return Ok(ConnectResult {
                message: format!("Port {port} is already open"),
                port,
            });
        }

        self.manager
            .ensure_open(&port, &serial.port_configuration())
            .await
            .inspect_err(|e| {
                error!(port = %port, kind = e.kind(), error = %e, "Error connecting to port")
            })?;

        if self.manager.probe(&port).await.open {
            Ok(ConnectResult {
                message: format!("Port {port} opened successfully"),
                port,
            })
        } else {
            Err(ServiceError::OpenNotConfirmed(port))
        }
    }

    /// Close the configured port if it is open.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Config` if the serial settings are invalid
    pub async fn disconnect(&self) -> ServiceResult<DisconnectResult> {
        let port = self.settings.resolve()?.port;

        if !self.manager.probe(&port).await.open {
            return Ok(DisconnectResult {
                message: format!("Port {port} is already closed"),
                port,
                was_open: false,
            });
        }

        let was_open = self.manager.close().await;
        Ok(DisconnectResult {
            message: format!("Port {port} disconnected successfully"),
            port,
            was_open,
        })
    }

    /// Status of the configured port.
    pub async fn status(&self) -> ServiceResult<StatusReport> {
        let port = self.settings.resolve()?.port;
        let status = self.manager.probe(&port).await;
        Ok(StatusReport { port, status })
    }

    /// Move the servo.
    ///
    /// # Errors
    ///
    /// - `ServiceError::InvalidDirection` for an unknown direction name
    /// - `ServiceError::Connection` if the port cannot be opened or written
    /// - `ServiceError::Config` if the serial settings are invalid
    pub async fn command(&self, direction: &str) -> ServiceResult<CommandResult> {
        let direction: Direction = direction.parse()?;
        let serial = self.settings.resolve()?;
        let command = direction.command();

        self.writer
            .send(
                &serial.port,
                &serial.port_configuration(),
                command.encode_utf8(&mut [0; 4]),
            )
            .await
            .inspect_err(|e| error!(kind = e.kind(), error = %e, "Error controlling servo"))?;

        info!("Servo {} - Sent command: {}", direction, command);
        Ok(CommandResult { direction })
    }

    /// Serial devices the OS currently enumerates.
    pub async fn ports(&self) -> ServiceResult<Vec<String>> {
        Ok(self.manager.prober().list_ports().await?)
    }

    /// Release the port. Used on process shutdown.
    pub async fn shutdown(&self) -> bool {
        self.manager.close().await
    }
}
