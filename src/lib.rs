//! Servo Bridge Library
//!
//! Drives a hobby servo attached to a microcontroller over a single managed
//! serial connection, and exposes connect / disconnect / status / command
//! operations over HTTP.
//!
//! # Modules
//!
//! - `port`: Backend traits, the OS backend and a mock backend
//! - `connection`: Registry, status prober, lifecycle manager and command writer
//! - `command`: Servo directions and their command bytes
//! - `service`: Route flows shared by the HTTP handlers
//! - `config`: Configuration management with TOML support
//! - `logging`: Tracing subscriber setup
//! - `error`: HTTP error mapping
//! - `rest_api`: REST API handlers (when `rest-api` feature is enabled)

pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod port;
pub mod service;

#[cfg(feature = "rest-api")]
pub mod rest_api;

// Re-export commonly used types for convenience
pub use command::{Direction, InvalidDirection};
pub use connection::{
    CommandWriter, ConnectionError, ConnectionManager, ConnectionResult, PortStatus,
    StatusProber,
};
pub use error::AppError;
pub use port::{
    MockSerialBackend, PortConfiguration, PortError, SerialBackend, SerialLink,
    SystemSerialBackend,
};
pub use service::{ServiceError, ServiceResult, ServoService};

#[cfg(feature = "rest-api")]
pub use error::AppResult;

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult, SettingsSource};
