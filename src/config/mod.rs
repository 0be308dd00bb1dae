//! Configuration module for the servo bridge.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERVO_BRIDGE_CONFIG` environment variable (explicit path)
//! 2. `./config.toml` (current directory)
//! 3. `~/.config/servo-bridge/config.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\servo-bridge\config.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `SERVO_BRIDGE_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERVO_BRIDGE_SERVER_PORT=8080`
//! - `SERVO_BRIDGE_SERIAL_BAUD_RATE=115200`
//!
//! `ARDUINO_PORT` and `ARDUINO_BAUD_RATE` are also honored.
//!
//! # Example
//!
//! ```rust,no_run
//! use servo_bridge::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Server port: {}", config.server.port);
//! println!("Servo on {} @ {}", config.serial.port, config.serial.baud_rate);
//! # Ok::<(), servo_bridge::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    resolve_config_path, ConfigLoader, SettingsSource, CONFIG_PATH_ENV, ENV_PREFIX,
    LEGACY_BAUD_ENV, LEGACY_PORT_ENV,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig, ServerConfig};
