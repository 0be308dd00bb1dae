//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat, SerialConfig};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SERVO_BRIDGE";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the platform config dir
const CONFIG_DIR_NAME: &str = "servo-bridge";

/// Environment variable for explicit config path
pub const CONFIG_PATH_ENV: &str = "SERVO_BRIDGE_CONFIG";

/// Legacy device path variable
pub const LEGACY_PORT_ENV: &str = "ARDUINO_PORT";

/// Legacy baud rate variable
pub const LEGACY_BAUD_ENV: &str = "ARDUINO_BAUD_RATE";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERVO_BRIDGE_CONFIG` environment variable (explicit path)
    /// 2. `./config.toml` (current directory)
    /// 3. `~/.config/servo-bridge/config.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\servo-bridge\config.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Where the serial settings for an operation come from.
///
/// `Environment` re-reads the serial overrides on every call, so a changed
/// `ARDUINO_PORT` takes effect on the next request without a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// Always the same settings.
    Fixed(SerialConfig),
    /// The given base with the current environment applied on top.
    Environment(SerialConfig),
}

impl SettingsSource {
    /// Serial settings to use for the current operation.
    pub fn resolve(&self) -> ConfigResult<SerialConfig> {
        match self {
            Self::Fixed(serial) => Ok(serial.clone()),
            Self::Environment(base) => {
                let mut serial = base.clone();
                apply_serial_overrides(&mut serial)?;
                validate_serial(&serial)?;
                Ok(serial)
            }
        }
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    if let Some(config_dir) = get_config_dir() {
        let app_config = config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content)?;
    validate_serial(&config.serial)?;
    Ok(config)
}

fn validate_serial(serial: &SerialConfig) -> ConfigResult<()> {
    if serial.port.trim().is_empty() {
        return Err(ConfigError::validation("serial.port", "must not be empty"));
    }
    if serial.baud_rate == 0 {
        return Err(ConfigError::validation(
            "serial.baud_rate",
            "must be greater than zero",
        ));
    }
    Ok(())
}

/// First set variable among `names`, with the name it was read from.
fn first_var(names: &[&str]) -> Option<(String, String)> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
}

fn parse_var<T: FromStr>(var: &str, value: &str, message: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(var, message))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERVO_BRIDGE_<SECTION>_<KEY>`
/// For example:
/// - `SERVO_BRIDGE_SERVER_PORT=8080`
/// - `SERVO_BRIDGE_SERIAL_PORT=/dev/ttyACM0`
/// - `SERVO_BRIDGE_LOGGING_FORMAT=json`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Ok(val) = std::env::var(format!("{}_SERVER_HOST", ENV_PREFIX)) {
        config.server.host = val;
    }
    let var = format!("{}_SERVER_PORT", ENV_PREFIX);
    if let Ok(val) = std::env::var(&var) {
        config.server.port = parse_var(&var, &val, "Invalid port number")?;
    }
    if let Ok(val) = std::env::var(format!("{}_SERVER_LOG_LEVEL", ENV_PREFIX)) {
        config.server.log_level = val;
    }

    apply_serial_overrides(&mut config.serial)?;

    let var = format!("{}_LOGGING_FORMAT", ENV_PREFIX);
    if let Ok(val) = std::env::var(&var) {
        config.logging.format = match val.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => {
                return Err(ConfigError::env_parse(
                    &var,
                    "Expected json, pretty or compact",
                ))
            }
        };
    }

    Ok(())
}

/// Serial overrides, including the legacy `ARDUINO_*` names.
fn apply_serial_overrides(serial: &mut SerialConfig) -> ConfigResult<()> {
    let port_var = format!("{}_SERIAL_PORT", ENV_PREFIX);
    if let Some((_, val)) = first_var(&[port_var.as_str(), LEGACY_PORT_ENV]) {
        serial.port = val;
    }

    let baud_var = format!("{}_SERIAL_BAUD_RATE", ENV_PREFIX);
    if let Some((var, val)) = first_var(&[baud_var.as_str(), LEGACY_BAUD_ENV]) {
        serial.baud_rate = parse_var(&var, &val, "Invalid baud rate")?;
    }

    let timeout_var = format!("{}_SERIAL_TIMEOUT_MS", ENV_PREFIX);
    if let Ok(val) = std::env::var(&timeout_var) {
        serial.timeout_ms = parse_var(&timeout_var, &val, "Invalid timeout")?;
    }

    Ok(())
}
