use clap::Parser;
use servo_bridge::{
    config::{Config, ConfigLoader, SettingsSource},
    logging,
    rest_api::{build_router, RestContext},
    ConnectionManager, ServoService, SystemSerialBackend,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "HTTP bridge that drives a servo over a serial connection.",
    long_about = "Serves connect, disconnect, status and command endpoints and keeps a single serial connection to the microcontroller healthy across cable pulls and competing processes."
)]
struct Args {
    /// Configuration file. Overrides the standard search locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind the HTTP server to.
    #[arg(long)]
    host: Option<String>,

    /// Port for the HTTP server.
    #[arg(short, long)]
    port: Option<u16>,

    /// Serial device the servo controller is attached to.
    #[arg(long)]
    serial_port: Option<String>,

    /// Baud rate for the serial device.
    #[arg(long)]
    baud_rate: Option<u32>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(serial_port) = &self.serial_port {
            config.serial.port = serial_port.clone();
        }
        if let Some(baud_rate) = self.baud_rate {
            config.serial.baud_rate = baud_rate;
        }
    }

    /// Serial settings given on the command line are pinned; otherwise the
    /// environment is consulted on every request.
    fn settings_source(&self, config: &Config) -> SettingsSource {
        if self.serial_port.is_some() || self.baud_rate.is_some() {
            SettingsSource::Fixed(config.serial.clone())
        } else {
            SettingsSource::Environment(config.serial.clone())
        }
    }
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config_path = loader.config_path.clone();
    let mut config = loader.into_config();
    args.apply(&mut config);

    logging::init(&config.logging, &config.server.log_level);
    match &config_path {
        Some(path) => info!(path = %path.display(), "Loaded configuration"),
        None => info!("No configuration file found, using defaults"),
    }

    let manager = ConnectionManager::new(Arc::new(SystemSerialBackend::new()));
    let service = ServoService::new(manager, args.settings_source(&config));
    let app = build_router(RestContext {
        service: service.clone(),
    });

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        serial_port = %config.serial.port,
        baud_rate = config.serial.baud_rate,
        "Servo bridge listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if service.shutdown().await {
        info!("Serial port released");
    }
    Ok(())
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown");
}
