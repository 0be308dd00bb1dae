//! Servo commands against a real controller.
//!
//! # Running These Tests
//!
//! ```bash
//! TEST_PORT=/dev/ttyACM0 cargo test --features hardware-tests -- --ignored
//! ```

use servo_bridge::config::{SerialConfig, SettingsSource};
use servo_bridge::{ConnectionManager, PortStatus, ServoService, SystemSerialBackend};
use std::env;
use std::sync::Arc;

fn config_from_env() -> Option<SerialConfig> {
    let port = env::var("TEST_PORT").ok()?;
    let baud_rate = env::var("TEST_BAUD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9600);
    Some(SerialConfig {
        port,
        baud_rate,
        timeout_ms: 1000,
    })
}

fn service(config: SerialConfig) -> ServoService {
    let manager = ConnectionManager::new(Arc::new(SystemSerialBackend::new()));
    ServoService::new(manager, SettingsSource::Fixed(config))
}

#[tokio::test]
#[ignore] // Requires hardware
async fn test_real_connect_sweep_disconnect() {
    let Some(config) = config_from_env() else {
        println!("Skipping: TEST_PORT not set");
        return;
    };
    let service = service(config);

    service.connect().await.unwrap();
    for direction in ["fullleft", "left", "right", "fullright"] {
        service.command(direction).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    let report = service.status().await.unwrap();
    assert_eq!(
        report.status,
        PortStatus {
            available: true,
            open: true,
            in_use: true,
            error: None,
        }
    );

    let result = service.disconnect().await.unwrap();
    assert!(result.was_open);
}

#[tokio::test]
#[ignore] // Requires hardware
async fn test_real_port_is_enumerated() {
    let Some(config) = config_from_env() else {
        println!("Skipping: TEST_PORT not set");
        return;
    };
    let service = service(config.clone());

    let ports = service.ports().await.unwrap();
    println!("Available ports: {:?}", ports);
    assert!(ports.contains(&config.port));
}
