//! Shared test utilities for the servo bridge tests.
//!
//! - Building a service over the mock backend
//! - Booting the HTTP router on an ephemeral port
//! - JSON request helpers

#![allow(dead_code)]

use serde_json::Value;
use servo_bridge::config::{SerialConfig, SettingsSource};
use servo_bridge::rest_api::{build_router, RestContext};
use servo_bridge::{ConnectionManager, MockSerialBackend, ServoService};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Device path every test uses.
pub const PORT: &str = "COM6";

/// Serial settings pointing at [`PORT`].
pub fn serial_config() -> SerialConfig {
    SerialConfig {
        port: PORT.to_string(),
        baud_rate: 9600,
        timeout_ms: 200,
    }
}

/// Service over `backend` with fixed settings.
pub fn service(backend: &MockSerialBackend) -> ServoService {
    let manager = ConnectionManager::new(Arc::new(backend.clone()));
    ServoService::new(manager, SettingsSource::Fixed(serial_config()))
}

/// A running HTTP server backed by a mock device.
pub struct TestServer {
    pub base_url: String,
    pub backend: MockSerialBackend,
    pub service: ServoService,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Boot the router for `backend` on 127.0.0.1 with an OS-assigned port.
    pub async fn start(backend: MockSerialBackend) -> Self {
        let service = service(&backend);
        let app = build_router(RestContext {
            service: service.clone(),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            backend,
            service,
            client: reqwest::Client::new(),
        }
    }

    /// Boot with a single plugged-in device at [`PORT`].
    pub async fn with_device() -> Self {
        Self::start(MockSerialBackend::with_devices([PORT])).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path`, returning status code and JSON body.
    pub async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// POST an empty body to `path`.
    pub async fn post(&self, path: &str) -> (u16, Value) {
        let resp = self.client.post(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// POST `body` as JSON to `path`.
    pub async fn post_json(&self, path: &str, body: &Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

/// Poll `check` until it holds or one second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
