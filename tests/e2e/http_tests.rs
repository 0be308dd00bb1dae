//! HTTP surface tests: routes, response shapes and status codes.

use crate::common::{TestServer, PORT};
use assert_json_diff::{assert_json_eq, assert_json_include};
use pretty_assertions::assert_eq;
use serde_json::json;
use servo_bridge::MockSerialBackend;

#[tokio::test]
async fn test_health() {
    let server = TestServer::with_device().await;
    let body = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_status_without_device() {
    let server = TestServer::start(MockSerialBackend::new()).await;

    let (status, body) = server.get("/status").await;

    assert_eq!(status, 200);
    assert_json_eq!(
        body,
        json!({
            "success": true,
            "port": PORT,
            "available": false,
            "open": false,
            "inUse": false,
            "error": "port not found"
        })
    );
}

#[tokio::test]
async fn test_connect_status_disconnect_cycle() {
    let server = TestServer::with_device().await;

    let (status, body) = server.post("/connect").await;
    assert_eq!(status, 200);
    assert_json_eq!(
        body,
        json!({"success": true, "message": "Port COM6 opened successfully", "port": PORT})
    );

    let (_, body) = server.post("/connect").await;
    assert_json_include!(
        actual: body,
        expected: json!({"success": true, "message": "Port COM6 is already open"})
    );

    let (_, body) = server.get("/status").await;
    assert_json_eq!(
        body,
        json!({"success": true, "port": PORT, "available": true, "open": true, "inUse": true})
    );

    let (status, body) = server.post("/disconnect").await;
    assert_eq!(status, 200);
    assert_json_eq!(
        body,
        json!({
            "success": true,
            "message": "Port COM6 disconnected successfully",
            "port": PORT,
            "wasOpen": true
        })
    );

    let (_, body) = server.post("/disconnect").await;
    assert_json_include!(
        actual: body,
        expected: json!({"message": "Port COM6 is already closed", "wasOpen": false})
    );
    assert_eq!(server.backend.open_count(), 1);
}

#[tokio::test]
async fn test_command_writes_mapped_byte() {
    let server = TestServer::with_device().await;

    let (status, body) = server
        .post_json("/command", &json!({"direction": "fullleft"}))
        .await;

    assert_eq!(status, 200);
    assert_json_eq!(body, json!({"success": true, "direction": "fullleft"}));
    assert_eq!(server.backend.write_log(), vec![b"F".to_vec()]);
    assert_eq!(server.backend.drain_count(), 1);
}

#[tokio::test]
async fn test_every_direction_reaches_the_device() {
    let server = TestServer::with_device().await;

    for direction in ["fullleft", "left", "right", "fullright"] {
        let (status, _) = server
            .post_json("/command", &json!({ "direction": direction }))
            .await;
        assert_eq!(status, 200);
    }

    let sent: Vec<u8> = server.backend.write_log().concat();
    assert_eq!(sent, b"FLRG");
    assert_eq!(server.backend.open_count(), 1);
}

#[tokio::test]
async fn test_invalid_direction_is_rejected() {
    let server = TestServer::with_device().await;

    let (status, body) = server
        .post_json("/command", &json!({"direction": "banana"}))
        .await;

    assert_eq!(status, 400);
    assert_json_eq!(body, json!({"success": false, "error": "Invalid direction"}));
    assert_eq!(server.backend.open_count(), 0);
    assert!(server.backend.write_log().is_empty());
}

#[tokio::test]
async fn test_missing_direction_is_rejected() {
    let server = TestServer::with_device().await;

    let (status, body) = server.post_json("/command", &json!({})).await;

    assert_eq!(status, 400);
    assert_json_eq!(body, json!({"success": false, "error": "Invalid direction"}));
}

#[tokio::test]
async fn test_non_string_direction_is_rejected() {
    let server = TestServer::with_device().await;

    for direction in [json!(5), json!(true), json!({"name": "left"})] {
        let (status, body) = server
            .post_json("/command", &json!({ "direction": direction }))
            .await;
        assert_eq!(status, 400);
        assert_json_eq!(body, json!({"success": false, "error": "Invalid direction"}));
    }
    assert_eq!(server.backend.open_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let server = TestServer::with_device().await;

    let resp = server
        .client
        .post(server.url("/command"))
        .header("content-type", "application/json")
        .body("{direction")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
    assert!(server.backend.write_log().is_empty());
}

#[tokio::test]
async fn test_write_failure_is_500() {
    let server = TestServer::with_device().await;
    server.backend.fail_next_write("cable yanked");

    let (status, body) = server
        .post_json("/command", &json!({"direction": "right"}))
        .await;

    assert_eq!(status, 500);
    assert_json_eq!(
        body,
        json!({"success": false, "error": "Failed to write command: I/O error: cable yanked"})
    );
}

#[tokio::test]
async fn test_connect_without_device_is_500() {
    let server = TestServer::start(MockSerialBackend::new()).await;

    let (status, body) = server.post("/connect").await;

    assert_eq!(status, 500);
    assert_json_eq!(
        body,
        json!({"success": false, "error": "Port COM6 is not available: port not found"})
    );
}

#[tokio::test]
async fn test_ports_lists_devices() {
    let server = TestServer::start(MockSerialBackend::with_devices(["COM3", PORT])).await;

    let (status, body) = server.get("/ports").await;

    assert_eq!(status, 200);
    assert_json_eq!(body, json!({"success": true, "ports": ["COM3", "COM6"]}));
}

#[tokio::test]
async fn test_legacy_paths() {
    let server = TestServer::with_device().await;

    let (status, _) = server.post("/api/servo/connect").await;
    assert_eq!(status, 200);

    let (status, body) = server
        .post_json("/api/servo", &json!({"direction": "left"}))
        .await;
    assert_eq!(status, 200);
    assert_json_eq!(body, json!({"success": true, "direction": "left"}));

    let (_, body) = server.get("/api/servo/status").await;
    assert_json_include!(actual: body, expected: json!({"open": true}));

    let (_, body) = server.post("/api/servo/disconnect").await;
    assert_json_include!(actual: body, expected: json!({"wasOpen": true}));

    assert_eq!(server.backend.write_log(), vec![b"L".to_vec()]);
}
