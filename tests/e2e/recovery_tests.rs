//! Connection recovery through the HTTP surface: unplugged cables, ports
//! claimed by other programs and closes initiated by the OS.

use crate::common::{eventually, TestServer, PORT};
use assert_json_diff::{assert_json_eq, assert_json_include};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_unplug_and_replug() {
    let server = TestServer::with_device().await;
    server.post("/connect").await;

    server.backend.remove_device(PORT);
    let (_, body) = server.get("/status").await;
    assert_json_include!(
        actual: body,
        expected: json!({"available": false, "open": false, "inUse": false})
    );

    let (status, body) = server
        .post_json("/command", &json!({"direction": "left"}))
        .await;
    assert_eq!(status, 500);
    assert_json_eq!(
        body,
        json!({"success": false, "error": "Port COM6 is not available: port not found"})
    );

    server.backend.add_device(PORT);
    let (status, _) = server
        .post_json("/command", &json!({"direction": "left"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(server.backend.open_count(), 2);
    assert_eq!(server.backend.open_links(), 1);
}

#[tokio::test]
async fn test_port_claimed_by_another_program_is_reopened() {
    let server = TestServer::with_device().await;
    server.post("/connect").await;
    server.backend.fail_liveness_checks(1);

    let (status, _) = server
        .post_json("/command", &json!({"direction": "fullright"}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(server.backend.open_count(), 2);
    assert_eq!(server.backend.write_log(), vec![b"G".to_vec()]);
}

#[tokio::test]
async fn test_busy_open_then_success() {
    let server = TestServer::with_device().await;
    server.backend.fail_next_open("Access denied");

    let (status, body) = server.post("/connect").await;
    assert_eq!(status, 500);
    assert_json_eq!(
        body,
        json!({"success": false, "error": "Port COM6 is in use by another application"})
    );
    let (_, body) = server.get("/status").await;
    assert_json_include!(actual: body, expected: json!({"open": false}));

    let (status, body) = server.post("/connect").await;
    assert_eq!(status, 200);
    assert_json_include!(
        actual: body,
        expected: json!({"message": "Port COM6 opened successfully"})
    );
}

#[tokio::test]
async fn test_os_close_is_noticed() {
    let server = TestServer::with_device().await;
    server.post("/connect").await;

    server.backend.emit_closed();
    let registry = server.service.manager().registry().clone();
    assert!(eventually(|| registry.get().is_none()).await);

    let (_, body) = server.get("/status").await;
    assert_json_include!(actual: body, expected: json!({"available": true, "open": false}));

    let (status, _) = server
        .post_json("/command", &json!({"direction": "right"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(server.backend.open_count(), 2);
}

#[tokio::test]
async fn test_write_disconnect_then_recover() {
    let server = TestServer::with_device().await;
    server.backend.disconnect_on_next_write("device disconnected");

    let (status, _) = server
        .post_json("/command", &json!({"direction": "left"}))
        .await;
    assert_eq!(status, 500);

    let (status, _) = server
        .post_json("/command", &json!({"direction": "left"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(server.backend.open_count(), 2);
    assert_eq!(server.backend.write_log(), vec![b"L".to_vec()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commands_share_one_connection() {
    let server = TestServer::with_device().await;
    server
        .backend
        .set_open_delay(std::time::Duration::from_millis(50));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let client = server.client.clone();
        let url = server.url("/command");
        tasks.push(tokio::spawn(async move {
            client
                .post(url)
                .json(&json!({"direction": "left"}))
                .send()
                .await
                .unwrap()
                .status()
                .as_u16()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 200);
    }

    assert_eq!(server.backend.open_count(), 1);
    assert_eq!(server.backend.write_log().len(), 8);
    assert_eq!(server.backend.open_links(), 1);
}
