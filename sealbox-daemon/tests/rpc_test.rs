//! Integration tests for the daemon RPC API.
//!
//! These tests verify that the JSON-RPC server works correctly over Unix sockets
//! and that the status, masking, dispatch and cache operations succeed.

use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::{sleep, Duration};

use sealbox_core::{cipher, MemorySource, ProviderResult, SecurityLevel, StatusReport};
use sealbox_daemon::api::{start_server, ApiState, MaskedResponse, MessageResponse, ServerHandle};

const MASTER: &str = "5d41402abc4b2a76b9719d911017c5925d41402abc4b2a76b9719d911017c592";

/// Helper to set up a test server with unique temp directory and socket path.
/// Returns the temp directory (which must be kept alive), socket path, and server handle.
async fn setup_test_server() -> (TempDir, PathBuf, ServerHandle) {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = temp_dir.path().join("test.sock");

    let source = MemorySource::new();
    source.insert("ENCRYPTION_MASTER_PASSWORD", MASTER);
    source.insert(
        "OPENAI_API_KEY_ENCRYPTED",
        cipher::encrypt("sk-proj-abcdefghijklmnop", MASTER).unwrap(),
    );
    source.insert("GROQ_API_KEY", "gsk_plaintext_value_1234");

    let state = ApiState::with_source(source).unwrap();
    let handle = start_server(&socket_path, state).await.unwrap();

    // Give the server time to start accepting connections
    sleep(Duration::from_millis(100)).await;

    (temp_dir, socket_path, handle)
}

/// Detect whether the sandbox allows binding Unix sockets. Skip tests if not.
fn can_bind_unix_socket() -> bool {
    let path = std::env::temp_dir().join("sealbox-socket-permission-check.sock");
    let _ = fs::remove_file(&path);
    let result = std::os::unix::net::UnixListener::bind(&path);
    let ok = result.is_ok();
    let _ = fs::remove_file(&path);
    ok
}

/// Helper function to send an RPC request and receive a response.
async fn send_rpc_request<T: for<'de> Deserialize<'de>>(
    stream: &mut UnixStream,
    method: &str,
    params: serde_json::Value,
    id: u64,
) -> Result<T, Box<dyn std::error::Error>> {
    let request = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": id,
    });

    let request_str = serde_json::to_string(&request)?;
    stream.write_all(request_str.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let mut response_str = String::new();
    reader.read_line(&mut response_str).await?;

    let response: serde_json::Value = serde_json::from_str(&response_str)?;

    if let Some(error) = response.get("error") {
        return Err(format!("RPC error: {}", error).into());
    }

    let result = response.get("result").ok_or("No result in response")?;

    Ok(serde_json::from_value(result.clone())?)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_env_status() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test_env_status: Unix sockets not permitted in sandbox");
        return;
    }

    let (_temp_dir, socket_path, handle) = setup_test_server().await;

    let mut stream = UnixStream::connect(&socket_path)
        .await
        .expect("Failed to connect to daemon");

    let report: StatusReport = send_rpc_request(&mut stream, "env_status", json!([]), 1)
        .await
        .expect("env_status failed");

    assert_eq!(report.metrics.total, 5);
    assert_eq!(report.metrics.encrypted_count, 1);
    assert_eq!(report.metrics.warning_count, 1);
    assert_eq!(report.metrics.missing_count, 3);
    assert_eq!(report.security_score, 50);
    assert_eq!(report.keys["OPENAI_API_KEY"].status, SecurityLevel::Secure);
    assert_eq!(report.keys["OPENAI_API_KEY"].masked, "sk-p****************mnop");
    assert_eq!(report.keys["GROQ_API_KEY"].status, SecurityLevel::Warning);

    handle.stop().await.expect("Failed to stop server");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_masked_and_clear_cache() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test_masked_and_clear_cache: Unix sockets not permitted in sandbox");
        return;
    }

    let (_temp_dir, socket_path, handle) = setup_test_server().await;

    let mut stream = UnixStream::connect(&socket_path)
        .await
        .expect("Failed to connect to daemon");

    let masked: MaskedResponse =
        send_rpc_request(&mut stream, "masked", json!(["GROQ_API_KEY"]), 1)
            .await
            .expect("masked failed");
    assert_eq!(masked.name, "GROQ_API_KEY");
    assert_eq!(masked.masked, "gsk_****************1234");

    let missing: MaskedResponse =
        send_rpc_request(&mut stream, "masked", json!(["COHERE_API_KEY"]), 2)
            .await
            .expect("masked failed");
    assert_eq!(missing.masked, "Not set");

    let cleared: MessageResponse = send_rpc_request(&mut stream, "clear_cache", json!([]), 3)
        .await
        .expect("clear_cache failed");
    assert_eq!(cleared.message, "Cleared 1 cached credentials");

    let cleared: MessageResponse = send_rpc_request(&mut stream, "clear_cache", json!([]), 4)
        .await
        .expect("clear_cache failed");
    assert_eq!(cleared.message, "Cleared 0 cached credentials");

    handle.stop().await.expect("Failed to stop server");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispatch() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test_dispatch: Unix sockets not permitted in sandbox");
        return;
    }

    let (_temp_dir, socket_path, handle) = setup_test_server().await;

    let mut stream = UnixStream::connect(&socket_path)
        .await
        .expect("Failed to connect to daemon");

    // No providers are registered, so every dispatch ends in the demo result.
    let result: ProviderResult = send_rpc_request(
        &mut stream,
        "dispatch",
        json!(["Analyze NVDA fundamentals", "fundamental"]),
        1,
    )
    .await
    .expect("dispatch failed");

    assert!(result.success);
    assert!(result.is_demo());
    assert!(result.data.unwrap().contains("FUNDAMENTAL"));

    let result: ProviderResult =
        send_rpc_request(&mut stream, "dispatch", json!(["  ", "fundamental"]), 2)
            .await
            .expect("dispatch failed");

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("request text must not be empty"));

    handle.stop().await.expect("Failed to stop server");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_error_handling() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test_error_handling: Unix sockets not permitted in sandbox");
        return;
    }

    let (_temp_dir, socket_path, handle) = setup_test_server().await;

    let mut stream = UnixStream::connect(&socket_path)
        .await
        .expect("Failed to connect to daemon");

    // Empty credential name
    let result: Result<MaskedResponse, _> =
        send_rpc_request(&mut stream, "masked", json!([""]), 1).await;
    assert!(result.is_err());

    // Missing kind parameter
    let result: Result<ProviderResult, _> =
        send_rpc_request(&mut stream, "dispatch", json!(["text only"]), 2).await;
    assert!(result.is_err());

    handle.stop().await.expect("Failed to stop server");
}
