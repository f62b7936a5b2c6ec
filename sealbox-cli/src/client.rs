//! Daemon client for communicating with sealboxd.
//!
//! This module provides a client for connecting to the Sealbox daemon
//! over a Unix socket using line-delimited JSON-RPC.

use anyhow::Result;
use directories::ProjectDirs;
use sealbox_core::{ProviderResult, StatusReport};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

/// Response after clearing the daemon's cache.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Client for communicating with the Sealbox daemon.
pub struct DaemonClient {
    stream: Option<UnixStream>,
    next_id: u64,
}

impl DaemonClient {
    /// Attempt to connect to the daemon at the given socket path.
    ///
    /// A missing or refusing socket yields a disconnected client, not an error.
    pub async fn connect(socket_path: &Path) -> Self {
        debug!("Attempting to connect to daemon at {:?}", socket_path);

        if !socket_path.exists() {
            debug!("Socket does not exist at {:?}", socket_path);
            return Self {
                stream: None,
                next_id: 1,
            };
        }

        let stream = match UnixStream::connect(socket_path).await {
            Ok(stream) => {
                debug!("Successfully connected to daemon");
                Some(stream)
            }
            Err(e) => {
                debug!("Failed to connect to daemon: {}", e);
                None
            }
        };

        Self { stream, next_id: 1 }
    }

    /// Check if the client is connected to the daemon.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Send a JSON-RPC request and receive a response.
    async fn send_request<T: for<'de> Deserialize<'de>>(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Not connected to daemon"))?;

        let id = self.next_id;
        self.next_id += 1;

        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let request_str = serde_json::to_string(&request)?;
        debug!("Sending request: {}", method);

        stream.write_all(request_str.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let mut response_str = String::new();
        reader.read_line(&mut response_str).await?;

        let response: serde_json::Value = serde_json::from_str(&response_str)?;

        if let Some(error) = response.get("error") {
            anyhow::bail!("RPC error: {}", error);
        }

        let result = response
            .get("result")
            .ok_or_else(|| anyhow::anyhow!("No result in response"))?;

        Ok(serde_json::from_value(result.clone())?)
    }

    /// Fetch the daemon's credential status report.
    pub async fn env_status(&mut self) -> Result<StatusReport> {
        self.send_request("env_status", json!([])).await
    }

    /// Run one dispatch through the daemon.
    pub async fn dispatch(&mut self, request: &str, kind: &str) -> Result<ProviderResult> {
        self.send_request("dispatch", json!([request, kind])).await
    }

    /// Drop the daemon's cached plaintexts.
    pub async fn clear_cache(&mut self) -> Result<MessageResponse> {
        self.send_request("clear_cache", json!([])).await
    }
}

/// Get the default socket path for the daemon.
pub fn default_socket_path() -> PathBuf {
    ProjectDirs::from("com", "raibid-labs", "sealbox")
        .map(|d| d.runtime_dir().unwrap_or(d.data_dir()).join("sealbox.sock"))
        .unwrap_or_else(|| PathBuf::from("/tmp/sealbox.sock"))
}
