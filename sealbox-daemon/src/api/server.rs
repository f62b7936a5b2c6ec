//! JSON-RPC server implementation with Unix socket support.

use super::handlers::{internal_error, ApiState, SealboxApiImpl, SealboxApiServer};
use anyhow::{Context, Result};
use jsonrpsee::types::{ErrorCode, ErrorObject};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a running RPC server
pub struct ServerHandle {
    socket_path: PathBuf,
    shutdown: Arc<Mutex<Option<tokio::sync::mpsc::Sender<()>>>>,
    join_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

/// Start the JSON-RPC server on a Unix socket.
///
/// # Parameters
///
/// - `socket_path`: Path to the Unix socket file
/// - `state`: API state shared across handlers
///
/// # Returns
///
/// A handle to the running server that can be used to stop it.
pub async fn start_server(socket_path: &Path, state: ApiState) -> Result<ServerHandle> {
    // Remove existing socket if present
    if socket_path.exists() {
        warn!("Removing existing socket at {:?}", socket_path);
        std::fs::remove_file(socket_path)
            .with_context(|| format!("Failed to remove existing socket at {:?}", socket_path))?;
    }

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create socket directory {:?}", parent))?;
    }

    info!("Starting JSON-RPC server on {:?}", socket_path);

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind Unix socket at {:?}", socket_path))?;

    let api = Arc::new(SealboxApiImpl::new(state));

    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);

    let server_task: JoinHandle<()> = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = rx.recv() => {
                    debug!("Server shutdown signal received");
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let api = api.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, api).await {
                                    warn!("Connection handler error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    });

    info!("JSON-RPC server started and listening");

    Ok(ServerHandle {
        socket_path: socket_path.to_path_buf(),
        shutdown: Arc::new(Mutex::new(Some(tx))),
        join_handle: Arc::new(Mutex::new(Some(server_task))),
    })
}

/// Handle a single connection: one JSON-RPC request per line.
async fn handle_connection(mut stream: UnixStream, api: Arc<SealboxApiImpl>) -> Result<()> {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;

        if n == 0 {
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(request) => process_request(request, &api).await,
            Err(e) => error_response(
                Value::Null,
                ErrorObject::owned(
                    ErrorCode::ParseError.code(),
                    format!("Parse error: {}", e),
                    None::<()>,
                ),
            ),
        };

        writer.write_all(response.to_string().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Process one parsed JSON-RPC request.
async fn process_request(request: Value, api: &SealboxApiImpl) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);

    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return error_response(
            id,
            ErrorObject::owned(
                ErrorCode::InvalidRequest.code(),
                "Invalid Request: missing method",
                None::<()>,
            ),
        );
    };

    debug!("Received request: {}", method);

    let params = request
        .get("params")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));

    let result = match method {
        "env_status" => to_result(api.env_status().await),
        "masked" => match string_param(&params, 0) {
            Ok(name) => to_result(api.masked(name).await),
            Err(e) => Err(e),
        },
        "dispatch" => match (string_param(&params, 0), string_param(&params, 1)) {
            (Ok(text), Ok(kind)) => to_result(api.dispatch(text, kind).await),
            (Err(e), _) | (_, Err(e)) => Err(e),
        },
        "clear_cache" => to_result(api.clear_cache().await),
        _ => Err(ErrorObject::owned(
            ErrorCode::MethodNotFound.code(),
            "Method not found",
            None::<()>,
        )),
    };

    match result {
        Ok(value) => json!({
            "jsonrpc": "2.0",
            "result": value,
            "id": id
        }),
        Err(error) => error_response(id, error),
    }
}

/// Positional string parameter at `index`.
fn string_param(params: &Value, index: usize) -> Result<String, ErrorObject<'static>> {
    params
        .as_array()
        .and_then(|arr| arr.get(index))
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| {
            ErrorObject::owned(
                ErrorCode::InvalidParams.code(),
                format!("Invalid params: expected string at position {}", index),
                None::<()>,
            )
        })
}

fn to_result<T: Serialize>(
    result: Result<T, ErrorObject<'static>>,
) -> Result<Value, ErrorObject<'static>> {
    result.and_then(|value| serde_json::to_value(value).map_err(internal_error))
}

fn error_response(id: Value, error: ErrorObject<'_>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": error.code(),
            "message": error.message()
        },
        "id": id
    })
}

impl ServerHandle {
    /// Stop the server and remove its socket file.
    ///
    /// Safe to call more than once.
    pub async fn stop(&self) -> Result<()> {
        if let Some(tx) = self.shutdown.lock().await.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.join_handle.lock().await.take() {
            // If the task panicked, surface the error
            handle.await?;
        }

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).with_context(|| {
                format!("Failed to remove socket file {:?}", self.socket_path)
            })?;
            info!("Socket file removed");
        }

        Ok(())
    }

    /// Path of the socket this server listens on.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}
