//! JSON-RPC API for daemon IPC.
//!
//! This module provides a JSON-RPC interface over a Unix socket exposing the
//! credential status report and the provider failover dispatcher.

pub mod handlers;
pub mod server;
pub mod types;

pub use handlers::{ApiState, SealboxApiImpl, SealboxApiServer};
pub use server::{start_server, ServerHandle};
pub use types::*;
