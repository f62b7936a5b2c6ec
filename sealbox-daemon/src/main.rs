//! Sealbox Daemon
//!
//! Background service that exposes the credential status report and the
//! provider failover dispatcher over a local Unix socket.
//!
//! # Running
//!
//! ```bash
//! cargo run -p sealbox-daemon
//! # or after install:
//! sealboxd
//! ```

use anyhow::Result;
use sealbox_daemon::{api, config, DaemonConfig};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config()?;

    init_logging(&config.log_level);

    info!("Starting Sealbox daemon...");
    info!("Loaded configuration from {:?}", config.config_path);

    run_daemon(config).await
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run_daemon(config: DaemonConfig) -> Result<()> {
    info!("Daemon starting on {:?}", config.socket_path);

    let state = api::ApiState::from_config(&config).await?;

    let server_handle = api::start_server(&config.socket_path, state).await?;

    info!("Daemon running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping server...");

    server_handle.stop().await?;

    info!("Daemon stopped");
    Ok(())
}
