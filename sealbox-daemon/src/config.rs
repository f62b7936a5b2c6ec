//! Daemon configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the Unix socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Logging level, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dotenv-style file to read credentials from instead of the process environment.
    #[serde(default)]
    pub env_file: Option<PathBuf>,

    /// Provider priority list; overrides `API_PRIORITY` from the credential source.
    #[serde(default)]
    pub provider_priority: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_socket_path() -> PathBuf {
    project_dirs()
        .map(|d| d.runtime_dir().unwrap_or(d.data_dir()).join("sealbox.sock"))
        .unwrap_or_else(|| PathBuf::from("/tmp/sealbox.sock"))
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            config_path: PathBuf::new(),
            log_level: default_log_level(),
            env_file: None,
            provider_priority: None,
        }
    }
}

/// Default location of the daemon configuration file.
pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().join("daemon.toml"))
        .unwrap_or_else(|| PathBuf::from("sealbox-daemon.toml"))
}

/// Load configuration from the default location or create defaults.
pub fn load_config() -> Result<DaemonConfig> {
    load_config_from(&default_config_path())
}

/// Load configuration from `config_path`, falling back to defaults when it does not exist.
pub fn load_config_from(config_path: &Path) -> Result<DaemonConfig> {
    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?
    } else {
        DaemonConfig::default()
    };

    config.config_path = config_path.to_path_buf();

    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "raibid-labs", "sealbox")
}
