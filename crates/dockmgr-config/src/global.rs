//! Global configuration for dockmgr
//!
//! Located at `~/.config/dockmgr/config.toml`. The directories can be
//! redirected with `DOCKMGR_CONFIG_DIR` and `DOCKMGR_DATA_DIR`.

use crate::{ConfigError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the command registry inside the data directory
pub const REGISTRY_FILE_NAME: &str = "container-commands.json";

/// Global dockmgr configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub defaults: DefaultsConfig,
    pub registry: RegistryConfig,
    pub terminal: TerminalConfig,
    pub logging: LoggingConfig,
    pub providers: ProvidersConfig,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Container engine ("docker" or "podman"); empty means auto-detect
    pub provider: String,
    /// Seconds between periodic refreshes in `dockmgr watch`
    pub refresh_interval_secs: u64,
    /// Delay before the automatic refresh that follows a launch
    pub launch_refresh_delay_ms: u64,
    /// Grace period passed to the engine when stopping a container
    pub stop_timeout_secs: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            refresh_interval_secs: 5,
            launch_refresh_delay_ms: 1000,
            stop_timeout_secs: 10,
        }
    }
}

/// Command registry settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Override for the registry file location
    pub path: Option<PathBuf>,
}

/// External terminal used for shell and log sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Terminal emulator binary
    pub program: String,
    /// Flag that makes the emulator run a command
    pub exec_flag: String,
    /// Shells probed in order when opening a shell session
    pub shells: Vec<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            program: "xterm".to_string(),
            exec_flag: "-e".to_string(),
            shells: vec!["bash".to_string(), "sh".to_string()],
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `--verbose` is not given
    pub level: String,
    /// Write logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Provider-specific configurations
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub docker: DockerConfig,
    pub podman: PodmanConfig,
}

/// Docker-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker socket path
    pub socket: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: default_docker_socket(),
        }
    }
}

#[cfg(windows)]
fn default_docker_socket() -> String {
    "//./pipe/docker_engine".to_string()
}

#[cfg(not(windows))]
fn default_docker_socket() -> String {
    "/var/run/docker.sock".to_string()
}

/// Podman-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PodmanConfig {
    /// Podman socket path
    pub socket: String,
}

impl Default for PodmanConfig {
    fn default() -> Self {
        Self {
            socket: default_podman_socket(),
        }
    }
}

#[cfg(target_os = "linux")]
fn default_podman_socket() -> String {
    std::env::var("XDG_RUNTIME_DIR")
        .map(|dir| format!("{}/podman/podman.sock", dir))
        .unwrap_or_else(|_| "/run/user/1000/podman/podman.sock".to_string())
}

#[cfg(target_os = "macos")]
fn default_podman_socket() -> String {
    dirs::home_dir()
        .map(|h| {
            format!(
                "{}/.local/share/containers/podman/machine/podman-machine-default/podman.sock",
                h.display()
            )
        })
        .unwrap_or_else(|| "/var/run/podman.sock".to_string())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn default_podman_socket() -> String {
    "//./pipe/podman-machine-default".to_string()
}

impl GlobalConfig {
    /// Load global configuration from the default path
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load global configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        if config.terminal.shells.is_empty() {
            return Err(ConfigError::Invalid(
                "terminal.shells must list at least one shell".to_string(),
            ));
        }

        tracing::debug!(
            "Loaded config from {:?}: provider={:?}",
            path,
            config.defaults.provider
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os("DOCKMGR_CONFIG_DIR") {
            return Ok(PathBuf::from(dir).join("config.toml"));
        }
        let dirs = ProjectDirs::from("", "", "dockmgr").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os("DOCKMGR_DATA_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let dirs = ProjectDirs::from("", "", "dockmgr").ok_or(ConfigError::NoDataDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Resolve the command registry file, honouring `[registry] path`
    pub fn registry_path(&self) -> Result<PathBuf> {
        match &self.registry.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join(REGISTRY_FILE_NAME)),
        }
    }
}
