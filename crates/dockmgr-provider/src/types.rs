//! Common types for container providers

use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Container ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The engine's short identifier (first 12 characters)
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Container provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Docker,
    Podman,
}

impl ProviderType {
    /// Name of the engine's command-line binary
    pub fn cli_binary(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cli_binary())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            _ => Err(format!("Unknown provider type: {}", s)),
        }
    }
}

/// Container status as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Restarting => write!(f, "restarting"),
            Self::Removing => write!(f, "removing"),
            Self::Exited => write!(f, "exited"),
            Self::Dead => write!(f, "dead"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl From<&str> for ContainerStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "created" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            _ => Self::Unknown,
        }
    }
}

/// A port published on the host, as reported in the container listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPort {
    pub host_ip: Option<String>,
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: String,
}

/// Basic container info for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    pub ports: Vec<PublishedPort>,
}

impl ContainerInfo {
    /// Identity used as the command registry key
    pub fn short_id(&self) -> &str {
        self.id.short()
    }
}

/// One host-side binding of a container port
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostBinding {
    pub host_ip: Option<String>,
    pub host_port: Option<String>,
}

/// All host bindings of one container port key such as `80/tcp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBindings {
    pub container_port: String,
    pub bindings: Option<Vec<HostBinding>>,
}

/// Typed view of an inspection payload, holding what is needed to
/// recreate an equivalent container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfigRecord {
    pub id: ContainerId,
    /// Name as reported by inspection, usually with a leading `/`
    pub name: Option<String>,
    pub image: String,
    /// `Config.Cmd`
    pub command: Option<Vec<String>>,
    /// `HostConfig.AutoRemove`
    pub auto_remove: bool,
    /// `NetworkSettings.Ports`, populated while the container runs
    pub live_ports: Option<Vec<PortBindings>>,
    /// `HostConfig.PortBindings`, as requested at creation
    pub declared_ports: Option<Vec<PortBindings>>,
    /// `HostConfig.Binds`
    pub binds: Vec<String>,
    /// Names of attached networks
    pub networks: Vec<String>,
}

impl ContainerConfigRecord {
    /// A record with only the mandatory fields set
    pub fn new(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: ContainerId::new(id),
            name: None,
            image: image.into(),
            command: None,
            auto_remove: false,
            live_ports: None,
            declared_ports: None,
            binds: Vec::new(),
            networks: Vec::new(),
        }
    }
}

/// Log configuration
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Follow log output
    pub follow: bool,
    /// Number of lines from end to show
    pub tail: Option<u64>,
    /// Show timestamps
    pub timestamps: bool,
}

/// Log stream
pub struct LogStream {
    pub stream: Pin<Box<dyn AsyncRead + Send>>,
}

/// Provider information
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub provider_type: ProviderType,
    pub api_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_truncates_to_twelve() {
        let id = ContainerId::new("4f66ad9a0b2e5c8d7e9f0a1b2c3d4e5f");
        assert_eq!(id.short(), "4f66ad9a0b2e");

        let already_short = ContainerId::new("abc123");
        assert_eq!(already_short.short(), "abc123");
    }

    #[test]
    fn test_status_from_engine_state() {
        assert_eq!(ContainerStatus::from("running"), ContainerStatus::Running);
        assert_eq!(ContainerStatus::from("Exited"), ContainerStatus::Exited);
        assert_eq!(ContainerStatus::from("something-new"), ContainerStatus::Unknown);
        assert!(ContainerStatus::Running.is_running());
        assert!(!ContainerStatus::Paused.is_running());
    }

    #[test]
    fn test_provider_type_binary_and_parse() {
        assert_eq!(ProviderType::Docker.cli_binary(), "docker");
        assert_eq!("Podman".parse::<ProviderType>(), Ok(ProviderType::Podman));
        assert!("lxc".parse::<ProviderType>().is_err());
    }
}
