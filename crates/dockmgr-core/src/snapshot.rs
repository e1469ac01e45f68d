//! Display-ready results of one refresh cycle

use crate::LaunchCommand;
use chrono::{DateTime, Utc};
use dockmgr_provider::{ContainerInfo, ContainerStatus, PublishedPort};
use serde::Serialize;

/// Port column value for a container without published ports
pub const NO_PUBLISHED_PORTS: &str = "N/A";

/// Two-state run status shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Stopped,
}

impl From<ContainerStatus> for RunStatus {
    fn from(status: ContainerStatus) -> Self {
        if status.is_running() {
            Self::Running
        } else {
            Self::Stopped
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// One row of the container table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSnapshot {
    /// Short id, also the registry key
    pub identity: String,
    pub name: String,
    pub image: String,
    pub run_status: RunStatus,
    /// Unreduced engine state
    pub engine_status: ContainerStatus,
    /// `hostPort->containerPort/proto` for each published port
    pub ports: Vec<String>,
}

impl ContainerSnapshot {
    pub fn from_info(info: &ContainerInfo) -> Self {
        Self {
            identity: info.short_id().to_string(),
            name: info.name.clone(),
            image: info.image.clone(),
            run_status: RunStatus::from(info.status),
            engine_status: info.status,
            ports: info.ports.iter().filter_map(port_summary).collect(),
        }
    }

    /// Ports joined for a single column, or `N/A`
    pub fn port_summary(&self) -> String {
        if self.ports.is_empty() {
            NO_PUBLISHED_PORTS.to_string()
        } else {
            self.ports.join(", ")
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_status == RunStatus::Running
    }
}

fn port_summary(port: &PublishedPort) -> Option<String> {
    port.host_port
        .map(|host| format!("{}->{}/{}", host, port.container_port, port.protocol))
}

/// Everything a front end needs to render after a refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSnapshot {
    /// Containers in engine listing order (name ascending)
    pub containers: Vec<ContainerSnapshot>,
    /// Registry view: command and the identity that owns it, in file order
    pub commands: Vec<(LaunchCommand, String)>,
    /// Commands newly recorded during this cycle
    pub synthesized: usize,
    pub refreshed_at: DateTime<Utc>,
}

impl RefreshSnapshot {
    pub fn find(&self, identity: &str) -> Option<&ContainerSnapshot> {
        self.containers.iter().find(|c| c.identity == identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockmgr_provider::ContainerId;

    fn info(status: ContainerStatus, ports: Vec<PublishedPort>) -> ContainerInfo {
        ContainerInfo {
            id: ContainerId::new("0123456789abcdef0123"),
            name: "web".to_string(),
            image: "nginx".to_string(),
            status,
            ports,
        }
    }

    #[test]
    fn test_run_status_reduction() {
        assert_eq!(RunStatus::from(ContainerStatus::Running), RunStatus::Running);
        for status in [
            ContainerStatus::Created,
            ContainerStatus::Paused,
            ContainerStatus::Exited,
            ContainerStatus::Dead,
            ContainerStatus::Unknown,
        ] {
            assert_eq!(RunStatus::from(status), RunStatus::Stopped);
        }
    }

    #[test]
    fn test_snapshot_from_info() {
        let snapshot = ContainerSnapshot::from_info(&info(
            ContainerStatus::Running,
            vec![
                PublishedPort {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(8080),
                    container_port: 80,
                    protocol: "tcp".to_string(),
                },
                PublishedPort {
                    host_ip: None,
                    host_port: None,
                    container_port: 443,
                    protocol: "tcp".to_string(),
                },
            ],
        ));

        assert_eq!(snapshot.identity, "0123456789ab");
        assert!(snapshot.is_running());
        assert_eq!(snapshot.ports, vec!["8080->80/tcp"]);
        assert_eq!(snapshot.port_summary(), "8080->80/tcp");
    }

    #[test]
    fn test_port_summary_without_ports() {
        let snapshot = ContainerSnapshot::from_info(&info(ContainerStatus::Exited, Vec::new()));
        assert_eq!(snapshot.run_status, RunStatus::Stopped);
        assert_eq!(snapshot.port_summary(), NO_PUBLISHED_PORTS);
    }
}
