//! Launch command reconstruction
//!
//! Turns an inspection record into the single-line `run ...` invocation that
//! would recreate an equivalent container. The engine binary name is not part
//! of the stored command; it is prepended when the command is launched.

use dockmgr_provider::{ContainerConfigRecord, HostBinding, PortBindings};
use serde::{Deserialize, Serialize};

/// Network every container joins unless told otherwise
const DEFAULT_NETWORK: &str = "bridge";

/// A reconstructed launch command, e.g. `run --rm --name web -p 8080:80 nginx`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchCommand(String);

impl LaunchCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self(command.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full command line with the engine binary in front
    pub fn with_binary(&self, binary: &str) -> String {
        format!("{} {}", binary, self.0)
    }
}

impl std::fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LaunchCommand {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build the launch command for an inspected container.
///
/// Returns `None` when the record has no image, since nothing runnable can be
/// produced from it. The output depends only on the record.
pub fn synthesize(record: &ContainerConfigRecord) -> Option<LaunchCommand> {
    if record.image.trim().is_empty() {
        tracing::warn!(
            "Cannot reconstruct a launch command for {}: no image in inspection record",
            record.id.short()
        );
        return None;
    }

    let mut parts: Vec<String> = vec!["run".to_string()];

    if record.auto_remove {
        parts.push("--rm".to_string());
    }

    if let Some(name) = container_name(record) {
        parts.push("--name".to_string());
        parts.push(name.to_string());
    }

    for port in published_ports(record) {
        let container_port = port
            .container_port
            .split('/')
            .next()
            .unwrap_or(&port.container_port);
        for binding in port.bindings.iter().flatten() {
            parts.push("-p".to_string());
            parts.push(port_mapping(binding, container_port));
        }
    }

    for bind in record.binds.iter().filter(|b| !b.is_empty()) {
        parts.push("-v".to_string());
        parts.push(bind.clone());
    }

    for network in record.networks.iter() {
        if network != DEFAULT_NETWORK {
            parts.push("--network".to_string());
            parts.push(network.clone());
        }
    }

    parts.push(record.image.clone());

    if let Some(args) = &record.command {
        if !args.is_empty() {
            parts.push(args.join(" "));
        }
    }

    Some(LaunchCommand(parts.join(" ").trim().to_string()))
}

/// Inspection names carry a leading `/`; exactly one is dropped
fn container_name(record: &ContainerConfigRecord) -> Option<&str> {
    let name = record.name.as_deref()?;
    let name = name.strip_prefix('/').unwrap_or(name);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Live bindings win; the declared ones are used when the container is not
/// running and the live map is absent or empty
fn published_ports(record: &ContainerConfigRecord) -> &[PortBindings] {
    match record.live_ports.as_deref() {
        Some(live) if !live.is_empty() => live,
        _ => record.declared_ports.as_deref().unwrap_or(&[]),
    }
}

fn port_mapping(binding: &HostBinding, container_port: &str) -> String {
    match (binding.host_ip.as_deref(), binding.host_port.as_deref()) {
        (Some(ip), Some(port)) => format!("{}:{}:{}", ip, port, container_port),
        (None, Some(port)) => format!("{}:{}", port, container_port),
        _ => container_port.to_string(),
    }
}
