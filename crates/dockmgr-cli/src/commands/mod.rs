//! CLI command implementations

mod lifecycle;
mod manage;

use anyhow::{anyhow, Result};
use dockmgr_core::{ContainerManager, RefreshSnapshot};
use dockmgr_provider::ContainerInfo;

pub use lifecycle::*;
pub use manage::*;

/// Find a container by name, full or short id, or unique id prefix
async fn find_container(manager: &ContainerManager, name_or_id: &str) -> Result<ContainerInfo> {
    manager.find(name_or_id).await.map_err(|e| {
        if e.is_not_found() {
            anyhow!("Container '{}' not found ({})", name_or_id, e)
        } else {
            anyhow!(e)
        }
    })
}

/// Print the container table of a refresh snapshot
pub fn print_containers(snapshot: &RefreshSnapshot) {
    if snapshot.containers.is_empty() {
        println!("No containers found.");
        return;
    }

    const NAME_WIDTH: usize = 24;
    const ID_WIDTH: usize = 14;
    const STATUS_WIDTH: usize = 10;

    println!(
        "  {:<NAME_WIDTH$} {:<ID_WIDTH$} {:<STATUS_WIDTH$} PORTS",
        "NAME", "ID", "STATUS"
    );
    println!("{}", "-".repeat(75));

    for container in &snapshot.containers {
        let symbol = if container.is_running() { "●" } else { "○" };
        println!(
            "{} {:<NAME_WIDTH$} {:<ID_WIDTH$} {:<STATUS_WIDTH$} {}",
            symbol,
            container.name,
            container.identity,
            container.run_status,
            container.port_summary()
        );
    }
}

/// Print the recorded launch commands as `identity: command`
pub fn print_commands<'a>(commands: impl IntoIterator<Item = (&'a str, &'a str)>) -> usize {
    let mut count = 0;
    for (identity, command) in commands {
        println!("{}: {}", identity, command);
        count += 1;
    }
    count
}
