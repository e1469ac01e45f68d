//! Interactive container selector for CLI commands

use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Select};
use dockmgr_provider::ContainerInfo;
use std::io::IsTerminal;

/// Context for filtering containers in the selector
#[derive(Debug, Clone, Copy)]
pub enum SelectionContext {
    /// Only running containers (for shell, stop)
    Running,
    /// Containers that are not running (for start)
    Stopped,
    /// All containers (for toggle, rm, logs)
    Any,
}

impl SelectionContext {
    /// Filter containers based on selection context
    pub fn filter<'a>(&self, containers: &'a [ContainerInfo]) -> Vec<&'a ContainerInfo> {
        containers.iter().filter(|c| self.matches(c)).collect()
    }

    fn matches(&self, container: &ContainerInfo) -> bool {
        match self {
            SelectionContext::Running => container.status.is_running(),
            SelectionContext::Stopped => !container.status.is_running(),
            SelectionContext::Any => true,
        }
    }

    /// Get a description for the empty state message
    fn description(&self) -> &'static str {
        match self {
            SelectionContext::Running => "running",
            SelectionContext::Stopped => "stopped",
            SelectionContext::Any => "available",
        }
    }
}

/// Line shown for a container in the selector
pub fn container_label(container: &ContainerInfo) -> String {
    let symbol = if container.status.is_running() { "●" } else { "○" };
    format!(
        "{} {} ({}, {})",
        symbol,
        container.name,
        container.short_id(),
        container.status
    )
}

fn require_tty() -> Result<()> {
    if !std::io::stdin().is_terminal() {
        bail!("Cannot show interactive selector: not a TTY. Specify the container as an argument.");
    }
    Ok(())
}

/// Interactively select a container from the list
///
/// Returns the selected container's short id, or an error if cancelled or no
/// containers are available.
pub fn select_container(
    containers: &[ContainerInfo],
    context: SelectionContext,
    prompt: &str,
) -> Result<String> {
    require_tty()?;

    let filtered = context.filter(containers);
    if filtered.is_empty() {
        bail!(
            "No {} containers found. Use 'dockmgr list' to see all containers.",
            context.description()
        );
    }

    let items: Vec<String> = filtered.iter().map(|c| container_label(c)).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact_opt()?;

    match selection {
        Some(index) => Ok(filtered[index].short_id().to_string()),
        None => bail!("Selection cancelled"),
    }
}

/// Interactively select a recorded launch command
///
/// Takes `(identity, command)` pairs and returns the chosen identity.
pub fn select_command(commands: &[(String, String)], prompt: &str) -> Result<String> {
    require_tty()?;

    if commands.is_empty() {
        bail!("No launch commands recorded yet. Run 'dockmgr list' first.");
    }

    let items: Vec<String> = commands
        .iter()
        .map(|(identity, command)| format!("{}: {}", identity, command))
        .collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact_opt()?;

    match selection {
        Some(index) => Ok(commands[index].0.clone()),
        None => bail!("Selection cancelled"),
    }
}
