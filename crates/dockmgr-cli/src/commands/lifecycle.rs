//! Container lifecycle commands: start, stop, toggle, rm, launch, shell, logs

use super::{find_container, print_containers};
use anyhow::{bail, Context, Result};
use dockmgr_core::{ContainerManager, CoreError, LaunchCommand, ToggleOutcome};
use dockmgr_provider::LogConfig;

/// Start a container
pub async fn start(manager: &ContainerManager, container: &str) -> Result<()> {
    let info = find_container(manager, container).await?;

    if info.status.is_running() {
        println!("Container '{}' is already running", info.name);
        return Ok(());
    }

    println!("Starting '{}'...", info.name);
    manager.start(&info.id).await?;
    println!("Started '{}'", info.name);

    Ok(())
}

/// Stop a container
pub async fn stop(manager: &ContainerManager, container: &str) -> Result<()> {
    let info = find_container(manager, container).await?;

    if !info.status.is_running() {
        println!("Container '{}' is not running", info.name);
        return Ok(());
    }

    println!("Stopping '{}'...", info.name);
    manager.stop(&info.id).await?;
    println!("Stopped '{}'", info.name);

    Ok(())
}

/// Start a stopped container or stop a running one
pub async fn toggle(manager: &ContainerManager, container: &str) -> Result<()> {
    let info = find_container(manager, container).await?;

    match manager.toggle(&info.id).await? {
        ToggleOutcome::Started => println!("Started '{}'", info.name),
        ToggleOutcome::Stopped => println!("Stopped '{}'", info.name),
    }

    Ok(())
}

/// Remove a container
pub async fn remove(manager: &ContainerManager, container: &str, force: bool) -> Result<()> {
    let info = find_container(manager, container).await?;

    if info.status.is_running() && !force {
        bail!(
            "Container '{}' is running. Stop it first or use --force",
            info.name
        );
    }

    manager.remove(&info.id, force).await?;
    println!("Removed '{}'", info.name);

    Ok(())
}

/// Relaunch the command recorded for a container identity, or an explicit
/// command line
pub async fn launch(
    manager: &ContainerManager,
    identity: Option<&str>,
    command: Option<&str>,
) -> Result<()> {
    let plan = match (identity, command) {
        (_, Some(line)) => manager.launch_command(&LaunchCommand::new(line)).await?,
        (Some(identity), None) => match manager.launch(identity).await {
            Err(CoreError::RegistryEntryMissing(id)) => {
                bail!(
                    "No launch command recorded for '{}'. Run 'dockmgr commands' to see recorded ids",
                    id
                )
            }
            other => other?,
        },
        (None, None) => bail!("Nothing to launch"),
    };

    let engine = manager.provider_type().cli_binary();
    println!("Launched: {} {}", engine, plan.args.join(" "));

    // Give the engine a moment to create the container, then pick it up
    tokio::time::sleep(manager.launch_refresh_delay()).await;
    if let Some(result) = manager.reconciler().refresh_now().await {
        let snapshot = result.context("Refresh after launch failed")?;
        if let Some(name) = &plan.container_name {
            match snapshot.containers.iter().find(|c| &c.name == name) {
                Some(row) => println!("'{}' is {} ({})", row.name, row.run_status, row.identity),
                None => println!("'{}' has not appeared yet", name),
            }
        } else {
            print_containers(&snapshot);
        }
    }

    Ok(())
}

/// Open an interactive shell in an external terminal
pub async fn shell(manager: &ContainerManager, container: &str) -> Result<()> {
    let info = find_container(manager, container).await?;

    match manager.open_shell(&info.id).await {
        Ok(shell) => {
            println!(
                "Opened {} in '{}' ({})",
                shell,
                info.name,
                manager.global_config().terminal.program
            );
            Ok(())
        }
        Err(CoreError::NotRunning(name)) => bail!("Container '{}' is not running", name),
        Err(CoreError::NoShellAvailable(_)) => bail!(
            "None of the configured shells ({}) work in '{}'",
            manager.global_config().terminal.shells.join(", "),
            info.name
        ),
        Err(e) => Err(e.into()),
    }
}

/// Print a container's logs, or follow them in an external terminal
pub async fn logs(
    manager: &ContainerManager,
    container: &str,
    follow: bool,
    tail: Option<u64>,
    terminal: bool,
) -> Result<()> {
    let info = find_container(manager, container).await?;

    if terminal {
        manager.open_logs(&info.id).await?;
        println!(
            "Following logs of '{}' in {}",
            info.name,
            manager.global_config().terminal.program
        );
        return Ok(());
    }

    let config = LogConfig {
        follow,
        tail,
        timestamps: false,
    };
    let mut stream = manager.logs(&info.id, &config).await?.stream;
    let mut stdout = tokio::io::stdout();
    tokio::io::copy(&mut stream, &mut stdout)
        .await
        .context("Failed to read logs")?;

    Ok(())
}
