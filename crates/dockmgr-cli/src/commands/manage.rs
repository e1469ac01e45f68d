//! Listing, watching and configuration commands

use super::{print_commands, print_containers};
use anyhow::{Context, Result};
use dockmgr_config::GlobalConfig;
use dockmgr_core::{CommandRegistry, ContainerManager, RefreshEvent};
use std::time::Duration;

/// Refresh once, then print containers and recorded launch commands
pub async fn list(manager: &ContainerManager) -> Result<()> {
    let snapshot = match manager.reconciler().refresh_now().await {
        Some(result) => result?,
        None => anyhow::bail!("A refresh is already in progress"),
    };

    print_containers(&snapshot);

    if snapshot.synthesized > 0 {
        println!("\nRecorded {} new launch command(s)", snapshot.synthesized);
    }

    if !snapshot.commands.is_empty() {
        println!("\nLaunch commands:");
        print_commands(
            snapshot
                .commands
                .iter()
                .map(|(command, identity)| (identity.as_str(), command.as_str())),
        );
    }

    Ok(())
}

/// Print the recorded launch commands without contacting the engine
pub fn commands(config: &GlobalConfig) -> Result<()> {
    let path = config
        .registry_path()
        .context("Could not determine the command registry location")?;
    let registry = CommandRegistry::load(&path);

    if registry.is_empty() {
        println!("No launch commands recorded yet ({}).", path.display());
        println!("\nRun 'dockmgr list' to record commands for existing containers.");
        return Ok(());
    }

    print_commands(
        registry
            .by_command()
            .iter()
            .map(|(command, identity)| (identity.as_str(), command.as_str())),
    );

    Ok(())
}

/// Refresh periodically and reprint the table until interrupted
pub async fn watch(manager: &ContainerManager, interval_secs: Option<u64>) -> Result<()> {
    let secs = interval_secs
        .unwrap_or(manager.global_config().defaults.refresh_interval_secs)
        .max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    let mut events = manager.reconciler().subscribe();

    println!("Refreshing every {}s, press Ctrl-C to stop", secs);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                manager.reconciler().request_refresh();
            }
            changed = events.changed() => {
                if changed.is_err() {
                    break;
                }
                let event = events.borrow_and_update().clone();
                match event {
                    Some(RefreshEvent::Completed(snapshot)) => {
                        println!("\n[{}]", snapshot.refreshed_at.format("%H:%M:%S"));
                        print_containers(&snapshot);
                        if snapshot.synthesized > 0 {
                            println!("Recorded {} new launch command(s)", snapshot.synthesized);
                        }
                    }
                    Some(RefreshEvent::Failed(message)) => {
                        eprintln!("Refresh failed: {}", message);
                    }
                    None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    Ok(())
}

/// Show or edit the global configuration
pub async fn config(edit: bool) -> Result<()> {
    let config_path = GlobalConfig::config_path()?;

    if edit {
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

        // Create config file with defaults if it doesn't exist
        if !config_path.exists() {
            GlobalConfig::default().save_to(&config_path)?;
            println!("Created default config at {:?}", config_path);
        }

        std::process::Command::new(&editor)
            .arg(&config_path)
            .status()
            .context(format!("Failed to open editor: {}", editor))?;
    } else if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("# Config file: {:?}\n", config_path);
        println!("{}", content);
    } else {
        println!("# Config file: {:?} (not created yet)\n", config_path);
        println!("# Default configuration:");
        let content = toml::to_string_pretty(&GlobalConfig::default())?;
        println!("{}", content);
        println!("\n# Run 'dockmgr config --edit' to create and edit the config file.");
    }

    Ok(())
}
