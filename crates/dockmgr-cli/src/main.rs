//! dockmgr - container command reconstruction and relaunch CLI

use clap::{Parser, Subcommand};
use dockmgr_cli::commands;
use dockmgr_cli::selector::{select_command, select_container, SelectionContext};
use dockmgr_config::GlobalConfig;
use dockmgr_core::{ContainerManager, CoreError};
use dockmgr_provider::{create_default_provider, create_provider, ProviderType};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "dockmgr")]
#[command(author, version, about = "Container Manager: records how containers were launched and relaunches them", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override default provider (docker or podman)
    #[arg(long, global = true, value_parser = ["docker", "podman"])]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh, then list containers and recorded launch commands
    List,

    /// Show recorded launch commands without contacting the engine
    Commands,

    /// Relaunch a container from its recorded command
    Launch {
        /// Recorded container id (interactive selection if not specified)
        id: Option<String>,
        /// Launch this command line instead of a recorded one
        #[arg(long, conflicts_with = "id")]
        command: Option<String>,
    },

    /// Start a container
    Start {
        /// Container name or ID (interactive selection if not specified)
        container: Option<String>,
    },

    /// Stop a container
    Stop {
        /// Container name or ID (interactive selection if not specified)
        container: Option<String>,
    },

    /// Start a stopped container or stop a running one
    Toggle {
        /// Container name or ID (interactive selection if not specified)
        container: Option<String>,
    },

    /// Remove a container
    Rm {
        /// Container name or ID (interactive selection if not specified)
        container: Option<String>,
        /// Force removal even if running
        #[arg(short, long)]
        force: bool,
    },

    /// Open an interactive shell in a terminal window
    Shell {
        /// Container name or ID (interactive selection if not specified)
        container: Option<String>,
    },

    /// Show container logs
    Logs {
        /// Container name or ID (interactive selection if not specified)
        container: Option<String>,
        /// Keep streaming new output
        #[arg(short, long)]
        follow: bool,
        /// Number of lines to show from the end
        #[arg(long)]
        tail: Option<u64>,
        /// Follow the logs in a terminal window instead
        #[arg(long, conflicts_with_all = ["follow", "tail"])]
        terminal: bool,
    },

    /// Refresh periodically and print the container table
    Watch {
        /// Seconds between refreshes (defaults to the configured interval)
        #[arg(long, short = 'n')]
        interval: Option<u64>,
    },

    /// Show or edit global configuration
    Config {
        /// Open config in editor
        #[arg(short, long)]
        edit: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Core operations log their own failures
        if e.downcast_ref::<CoreError>().is_none() {
            tracing::error!("{:#}", e);
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, load_error) = match GlobalConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (GlobalConfig::default(), Some(e)),
    };

    init_logging(&config, cli.verbose)?;
    if let Some(e) = load_error {
        tracing::warn!("{}, using defaults", e);
    }

    // Commands that work without a container engine
    match &cli.command {
        Commands::Config { edit } => return commands::config(*edit).await,
        Commands::Commands => return commands::commands(&config),
        _ => {}
    }

    let provider = match cli.provider.as_deref() {
        Some("docker") => create_provider(ProviderType::Docker, &config).await?,
        Some("podman") => create_provider(ProviderType::Podman, &config).await?,
        _ => create_default_provider(&config).await?,
    };
    let manager = ContainerManager::new(provider, config)?;

    // Get containers for selection (only when needed)
    let pick = |context: SelectionContext, prompt: &'static str| {
        let manager = &manager;
        async move {
            let containers = manager.list().await?;
            select_container(&containers, context, prompt)
        }
    };

    match cli.command {
        Commands::List => commands::list(&manager).await?,
        Commands::Launch { id, command } => {
            let id = match (id, &command) {
                (Some(id), _) => Some(id),
                (None, Some(_)) => None,
                (None, None) => {
                    let recorded: Vec<(String, String)> = manager
                        .reconciler()
                        .commands()
                        .await
                        .into_iter()
                        .map(|(command, identity)| (identity, command.to_string()))
                        .collect();
                    Some(select_command(&recorded, "Select command to launch:")?)
                }
            };
            commands::launch(&manager, id.as_deref(), command.as_deref()).await?;
        }
        Commands::Start { container } => {
            let name = match container {
                Some(name) => name,
                None => pick(SelectionContext::Stopped, "Select container to start:").await?,
            };
            commands::start(&manager, &name).await?;
        }
        Commands::Stop { container } => {
            let name = match container {
                Some(name) => name,
                None => pick(SelectionContext::Running, "Select container to stop:").await?,
            };
            commands::stop(&manager, &name).await?;
        }
        Commands::Toggle { container } => {
            let name = match container {
                Some(name) => name,
                None => pick(SelectionContext::Any, "Select container to start/stop:").await?,
            };
            commands::toggle(&manager, &name).await?;
        }
        Commands::Rm { container, force } => {
            let name = match container {
                Some(name) => name,
                None => pick(SelectionContext::Any, "Select container to remove:").await?,
            };
            commands::remove(&manager, &name, force).await?;
        }
        Commands::Shell { container } => {
            let name = match container {
                Some(name) => name,
                None => pick(SelectionContext::Running, "Select container to open a shell in:").await?,
            };
            commands::shell(&manager, &name).await?;
        }
        Commands::Logs {
            container,
            follow,
            tail,
            terminal,
        } => {
            let name = match container {
                Some(name) => name,
                None => pick(SelectionContext::Any, "Select container to show logs for:").await?,
            };
            commands::logs(&manager, &name, follow, tail, terminal).await?;
        }
        Commands::Watch { interval } => commands::watch(&manager, interval).await?,
        Commands::Config { .. } | Commands::Commands => unreachable!(), // Handled above
    }

    Ok(())
}

/// Set up tracing: `--verbose` forces debug, otherwise `RUST_LOG` or the
/// configured level. `[logging] file` redirects output to that file.
fn init_logging(config: &GlobalConfig, verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    let layer = match &config.logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .boxed()
        }
        None => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry().with(filter).with(layer).init();
    Ok(())
}
