//! Detached external processes (engine CLI, terminal emulator)

use std::process::{Command, Stdio};

/// Starts programs without waiting for them
pub trait ProcessSpawner: Send + Sync {
    /// Start `program` with `args` and return once it is running
    fn spawn_detached(&self, program: &str, args: &[String]) -> std::io::Result<()>;
}

/// Spawns real child processes with their standard streams detached
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl ProcessSpawner for SystemSpawner {
    fn spawn_detached(&self, program: &str, args: &[String]) -> std::io::Result<()> {
        tracing::debug!("Spawning {} {:?}", program, args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // Reap the child when it exits so it does not linger as a zombie
        let program = program.to_string();
        std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                tracing::debug!("{} exited with {}", program, status);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to wait for {}: {}", program, e),
        });

        Ok(())
    }
}
