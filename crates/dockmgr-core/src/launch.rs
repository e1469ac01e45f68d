//! Turning a recorded launch command back into an engine invocation

use crate::{CoreError, Result};

/// Arguments for the engine binary plus the container name they create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Arguments after the engine binary, starting with `run`
    pub args: Vec<String>,
    /// Value of `--name`, if the command sets one
    pub container_name: Option<String>,
}

/// Split a launch command into arguments.
///
/// Accepts the stored form (`run ...`) and also a line that still carries the
/// engine binary (`docker run ...`). Quoting follows POSIX shell rules; no
/// shell ever sees the command.
pub fn parse_launch_command(line: &str) -> Result<LaunchPlan> {
    let mut args = shell_words::split(line)
        .map_err(|e| CoreError::MalformedCommandLine(format!("{}: {}", line, e)))?;

    if matches!(args.first().map(String::as_str), Some("docker" | "podman")) {
        args.remove(0);
    }

    match args.first().map(String::as_str) {
        Some("run") => {}
        Some(other) => {
            return Err(CoreError::MalformedCommandLine(format!(
                "expected 'run', found '{}'",
                other
            )))
        }
        None => return Err(CoreError::MalformedCommandLine("empty command".to_string())),
    }

    if args.len() < 2 {
        return Err(CoreError::MalformedCommandLine(
            "no image given to run".to_string(),
        ));
    }

    let container_name = find_name(&args);
    Ok(LaunchPlan {
        args,
        container_name,
    })
}

fn find_name(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--name" {
            return iter.next().cloned();
        }
        if let Some(value) = arg.strip_prefix("--name=") {
            return Some(value.to_string());
        }
    }
    None
}
