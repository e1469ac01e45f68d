//! Interactive sessions opened in an external terminal emulator

use dockmgr_config::TerminalConfig;

/// A terminal emulator invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TerminalCommand {
    fn wrapping(config: &TerminalConfig, inner: String) -> Self {
        Self {
            program: config.program.clone(),
            args: vec![config.exec_flag.clone(), inner],
        }
    }
}

/// `<terminal> -e "<engine> exec -it <id> <shell>"`
pub fn shell_session(config: &TerminalConfig, engine: &str, id: &str, shell: &str) -> TerminalCommand {
    TerminalCommand::wrapping(config, format!("{} exec -it {} {}", engine, id, shell))
}

/// `<terminal> -e "<engine> logs --follow <id>"`
pub fn log_session(config: &TerminalConfig, engine: &str, id: &str) -> TerminalCommand {
    TerminalCommand::wrapping(config, format!("{} logs --follow {}", engine, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_session_with_defaults() {
        let cmd = shell_session(&TerminalConfig::default(), "docker", "4f66ad9a0b2e", "bash");
        assert_eq!(cmd.program, "xterm");
        assert_eq!(cmd.args, vec!["-e", "docker exec -it 4f66ad9a0b2e bash"]);
    }

    #[test]
    fn test_log_session_with_custom_terminal() {
        let config = TerminalConfig {
            program: "gnome-terminal".to_string(),
            exec_flag: "--".to_string(),
            shells: vec!["sh".to_string()],
        };
        let cmd = log_session(&config, "podman", "abc");
        assert_eq!(cmd.program, "gnome-terminal");
        assert_eq!(cmd.args, vec!["--", "podman logs --follow abc"]);
    }
}
