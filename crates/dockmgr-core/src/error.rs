//! Error types for dockmgr-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] dockmgr_config::ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] dockmgr_provider::ProviderError),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Container '{0}' is not running")]
    NotRunning(String),

    #[error("Malformed command line: {0}")]
    MalformedCommandLine(String),

    #[error("No launch command recorded for container {0}")]
    RegistryEntryMissing(String),

    #[error("No shell available in container {0}")]
    NoShellAvailable(String),

    #[error("Terminal '{0}' could not be started")]
    TerminalUnavailable(String),

    #[error("Failed to start '{program}': {source}")]
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the error means the container is gone
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ContainerNotFound(_) => true,
            Self::Provider(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
