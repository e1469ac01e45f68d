//! Error types for container providers

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The engine could not be reached or did not answer
    #[error("Failed to connect to container engine: {0}")]
    ConnectionError(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// The engine answered but refused the operation
    #[error("Engine rejected the operation: {0}")]
    Rejected(String),

    /// The engine answered with something that could not be decoded
    #[error("Invalid response from container engine: {0}")]
    InvalidResponse(String),

    #[error("Exec failed: {0}")]
    ExecError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether this error means the container no longer exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ContainerNotFound(_))
    }
}

impl From<bollard::errors::Error> for ProviderError {
    fn from(err: bollard::errors::Error) -> Self {
        use bollard::errors::Error;
        match err {
            Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => Self::ContainerNotFound(message),
            Error::DockerResponseServerError { message, .. } => {
                Self::Rejected(message)
            }
            err @ (Error::IOError { .. }
            | Error::HyperResponseError { .. }
            | Error::HyperLegacyError { .. }
            | Error::RequestTimeoutError
            | Error::UnsupportedURISchemeError { .. }) => Self::ConnectionError(err.to_string()),
            err @ (Error::JsonDataError { .. }
            | Error::JsonSerdeError { .. }
            | Error::StrParseError { .. }) => Self::InvalidResponse(err.to_string()),
            other => Self::Rejected(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(status_code: u16, message: &str) -> bollard::errors::Error {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_404_maps_to_not_found() {
        let err = ProviderError::from(server_error(404, "No such container: abc"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Container not found: No such container: abc");
    }

    #[test]
    fn test_other_status_maps_to_rejected() {
        for code in [304, 409, 500] {
            let err = ProviderError::from(server_error(code, "container already started"));
            assert!(matches!(err, ProviderError::Rejected(_)), "status {}", code);
        }
    }

    #[test]
    fn test_transport_error_maps_to_connection() {
        let err = ProviderError::from(bollard::errors::Error::RequestTimeoutError);
        assert!(matches!(err, ProviderError::ConnectionError(_)));

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ProviderError::from(bollard::errors::Error::from(io));
        assert!(matches!(err, ProviderError::ConnectionError(_)));
    }

    #[test]
    fn test_decode_error_is_not_a_connection_failure() {
        let json = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = ProviderError::from(bollard::errors::Error::from(json));
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn test_stream_error_maps_to_rejected() {
        let err = ProviderError::from(bollard::errors::Error::DockerStreamError {
            error: "exec failed".to_string(),
        });
        assert!(matches!(err, ProviderError::Rejected(_)));
    }
}
