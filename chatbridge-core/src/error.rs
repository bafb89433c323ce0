//! Error types for chatbridge

use thiserror::Error;

/// The main error type for chatbridge operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lookup of a session name that is not in the configured set
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// No pairing credential became available within the wait window
    #[error("Pairing credential unavailable for session: {0}")]
    CredentialUnavailable(String),

    /// Channel communication errors
    #[error("Channel error: {0}")]
    Channel(String),

    /// Provider (chat completion, content) errors
    #[error("Provider error: {0}")]
    Provider(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for chatbridge operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Whether the error was caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::UnknownSession(_) | Error::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_session_is_client_error() {
        let err = Error::UnknownSession("bot9".to_string());
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Unknown session: bot9");
    }

    #[test]
    fn test_internal_is_not_client_error() {
        assert!(!Error::Internal("boom".to_string()).is_client_error());
        assert!(!Error::CredentialUnavailable("bot1".to_string()).is_client_error());
    }
}
