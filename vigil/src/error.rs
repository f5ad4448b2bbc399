//! Error types for vigil.

use thiserror::Error;

/// Main error type for vigil CLI operations.
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Probe unavailable: {0}")]
    ProbeUnavailable(String),

    #[error(transparent)]
    Core(#[from] vigil_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for VigilError {
    fn from(e: serde_json::Error) -> Self {
        VigilError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for VigilError {
    fn from(e: toml::de::Error) -> Self {
        VigilError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for VigilError {
    fn from(e: toml::ser::Error) -> Self {
        VigilError::Serialization(e.to_string())
    }
}

/// Result type alias for vigil operations.
pub type VigilResult<T> = Result<T, VigilError>;
