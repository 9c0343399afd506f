//! Error handling for the ETS server and agent
//!
//! Provides a structured error system with thiserror for error definitions
//! and anyhow for propagation at the binary boundary.

use thiserror::Error;

/// Application result type alias
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Main application error enum
///
/// Covers the major error categories across the transport, tool, and agent
/// layers with enough structure for logging and for mapping onto protocol
/// error envelopes.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// HTTP client errors for job board, sheets, and model APIs
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Wire protocol errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Tool registration or execution errors
    #[error("Tool error: {message}")]
    Tool { message: String },

    /// Tool parameter decode/validation errors
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    /// Agent loop errors
    #[error("Agent error: {message}")]
    Agent { message: String },

    /// Model API errors
    #[error("Model error: {message}")]
    Model { message: String },

    /// The operation was cancelled by shutdown or user interrupt
    #[error("operation cancelled")]
    Cancelled,

    /// Generic application errors
    #[error("Application error: {message}")]
    Application { message: String },
}

impl AppError {
    /// Create a new Protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a new Tool error
    pub fn tool<S: Into<String>>(message: S) -> Self {
        Self::Tool {
            message: message.into(),
        }
    }

    /// Create a new InvalidParams error
    pub fn invalid_params<S: Into<String>>(message: S) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create a new Agent error
    pub fn agent<S: Into<String>>(message: S) -> Self {
        Self::Agent {
            message: message.into(),
        }
    }

    /// Create a new Model error
    pub fn model<S: Into<String>>(message: S) -> Self {
        Self::Model {
            message: message.into(),
        }
    }

    /// Create a new Application error
    pub fn application<S: Into<String>>(message: S) -> Self {
        Self::Application {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable within the current loop
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Http(_) => true,
            AppError::Tool { .. } => true,
            AppError::InvalidParams { .. } => true,
            AppError::Model { .. } => true,
            AppError::Serde(_) => true,
            AppError::Agent { .. } => true,
            AppError::Application { .. } => true,
            AppError::Protocol { .. } => false,
            AppError::Io(_) => false,
            AppError::Config(_) => false,
            AppError::Cancelled => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = AppError::tool("handler failed");
        assert_eq!(err.to_string(), "Tool error: handler failed");
        assert!(err.is_recoverable());

        let err = AppError::protocol("bad frame");
        assert!(!err.is_recoverable());
    }
}
