use thiserror::Error;

use super::experiment::ConfigError;

/// Machine-checkable classification of a [`DomainError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    NotFound,
    InsufficientData,
    Validation,
    Internal,
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid experiment configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Check if the error means "no experiment running"
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
