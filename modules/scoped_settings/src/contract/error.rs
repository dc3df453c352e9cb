//! Contract error types for scoped settings
//!
//! Raised synchronously at the point of detection and never retried internally.

use thiserror::Error;

/// Scoped settings errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A stored payload (or a write directive) names a cast type nobody registered
    #[error("Cast handler for {cast_type} is missing. Make sure to register the handler in the casts configuration")]
    MissingCastHandler {
        /// Cast-type identifier
        cast_type: String,
    },
    /// A configured handler name does not resolve to a cast implementation
    #[error("Cast handler {handler} is invalid. Make sure the handler is registered as a cast implementation")]
    InvalidCastHandler {
        /// Handler name from configuration
        handler: String,
    },
    /// The owner passed to scoping has no stable identity
    #[error("Invalid owner entity: {reason}")]
    InvalidOwner {
        /// What is wrong with the owner
        reason: String,
    },
    /// A cast rejected the value or its stored representation
    #[error("Cast {cast_type} failed: {message}")]
    CastFailed {
        /// Cast-type identifier
        cast_type: String,
        /// Error details
        message: String,
    },
    /// Storage collaborator failure
    #[error("Storage error: {message}")]
    Storage {
        /// Error details
        message: String,
    },
}

impl SettingsError {
    pub fn missing_handler(cast_type: impl Into<String>) -> Self {
        Self::MissingCastHandler {
            cast_type: cast_type.into(),
        }
    }

    pub fn invalid_handler(handler: impl Into<String>) -> Self {
        Self::InvalidCastHandler {
            handler: handler.into(),
        }
    }

    pub fn invalid_owner(reason: impl Into<String>) -> Self {
        Self::InvalidOwner {
            reason: reason.into(),
        }
    }

    pub fn cast_failed(cast_type: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::CastFailed {
            cast_type: cast_type.into(),
            message: message.to_string(),
        }
    }
}

impl From<anyhow::Error> for SettingsError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage {
            message: format!("{err:#}"),
        }
    }
}
