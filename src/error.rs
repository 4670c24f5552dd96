//! Error types and handling.

use thiserror::Error;

use crate::client::ApiError;
use crate::config::ConfigError;
use crate::geo::InvalidCoordinateError;
use crate::session::SessionError;
use crate::shift::ShiftParseError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Shift schedule missing or corrupted
    #[error("Shift error: {0}")]
    Shift(#[from] ShiftParseError),

    /// Coordinate or radius out of range
    #[error("Coordinate error: {0}")]
    Coordinate(#[from] InvalidCoordinateError),

    /// Backend rejected the request or was unreachable
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Stored session unreadable or absent
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excel export error
    #[error("Export error: {0}")]
    Export(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Create an export error with message
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Create a validation error with message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the user must contact an administrator before retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Shift(_))
    }

    /// Text for the alert dialog.
    pub fn user_message(&self) -> String {
        match self {
            Self::Shift(e) => e.user_message().to_string(),
            Self::Coordinate(_) => "Unable to read your location. Please try again.".to_string(),
            Self::Api(ApiError::Unauthorized) | Self::Session(SessionError::NotLoggedIn) => {
                "Your session has ended. Please log in again.".to_string()
            }
            Self::Api(ApiError::Rejected(msg)) => msg.clone(),
            Self::Api(_) => "Unable to reach the server. Please check your connection.".to_string(),
            Self::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
