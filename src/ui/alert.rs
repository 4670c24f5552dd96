//! Alert dialog model.

use crate::eligibility::BlockReason;
use crate::error::AppError;
use crate::shift::ShiftParseError;

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Warning,
    Error,
    /// Cannot be dismissed into a retry; the action stays disabled.
    Fatal,
}

/// The single dialog the screen can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(level: AlertLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Success, "Success", message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Warning, "Warning", message)
    }

    pub fn is_fatal(&self) -> bool {
        self.level == AlertLevel::Fatal
    }
}

impl From<&AppError> for Alert {
    fn from(err: &AppError) -> Self {
        if err.is_fatal() {
            Alert::new(AlertLevel::Fatal, "Configuration problem", err.user_message())
        } else {
            Alert::new(AlertLevel::Error, "Failed", err.user_message())
        }
    }
}

impl From<&ShiftParseError> for Alert {
    fn from(err: &ShiftParseError) -> Self {
        Alert::new(AlertLevel::Fatal, "Configuration problem", err.user_message())
    }
}

impl From<&BlockReason> for Alert {
    fn from(reason: &BlockReason) -> Self {
        if let BlockReason::ShiftUnavailable(e) = reason {
            Alert::from(e)
        } else {
            Alert::new(AlertLevel::Warning, "Not allowed", reason.to_string())
        }
    }
}
