//! User profile DTOs.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Profile of the logged-in user, as stored in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    /// Shift as `"HH:MM - HH:MM"`. Validated when the session is loaded.
    #[serde(default)]
    pub shift: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// DTO for updating the profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(AppError::validation("Nothing to update"));
        }
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::validation("Name cannot be empty"));
        }
        if self.email.as_deref().is_some_and(|e| !e.contains('@')) {
            return Err(AppError::validation("Email address is not valid"));
        }
        Ok(())
    }
}
