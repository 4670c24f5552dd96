//! Local session storage.
//!
//! After login the backend returns a token and a user profile. Both are kept
//! as one JSON blob on disk and reused until logout. The shift string and the
//! optional office coordinates inside the blob are untyped; they are only
//! handed to the rest of the crate through the validating accessors below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::geo::{GeoPoint, InvalidCoordinateError};
use crate::models::UserProfile;
use crate::shift::{ShiftDefinition, ShiftParseError};

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Invalid office location in session: {0}")]
    Office(String),

    #[error("Invalid office coordinate in session: {0}")]
    Coordinate(#[from] InvalidCoordinateError),

    #[error("Corrupted session data: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Session storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stored login session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    /// Bearer token sent with every request.
    pub token: String,
    pub user: UserProfile,
    /// Per-user office latitude, as sent by the backend (number or string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_latitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_longitude: Option<Value>,
}

impl UserSession {
    /// Parse the user's shift.
    pub fn shift_definition(&self) -> Result<ShiftDefinition, ShiftParseError> {
        let raw = self.user.shift.as_deref().ok_or(ShiftParseError::Missing)?;
        ShiftDefinition::parse(raw)
    }

    /// Office location assigned to this user, if the backend sent one.
    ///
    /// Both coordinates must be present together. Numbers and numeric strings
    /// are accepted.
    pub fn office_override(&self) -> Result<Option<GeoPoint>, SessionError> {
        match (&self.office_latitude, &self.office_longitude) {
            (None | Some(Value::Null), None | Some(Value::Null)) => Ok(None),
            (Some(lat), Some(lon)) => {
                let point = GeoPoint::new(coordinate(lat, "latitude")?, coordinate(lon, "longitude")?)?;
                Ok(Some(point))
            }
            _ => Err(SessionError::Office(
                "latitude and longitude must be set together".to_string(),
            )),
        }
    }
}

fn coordinate(value: &Value, name: &str) -> Result<f64, SessionError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| SessionError::Office(format!("{name} is not a number: {value}")))
}

/// File-backed session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session.
    pub fn load(&self) -> Result<UserSession, SessionError> {
        if !self.path.exists() {
            return Err(SessionError::NotLoggedIn);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let session = serde_json::from_str(&content)?;
        debug!("Session loaded from {:?}", self.path);
        Ok(session)
    }

    /// Persist a session, replacing any previous one.
    pub fn save(&self, session: &UserSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)?;
        info!("Session saved for {}", session.user.email);
        Ok(())
    }

    /// Remove the stored session. Missing file is not an error.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
