//! Attendance backend HTTP client.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{AttendanceHistoryEntry, AttendanceSubmission, LeaveRequest, UpdateProfile, UserProfile};
use crate::session::UserSession;

/// Errors from the attendance backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure or timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token missing, expired, or revoked.
    #[error("Unauthorized")]
    Unauthorized,

    /// Backend refused the request with a message for the user.
    #[error("{0}")]
    Rejected(String),

    /// Body could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Selfie file could not be read.
    #[error("Failed to read photo: {0}")]
    Photo(#[from] std::io::Error),
}

/// Standard response wrapper: `{ "success": bool, "message": str, "data": T }`.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// Attendance backend client.
///
/// Authenticates with a bearer token taken from the stored session. The token
/// is reused as-is; an expired token surfaces as [`ApiError::Unauthorized`].
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `base_url` - The API root (e.g., "https://absen.example.com/api")
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Attach the bearer token from a stored session.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Check if a token is attached.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{base}/{path}", base = self.base_url, path = path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::Unauthorized)?;
        Ok(request.bearer_auth(token))
    }

    /// Log in and return the session to store.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSession, ApiError> {
        let response = self
            .client
            .post(self.url("login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: UserSession = require_data(read_envelope(response).await?)?;
        info!("Logged in as {}", session.user.email);
        Ok(session)
    }

    /// Submit a clock-in or clock-out with its selfie. Returns the backend message.
    pub async fn submit_attendance(&self, submission: &AttendanceSubmission) -> Result<String, ApiError> {
        let photo = tokio::fs::read(&submission.photo).await?;
        let part = Part::bytes(photo)
            .file_name(photo_file_name(&submission.photo))
            .mime_str("image/jpeg")?;

        let form = attendance_fields(submission)
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
            .part("photo", part);

        debug!(
            "Submitting {} with status {}",
            submission.kind.as_str(),
            submission.status.as_str()
        );

        let response = self
            .authorized(self.client.post(self.url("attendance")))?
            .multipart(form)
            .send()
            .await?;

        let envelope = read_envelope::<serde_json::Value>(response).await?;
        Ok(envelope
            .message
            .unwrap_or_else(|| format!("{} recorded", submission.kind.label())))
    }

    /// Fetch the user's attendance history.
    pub async fn attendance_history(&self) -> Result<Vec<AttendanceHistoryEntry>, ApiError> {
        let response = self
            .authorized(self.client.get(self.url("attendance/history")))?
            .send()
            .await?;
        let envelope = read_envelope::<Vec<AttendanceHistoryEntry>>(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Submit a leave request. Returns the backend message.
    pub async fn submit_leave(&self, request: &LeaveRequest) -> Result<String, ApiError> {
        let response = self
            .authorized(self.client.post(self.url("leave")))?
            .json(request)
            .send()
            .await?;

        let envelope = read_envelope::<serde_json::Value>(response).await?;
        Ok(envelope.message.unwrap_or_else(|| "Leave request submitted".to_string()))
    }

    /// Fetch the current profile.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        let response = self.authorized(self.client.get(self.url("profile")))?.send().await?;
        require_data(read_envelope(response).await?)
    }

    /// Update profile fields and return the new profile.
    pub async fn update_profile(&self, update: &UpdateProfile) -> Result<UserProfile, ApiError> {
        let response = self
            .authorized(self.client.put(self.url("profile")))?
            .json(update)
            .send()
            .await?;
        require_data(read_envelope(response).await?)
    }
}

/// Text fields of the attendance multipart form.
fn attendance_fields(submission: &AttendanceSubmission) -> Vec<(&'static str, String)> {
    vec![
        ("type", submission.kind.as_str().to_string()),
        ("status", submission.status.as_str().to_string()),
        ("latitude", submission.location.latitude.to_string()),
        ("longitude", submission.location.longitude.to_string()),
        ("distance", format!("{:.2}", submission.distance_meters)),
    ]
}

fn photo_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "selfie.jpg".to_string())
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<ApiEnvelope<T>, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    parse_envelope(status, &body)
}

/// Interpret a backend response body.
///
/// 401 is always [`ApiError::Unauthorized`]. Other failures, including
/// `"success": false` on a 2xx, become [`ApiError::Rejected`] with the
/// backend's message when there is one.
fn parse_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<ApiEnvelope<T>, ApiError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }

    if !status.is_success() {
        let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("Server returned {status}"));
        return Err(ApiError::Rejected(message));
    }

    let envelope: ApiEnvelope<T> =
        serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

    if envelope.success == Some(false) {
        return Err(ApiError::Rejected(
            envelope.message.unwrap_or_else(|| "Request was rejected".to_string()),
        ));
    }

    Ok(envelope)
}

fn require_data<T>(envelope: ApiEnvelope<T>) -> Result<T, ApiError> {
    envelope
        .data
        .ok_or_else(|| ApiError::InvalidResponse("response has no data".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::models::{AttendanceKind, AttendanceStatus};
    use std::path::PathBuf;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost/api/", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = client();
        assert_eq!(client.url("login"), "http://localhost/api/login");
        assert_eq!(client.url("/attendance/history"), "http://localhost/api/attendance/history");
    }

    #[test]
    fn test_requires_token() {
        let client = client();
        assert!(!client.is_authenticated());
        let request = client.client.get(client.url("profile"));
        assert!(matches!(client.authorized(request), Err(ApiError::Unauthorized)));

        let client = client.with_token("abc");
        assert!(client.is_authenticated());
    }

    #[test]
    fn test_parse_login_envelope() {
        let body = r#"{
            "success": true,
            "message": "Login berhasil",
            "data": {
                "token": "tok",
                "user": {"id": 3, "name": "Rina", "email": "rina@example.com", "shift": "07:00 - 15:00"},
                "office_latitude": "-6.3",
                "office_longitude": 106.9
            }
        }"#;
        let session: UserSession = require_data(parse_envelope(StatusCode::OK, body).unwrap()).unwrap();
        assert_eq!(session.token, "tok");
        assert_eq!(session.user.shift.as_deref(), Some("07:00 - 15:00"));
        assert!(session.office_override().unwrap().is_some());
    }

    #[test]
    fn test_unauthorized() {
        let result = parse_envelope::<serde_json::Value>(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_rejected_with_message() {
        let body = r#"{"success": false, "message": "Anda sudah absen masuk hari ini"}"#;
        match parse_envelope::<serde_json::Value>(StatusCode::OK, body) {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Anda sudah absen masuk hari ini"),
            other => panic!("unexpected {other:?}"),
        }

        match parse_envelope::<serde_json::Value>(StatusCode::UNPROCESSABLE_ENTITY, body) {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Anda sudah absen masuk hari ini"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_server_error_without_body() {
        match parse_envelope::<serde_json::Value>(StatusCode::INTERNAL_SERVER_ERROR, "<html>") {
            Err(ApiError::Rejected(msg)) => assert!(msg.contains("500")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_body() {
        let result = parse_envelope::<serde_json::Value>(StatusCode::OK, "not json");
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn test_missing_data() {
        let envelope = parse_envelope::<UserProfile>(StatusCode::OK, r#"{"success": true}"#).unwrap();
        assert!(matches!(require_data(envelope), Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn test_history_envelope() {
        let body = r#"{"data": [
            {"id": 1, "type": "masuk", "status": "Hadir", "check_time": "2025-11-25 07:55:00"},
            {"id": 2, "type": "pulang", "status": "Pulang", "check_time": "2025-11-25 16:02:10"}
        ]}"#;
        let entries: Vec<AttendanceHistoryEntry> = parse_envelope(StatusCode::OK, body).unwrap().data.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, AttendanceKind::ClockOut);
    }

    #[test]
    fn test_attendance_fields() {
        let submission = AttendanceSubmission {
            kind: AttendanceKind::ClockIn,
            status: AttendanceStatus::Terlambat,
            location: GeoPoint::new(-6.2, 106.8).unwrap(),
            distance_meters: 15_678.672_9,
            photo: PathBuf::from("/tmp/selfie-001.jpg"),
        };
        let fields = attendance_fields(&submission);
        assert_eq!(fields[0], ("type", "masuk".to_string()));
        assert_eq!(fields[1], ("status", "Terlambat".to_string()));
        assert_eq!(fields[2], ("latitude", "-6.2".to_string()));
        assert_eq!(fields[4], ("distance", "15678.67".to_string()));
        assert_eq!(photo_file_name(&submission.photo), "selfie-001.jpg");
    }
}
