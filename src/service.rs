//! Attendance service orchestration.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::config::AppConfig;
use crate::eligibility::{BlockReason, CaptureDecision, check_submission, decide_capture};
use crate::error::Result;
use crate::geo::{GeoPoint, GeofenceChecker};
use crate::models::{
    AttendanceHistoryEntry, AttendanceKind, AttendanceStatus, AttendanceSubmission, LeaveRequest, UpdateProfile,
    UserProfile,
};
use crate::session::{SessionStore, UserSession};
use crate::shift::{AttendanceState, ShiftParseError, TimeOfDay};
use crate::ui::{Alert, UiMessage};

/// Result of a clock-in/clock-out attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockOutcome {
    /// Record accepted by the backend.
    Submitted {
        status: AttendanceStatus,
        distance_meters: f64,
        message: String,
        /// Late or early notice from the same evaluation that set `status`.
        warning: Option<String>,
    },
    /// Refused locally, nothing was sent.
    Blocked(BlockReason),
}

/// Local gate result before anything is uploaded.
#[derive(Debug, Clone)]
pub enum ClockGate {
    Ready {
        submission: AttendanceSubmission,
        warning: Option<String>,
    },
    Blocked(BlockReason),
}

/// Service tying session, eligibility checks, and the backend together.
pub struct AttendanceService {
    config: AppConfig,
    store: SessionStore,
}

impl AttendanceService {
    /// Create a new service.
    pub fn new(config: AppConfig) -> Self {
        let store = SessionStore::new(config.session_path());
        Self { config, store }
    }

    /// Create a service with an explicit session store.
    pub fn with_store(config: AppConfig, store: SessionStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load the stored session.
    pub fn session(&self) -> Result<UserSession> {
        Ok(self.store.load()?)
    }

    fn client(&self, session: Option<&UserSession>) -> Result<ApiClient> {
        let client = ApiClient::new(&self.config.api.base_url, Duration::from_secs(self.config.api.timeout_secs))?;
        Ok(match session {
            Some(session) => client.with_token(&session.token),
            None => client,
        })
    }

    /// Geofence for this user: the session's office when present, else the configured one.
    pub fn geofence(&self, session: &UserSession) -> Result<GeofenceChecker> {
        let office = match session.office_override()? {
            Some(point) => point,
            None => self.config.office.location(),
        };
        Ok(GeofenceChecker::new(office, self.config.office.max_radius_meters)?)
    }

    /// Evaluate the stored user's shift at `now`.
    pub fn attendance_state(
        &self,
        session: &UserSession,
        now: TimeOfDay,
    ) -> std::result::Result<AttendanceState, ShiftParseError> {
        let shift = session.shift_definition()?;
        Ok(shift.evaluate(now, self.config.shift.grace_seconds))
    }

    /// Capture gate for `kind` at `now`.
    pub fn capture_decision(&self, kind: AttendanceKind, now: TimeOfDay) -> Result<CaptureDecision> {
        let session = self.session()?;
        Ok(decide_capture(&self.attendance_state(&session, now), kind))
    }

    /// Log in and store the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSession> {
        let session = self.client(None)?.login(email, password).await?;
        self.store.save(&session)?;

        // Surface a broken schedule right away rather than at first clock-in.
        if let Err(e) = session.shift_definition() {
            warn!("Logged in user has no usable shift: {e}");
        }
        Ok(session)
    }

    /// Forget the stored session.
    pub fn logout(&self) -> Result<()> {
        Ok(self.store.clear()?)
    }

    /// Run both local gates for `kind` at `now` without touching the network.
    ///
    /// The shift gate is checked first, then the geofence. A single `now`
    /// drives both the recorded status and the warning.
    pub fn prepare_clock(
        &self,
        session: &UserSession,
        kind: AttendanceKind,
        position: GeoPoint,
        photo: PathBuf,
        now: TimeOfDay,
    ) -> Result<ClockGate> {
        let (status, warning) = match decide_capture(&self.attendance_state(session, now), kind) {
            CaptureDecision::Allowed { status, warning } => (status, warning),
            CaptureDecision::Blocked(reason) => {
                info!("{} blocked at {now}: {reason}", kind.label());
                return Ok(ClockGate::Blocked(reason));
            }
        };

        let geofence = self.geofence(session)?;
        let fence = match check_submission(&geofence, position) {
            Ok(result) => result,
            Err(reason) => {
                info!("{} blocked by geofence: {reason}", kind.label());
                return Ok(ClockGate::Blocked(reason));
            }
        };

        if let Some(warning) = &warning {
            info!("{warning}");
        }
        Ok(ClockGate::Ready {
            submission: AttendanceSubmission {
                kind,
                status,
                location: position,
                distance_meters: fence.distance_meters,
                photo,
            },
            warning,
        })
    }

    /// Run the full clock-in/clock-out flow. The selfie is uploaded only
    /// after both gates pass.
    pub async fn clock(
        &self,
        kind: AttendanceKind,
        position: GeoPoint,
        photo: PathBuf,
        now: TimeOfDay,
    ) -> Result<ClockOutcome> {
        let session = self.session()?;

        let (submission, warning) = match self.prepare_clock(&session, kind, position, photo, now)? {
            ClockGate::Ready { submission, warning } => (submission, warning),
            ClockGate::Blocked(reason) => return Ok(ClockOutcome::Blocked(reason)),
        };

        let message = self.client(Some(&session))?.submit_attendance(&submission).await?;
        info!(
            "{} submitted as {} ({:.1} m from office)",
            kind.label(),
            submission.status.as_str(),
            submission.distance_meters
        );

        Ok(ClockOutcome::Submitted {
            status: submission.status,
            distance_meters: submission.distance_meters,
            message,
            warning,
        })
    }

    /// Fetch attendance history.
    pub async fn history(&self) -> Result<Vec<AttendanceHistoryEntry>> {
        let session = self.session()?;
        Ok(self.client(Some(&session))?.attendance_history().await?)
    }

    /// Validate and submit a leave request.
    pub async fn submit_leave(&self, request: &LeaveRequest) -> Result<String> {
        request.validate()?;
        let session = self.session()?;
        let message = self.client(Some(&session))?.submit_leave(request).await?;
        info!("Leave request submitted: {} for {} day(s)", request.kind.as_str(), request.days());
        Ok(message)
    }

    /// Fetch the profile and refresh the stored copy.
    pub async fn profile(&self) -> Result<UserProfile> {
        let mut session = self.session()?;
        let profile = self.client(Some(&session))?.profile().await?;
        session.user = profile.clone();
        self.store.save(&session)?;
        Ok(profile)
    }

    /// Update the profile and refresh the stored copy.
    pub async fn update_profile(&self, update: &UpdateProfile) -> Result<UserProfile> {
        update.validate()?;
        let mut session = self.session()?;
        let profile = self.client(Some(&session))?.update_profile(update).await?;
        session.user = profile.clone();
        self.store.save(&session)?;
        Ok(profile)
    }
}

/// Run a clock-in/clock-out in the background and report through the UI channel.
pub async fn run_clock_background(
    service: &AttendanceService,
    kind: AttendanceKind,
    position: GeoPoint,
    photo: PathBuf,
    tx: mpsc::UnboundedSender<UiMessage>,
) {
    let _ = tx.send(UiMessage::SubmissionStarted(kind));

    let message = match service.clock(kind, position, photo, TimeOfDay::now_local()).await {
        Ok(ClockOutcome::Submitted { message, warning, .. }) => {
            if let Some(warning) = warning {
                let _ = tx.send(UiMessage::ShowAlert(Alert::warning(warning)));
            }
            UiMessage::SubmissionCompleted(message)
        }
        Ok(ClockOutcome::Blocked(reason)) => UiMessage::SubmissionFailed(Alert::from(&reason)),
        Err(e) => UiMessage::SubmissionFailed(Alert::from(&e)),
    };
    let _ = tx.send(message);
}

/// Load history in the background and report through the UI channel.
pub async fn run_history_background(service: &AttendanceService, tx: mpsc::UnboundedSender<UiMessage>) {
    match service.history().await {
        Ok(entries) => {
            let _ = tx.send(UiMessage::HistoryLoaded(entries));
        }
        Err(e) => {
            let _ = tx.send(UiMessage::LoadError(e.user_message()));
        }
    }
}

/// Load the profile in the background and report through the UI channel.
pub async fn run_profile_background(service: &AttendanceService, tx: mpsc::UnboundedSender<UiMessage>) {
    match service.profile().await {
        Ok(profile) => {
            let _ = tx.send(UiMessage::ProfileLoaded(profile));
        }
        Err(e) => {
            let _ = tx.send(UiMessage::LoadError(e.user_message()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::session::SessionError;
    use crate::ui::{AlertLevel, UiState};

    fn temp_service(name: &str, shift: Option<&str>) -> AttendanceService {
        let dir = std::env::temp_dir().join(format!("presensi-service-{}-{name}", std::process::id()));
        let store = SessionStore::new(dir.join("session.json"));
        if let Some(shift) = shift {
            let session = UserSession {
                token: "tok".to_string(),
                user: UserProfile {
                    id: 1,
                    name: "Dewi".to_string(),
                    email: "dewi@example.com".to_string(),
                    phone: None,
                    position: None,
                    shift: Some(shift.to_string()),
                    photo_url: None,
                },
                office_latitude: None,
                office_longitude: None,
            };
            store.save(&session).unwrap();
        }
        AttendanceService::with_store(AppConfig::default(), store)
    }

    fn cleanup(service: &AttendanceService) {
        if let Some(dir) = service.store.path().parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    fn at(seconds: u32) -> TimeOfDay {
        TimeOfDay::from_seconds(seconds).unwrap()
    }

    #[test]
    fn test_capture_requires_login() {
        let service = temp_service("nologin", None);
        let err = service.capture_decision(AttendanceKind::ClockIn, at(30_000)).unwrap_err();
        assert!(matches!(err, AppError::Session(SessionError::NotLoggedIn)));
    }

    #[test]
    fn test_capture_decision_from_session() {
        let service = temp_service("decision", Some("08:00 - 16:00"));
        let decision = service.capture_decision(AttendanceKind::ClockIn, at(27_000)).unwrap();
        assert_eq!(
            decision,
            CaptureDecision::Allowed {
                status: AttendanceStatus::Hadir,
                warning: None
            }
        );
        cleanup(&service);
    }

    #[test]
    fn test_geofence_defaults_to_config_office() {
        let service = temp_service("geofence", Some("08:00 - 16:00"));
        let session = service.session().unwrap();
        let geofence = service.geofence(&session).unwrap();
        assert_eq!(geofence.reference(), service.config().office.location());
        assert_eq!(geofence.max_radius_meters(), 100_000.0);
        cleanup(&service);
    }

    #[tokio::test]
    async fn test_clock_blocked_by_broken_shift() {
        let service = temp_service("broken", Some("08:00-16:00"));
        let outcome = service
            .clock(
                AttendanceKind::ClockIn,
                GeoPoint::new(-6.2, 106.8).unwrap(),
                PathBuf::from("missing.jpg"),
                at(30_000),
            )
            .await
            .unwrap();
        match outcome {
            ClockOutcome::Blocked(reason) => assert!(reason.is_fatal()),
            other => panic!("unexpected {other:?}"),
        }
        cleanup(&service);
    }

    #[tokio::test]
    async fn test_clock_blocked_outside_radius() {
        let mut config = AppConfig::default();
        config.office.max_radius_meters = 50.0;
        let service = temp_service("radius", Some("08:00 - 16:00"));
        let service = AttendanceService::with_store(config, service.store.clone());

        let outcome = service
            .clock(
                AttendanceKind::ClockIn,
                GeoPoint::new(-6.3, 106.9).unwrap(),
                PathBuf::from("missing.jpg"),
                at(30_000),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, ClockOutcome::Blocked(BlockReason::OutsideRadius { .. })));
        cleanup(&service);
    }

    #[tokio::test]
    async fn test_leave_validated_before_network() {
        let service = temp_service("leave", Some("08:00 - 16:00"));
        let request = LeaveRequest {
            kind: crate::models::LeaveKind::Sick,
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 11, 5).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            reason: "Demam".to_string(),
        };
        let err = service.submit_leave(&request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        cleanup(&service);
    }

    #[tokio::test]
    async fn test_background_clock_reports_block() {
        let service = temp_service("background", Some("08:00-16:00"));
        let mut ui = UiState::new();

        run_clock_background(
            &service,
            AttendanceKind::ClockIn,
            GeoPoint::new(-6.2, 106.8).unwrap(),
            PathBuf::from("missing.jpg"),
            ui.sender(),
        )
        .await;

        assert_eq!(ui.drain(), 2);
        assert!(!ui.is_submitting);
        assert_eq!(ui.alert.as_ref().unwrap().level, AlertLevel::Fatal);
        cleanup(&service);
    }

    #[test]
    fn test_prepare_clock_uses_one_sample() {
        let service = temp_service("prepare", Some("08:00 - 16:00"));
        let session = service.session().unwrap();
        let office = service.config().office.location();

        // 09:00 is past the 08:00 start.
        let gate = service
            .prepare_clock(&session, AttendanceKind::ClockIn, office, PathBuf::from("selfie.jpg"), at(32_400))
            .unwrap();
        match gate {
            ClockGate::Ready { submission, warning } => {
                assert_eq!(submission.status, AttendanceStatus::Terlambat);
                assert_eq!(submission.distance_meters, 0.0);
                assert!(warning.unwrap().contains("late"));
            }
            other => panic!("unexpected {other:?}"),
        }

        // 07:30 is on time, so no warning.
        let gate = service
            .prepare_clock(&session, AttendanceKind::ClockIn, office, PathBuf::from("selfie.jpg"), at(27_000))
            .unwrap();
        match gate {
            ClockGate::Ready { submission, warning } => {
                assert_eq!(submission.status, AttendanceStatus::Hadir);
                assert!(warning.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        cleanup(&service);
    }

    #[tokio::test]
    async fn test_background_loads_report_missing_session() {
        let service = temp_service("loads", None);
        let mut ui = UiState::new();

        run_history_background(&service, ui.sender()).await;
        assert_eq!(ui.drain(), 1);
        assert!(ui.alert.take().unwrap().message.contains("log in"));

        run_profile_background(&service, ui.sender()).await;
        assert_eq!(ui.drain(), 1);
        assert!(ui.profile.is_none());
        assert_eq!(ui.alert.as_ref().unwrap().level, AlertLevel::Error);
    }

    #[test]
    fn test_logout_clears_session() {
        let service = temp_service("logout", Some("08:00 - 16:00"));
        assert!(service.session().is_ok());
        service.logout().unwrap();
        assert!(service.session().is_err());
        cleanup(&service);
    }
}
