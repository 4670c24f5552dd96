//! Screen state store.
//!
//! Background tasks never touch this state directly. They send [`UiMessage`]
//! values over an unbounded channel and the owner of [`UiState`] drains them
//! once per frame or tick.

use chrono::{DateTime, Local};
use tokio::sync::mpsc;

use crate::eligibility::{CaptureDecision, decide_capture};
use crate::models::{AttendanceHistoryEntry, AttendanceKind, UserProfile};
use crate::shift::{AttendanceState, ShiftParseError, TimeOfDay};

use super::alert::{Alert, AlertLevel};

/// Messages from async tasks to the screen.
#[derive(Debug, Clone)]
pub enum UiMessage {
    /// Fresh evaluation from the shift ticker.
    ShiftState {
        sampled_at: TimeOfDay,
        state: Result<AttendanceState, ShiftParseError>,
    },

    // Attendance submission
    SubmissionStarted(AttendanceKind),
    SubmissionCompleted(String),
    SubmissionFailed(Alert),

    // Data loading
    HistoryLoaded(Vec<AttendanceHistoryEntry>),
    ProfileLoaded(UserProfile),
    LoadError(String),

    // Dialog
    ShowAlert(Alert),
    DismissAlert,
}

/// Log level for UI messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Log entry for display in the UI.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub level: LogLevel,
}

/// Maximum number of log entries kept.
const MAX_LOG_ENTRIES: usize = 100;

/// State of the attendance screen.
#[derive(Debug)]
pub struct UiState {
    pub tx: mpsc::UnboundedSender<UiMessage>,
    rx: mpsc::UnboundedReceiver<UiMessage>,

    /// Latest shift evaluation. "Last message wins".
    pub attendance: Option<Result<AttendanceState, ShiftParseError>>,
    pub sampled_at: Option<TimeOfDay>,

    pub alert: Option<Alert>,
    pub is_submitting: bool,

    pub history: Vec<AttendanceHistoryEntry>,
    pub profile: Option<UserProfile>,

    pub log_messages: Vec<LogEntry>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            attendance: None,
            sampled_at: None,
            alert: None,
            is_submitting: false,
            history: Vec::new(),
            profile: None,
            log_messages: Vec::new(),
        }
    }

    /// Sender handle for background tasks.
    pub fn sender(&self) -> mpsc::UnboundedSender<UiMessage> {
        self.tx.clone()
    }

    /// Apply every queued message. Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.apply(msg);
            applied += 1;
        }
        applied
    }

    /// Apply one message.
    pub fn apply(&mut self, msg: UiMessage) {
        match msg {
            UiMessage::ShiftState { sampled_at, state } => {
                if let Err(e) = &state {
                    // Only raise the dialog the first time the shift turns bad.
                    if !matches!(self.attendance, Some(Err(_))) {
                        self.alert = Some(Alert::from(e));
                        self.log(LogLevel::Error, e.to_string());
                    }
                }
                self.attendance = Some(state);
                self.sampled_at = Some(sampled_at);
            }
            UiMessage::SubmissionStarted(kind) => {
                self.is_submitting = true;
                self.log(LogLevel::Info, format!("{} submitting...", kind.label()));
            }
            UiMessage::SubmissionCompleted(message) => {
                self.is_submitting = false;
                self.log(LogLevel::Success, message.clone());
                self.alert = Some(Alert::success(message));
            }
            UiMessage::SubmissionFailed(alert) => {
                self.is_submitting = false;
                self.log(LogLevel::Error, alert.message.clone());
                self.alert = Some(alert);
            }
            UiMessage::HistoryLoaded(entries) => {
                self.log(LogLevel::Info, format!("Loaded {} attendance records", entries.len()));
                self.history = entries;
            }
            UiMessage::ProfileLoaded(profile) => {
                self.log(LogLevel::Info, format!("Loaded profile for {}", profile.name));
                self.profile = Some(profile);
            }
            UiMessage::LoadError(e) => {
                self.log(LogLevel::Error, e.clone());
                self.alert = Some(Alert::new(AlertLevel::Error, "Failed", e));
            }
            UiMessage::ShowAlert(alert) => {
                let level = match alert.level {
                    AlertLevel::Success => LogLevel::Success,
                    AlertLevel::Warning => LogLevel::Warning,
                    AlertLevel::Error | AlertLevel::Fatal => LogLevel::Error,
                };
                self.log(level, alert.message.clone());
                self.alert = Some(alert);
            }
            UiMessage::DismissAlert => {
                // A fatal alert stays up while the shift is still broken.
                let shift_broken = matches!(self.attendance, Some(Err(_)));
                if !(shift_broken && self.alert.as_ref().is_some_and(Alert::is_fatal)) {
                    self.alert = None;
                }
            }
        }
    }

    /// Capture gate for the latest shift state.
    ///
    /// Returns `None` until the first evaluation has arrived.
    pub fn capture_decision(&self, kind: AttendanceKind) -> Option<CaptureDecision> {
        self.attendance.as_ref().map(|state| decide_capture(state, kind))
    }

    /// Whether the capture button for `kind` should be enabled.
    pub fn can_capture(&self, kind: AttendanceKind) -> bool {
        !self.is_submitting && self.capture_decision(kind).is_some_and(|d| d.is_allowed())
    }

    /// Log a message to the UI log.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.log_messages.push(LogEntry {
            timestamp: Local::now(),
            message: message.into(),
            level,
        });

        if self.log_messages.len() > MAX_LOG_ENTRIES {
            self.log_messages.remove(0);
        }
    }
}
