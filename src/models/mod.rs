//! Data models for attendance, leave requests, and user profiles.

pub mod attendance;
pub mod leave;
pub mod profile;

pub use attendance::{AttendanceHistoryEntry, AttendanceKind, AttendanceStatus, AttendanceSubmission, HistorySummary};
pub use leave::{LeaveKind, LeaveRequest};
pub use profile::{UpdateProfile, UserProfile};
