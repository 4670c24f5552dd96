//! Attendance DTOs and history view models.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::shift::AttendanceState;

/// Clock-in or clock-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceKind {
    #[serde(rename = "masuk")]
    ClockIn,
    #[serde(rename = "pulang")]
    ClockOut,
}

impl AttendanceKind {
    /// Wire value for the multipart `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceKind::ClockIn => "masuk",
            AttendanceKind::ClockOut => "pulang",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            AttendanceKind::ClockIn => "Clock in",
            AttendanceKind::ClockOut => "Clock out",
        }
    }
}

/// Attendance status string understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// On time.
    Hadir,
    /// Clocked in after shift start.
    Terlambat,
    /// Clocked out at or after shift end.
    Pulang,
    /// Clocked out before shift end.
    #[serde(rename = "Pulang Cepat")]
    PulangCepat,
    /// Any status this client does not know about (leave, absence...).
    #[serde(other)]
    Lainnya,
}

impl AttendanceStatus {
    /// Status for a clock-in at the given state.
    pub fn for_clock_in(state: &AttendanceState) -> Self {
        if state.is_late {
            AttendanceStatus::Terlambat
        } else {
            AttendanceStatus::Hadir
        }
    }

    /// Status for a clock-out at the given state.
    pub fn for_clock_out(state: &AttendanceState) -> Self {
        if state.is_after_shift {
            AttendanceStatus::Pulang
        } else {
            AttendanceStatus::PulangCepat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Hadir => "Hadir",
            AttendanceStatus::Terlambat => "Terlambat",
            AttendanceStatus::Pulang => "Pulang",
            AttendanceStatus::PulangCepat => "Pulang Cepat",
            AttendanceStatus::Lainnya => "Lainnya",
        }
    }
}

/// Payload for one clock-in/clock-out submission.
#[derive(Debug, Clone)]
pub struct AttendanceSubmission {
    pub kind: AttendanceKind,
    pub status: AttendanceStatus,
    pub location: GeoPoint,
    pub distance_meters: f64,
    /// Selfie captured for this submission.
    pub photo: PathBuf,
}

/// One attendance record as returned by the history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceHistoryEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: AttendanceKind,
    pub status: AttendanceStatus,
    #[serde(with = "server_datetime")]
    pub check_time: NaiveDateTime,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Counts over a set of history entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistorySummary {
    pub on_time: usize,
    pub late: usize,
    pub clock_out: usize,
    pub early_leave: usize,
}

impl HistorySummary {
    pub fn from_entries(entries: &[AttendanceHistoryEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut summary, entry| {
            match entry.status {
                AttendanceStatus::Hadir => summary.on_time += 1,
                AttendanceStatus::Terlambat => summary.late += 1,
                AttendanceStatus::Pulang => summary.clock_out += 1,
                AttendanceStatus::PulangCepat => summary.early_leave += 1,
                AttendanceStatus::Lainnya => {}
            }
            summary
        })
    }

    /// Number of days with a clock-in.
    pub fn days_present(&self) -> usize {
        self.on_time + self.late
    }
}

/// Entries in the given calendar month, newest first.
pub fn entries_in_month(entries: &[AttendanceHistoryEntry], year: i32, month: u32) -> Vec<AttendanceHistoryEntry> {
    let mut selected: Vec<AttendanceHistoryEntry> = entries
        .iter()
        .filter(|e| e.check_time.year() == year && e.check_time.month() == month)
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.check_time.cmp(&a.check_time));
    selected
}

/// Backend timestamps use `YYYY-MM-DD HH:MM:SS` in local time.
pub(crate) mod server_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}
