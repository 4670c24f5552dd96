//! Leave request DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Leave category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveKind {
    #[serde(rename = "sakit")]
    Sick,
    #[serde(rename = "cuti")]
    Annual,
    #[serde(rename = "izin")]
    Permit,
}

impl LeaveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveKind::Sick => "sakit",
            LeaveKind::Annual => "cuti",
            LeaveKind::Permit => "izin",
        }
    }
}

impl std::str::FromStr for LeaveKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sakit" | "sick" => Ok(LeaveKind::Sick),
            "cuti" | "annual" => Ok(LeaveKind::Annual),
            "izin" | "permit" => Ok(LeaveKind::Permit),
            other => Err(AppError::validation(format!("Unknown leave type '{other}'"))),
        }
    }
}

/// DTO for submitting a leave request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    #[serde(rename = "type")]
    pub kind: LeaveKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

impl LeaveRequest {
    /// Check the request before sending it.
    pub fn validate(&self) -> Result<()> {
        if self.reason.trim().is_empty() {
            return Err(AppError::validation("Reason cannot be empty"));
        }
        if self.start_date > self.end_date {
            return Err(AppError::validation("Start date must not be after end date"));
        }
        Ok(())
    }

    /// Number of calendar days covered, inclusive.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}
