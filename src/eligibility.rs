//! Attendance eligibility: turns shift state and geofence results into
//! allow/block decisions for the capture and submit steps.

use std::fmt;

use crate::geo::{GeoPoint, GeofenceChecker, GeofenceResult, InvalidCoordinateError};
use crate::models::{AttendanceKind, AttendanceStatus};
use crate::shift::{AttendanceState, ShiftParseError};

/// Why an attendance action is not permitted.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockReason {
    /// Shift missing or malformed. Needs an administrator.
    ShiftUnavailable(ShiftParseError),
    /// Clock-in attempted after shift end plus grace.
    TooLate,
    /// Device is farther from the office than allowed.
    OutsideRadius {
        distance_meters: f64,
        max_radius_meters: f64,
    },
    /// Device reported an impossible coordinate.
    InvalidLocation(InvalidCoordinateError),
}

impl BlockReason {
    /// Whether retrying can never succeed without outside help.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BlockReason::ShiftUnavailable(_))
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::ShiftUnavailable(e) => f.write_str(e.user_message()),
            BlockReason::TooLate => write!(f, "Clock-in is closed: your shift and grace period have ended."),
            BlockReason::OutsideRadius {
                distance_meters,
                max_radius_meters,
            } => write!(
                f,
                "You are {} from the office. Attendance is only allowed within {}.",
                format_distance(*distance_meters),
                format_distance(*max_radius_meters)
            ),
            BlockReason::InvalidLocation(_) => write!(f, "Unable to read your location. Please try again."),
        }
    }
}

/// Outcome of the capture gate.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureDecision {
    /// Capture may proceed and will be recorded with `status`.
    Allowed {
        status: AttendanceStatus,
        /// Shown before capture but does not block it.
        warning: Option<String>,
    },
    Blocked(BlockReason),
}

impl CaptureDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CaptureDecision::Allowed { .. })
    }
}

/// Decide whether a selfie capture for `kind` may start.
pub fn decide_capture(state: &Result<AttendanceState, ShiftParseError>, kind: AttendanceKind) -> CaptureDecision {
    let state = match state {
        Ok(state) => state,
        Err(e) => return CaptureDecision::Blocked(BlockReason::ShiftUnavailable(e.clone())),
    };

    match kind {
        AttendanceKind::ClockIn => {
            if state.is_after_shift_plus_grace {
                return CaptureDecision::Blocked(BlockReason::TooLate);
            }
            let status = AttendanceStatus::for_clock_in(state);
            let warning = if state.is_after_shift {
                Some("Your shift has ended. This clock-in will be recorded as late.".to_string())
            } else if state.is_late {
                Some("You are past your shift start. This clock-in will be recorded as late.".to_string())
            } else {
                None
            };
            CaptureDecision::Allowed { status, warning }
        }
        AttendanceKind::ClockOut => {
            let status = AttendanceStatus::for_clock_out(state);
            let warning = state
                .is_before_end_shift
                .then(|| "Your shift has not ended yet. This clock-out will be recorded as early.".to_string());
            CaptureDecision::Allowed { status, warning }
        }
    }
}

/// Decide whether a captured record may be submitted from `position`.
pub fn check_submission(geofence: &GeofenceChecker, position: GeoPoint) -> Result<GeofenceResult, BlockReason> {
    let result = geofence.check(position).map_err(BlockReason::InvalidLocation)?;
    if !result.within_radius {
        return Err(BlockReason::OutsideRadius {
            distance_meters: result.distance_meters,
            max_radius_meters: geofence.max_radius_meters(),
        });
    }
    Ok(result)
}

/// Round a distance for display: whole meters below 1 km, one decimal above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shift::{DEFAULT_GRACE_SECONDS, ShiftDefinition, TimeOfDay};

    fn state_at(seconds: u32) -> Result<AttendanceState, ShiftParseError> {
        let shift = ShiftDefinition::parse("08:00 - 16:00").unwrap();
        Ok(shift.evaluate(TimeOfDay::from_seconds(seconds).unwrap(), DEFAULT_GRACE_SECONDS))
    }

    #[test]
    fn test_shift_error_blocks_everything() {
        let state = Err(ShiftParseError::Missing);
        for kind in [AttendanceKind::ClockIn, AttendanceKind::ClockOut] {
            match decide_capture(&state, kind) {
                CaptureDecision::Blocked(reason) => assert!(reason.is_fatal()),
                other => panic!("expected block, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_clock_in_on_time() {
        let decision = decide_capture(&state_at(27_000), AttendanceKind::ClockIn);
        assert_eq!(
            decision,
            CaptureDecision::Allowed {
                status: AttendanceStatus::Hadir,
                warning: None
            }
        );
    }

    #[test]
    fn test_clock_in_late_warns() {
        match decide_capture(&state_at(30_000), AttendanceKind::ClockIn) {
            CaptureDecision::Allowed { status, warning } => {
                assert_eq!(status, AttendanceStatus::Terlambat);
                assert!(warning.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_clock_in_within_grace_allowed() {
        let decision = decide_capture(&state_at(60_000), AttendanceKind::ClockIn);
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_clock_in_after_grace_blocked() {
        let decision = decide_capture(&state_at(62_000), AttendanceKind::ClockIn);
        assert_eq!(decision, CaptureDecision::Blocked(BlockReason::TooLate));
    }

    #[test]
    fn test_clock_out_early_and_normal() {
        match decide_capture(&state_at(50_000), AttendanceKind::ClockOut) {
            CaptureDecision::Allowed { status, warning } => {
                assert_eq!(status, AttendanceStatus::PulangCepat);
                assert!(warning.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(
            decide_capture(&state_at(62_000), AttendanceKind::ClockOut),
            CaptureDecision::Allowed {
                status: AttendanceStatus::Pulang,
                warning: None
            }
        );
    }

    #[test]
    fn test_submission_inside_and_outside() {
        let office = GeoPoint::new(-6.3, 106.9).unwrap();
        let near = GeoPoint::new(-6.2, 106.8).unwrap();

        let wide = GeofenceChecker::new(office, 100_000.0).unwrap();
        assert!(check_submission(&wide, near).unwrap().within_radius);

        let tight = GeofenceChecker::new(office, 100.0).unwrap();
        match check_submission(&tight, near) {
            Err(BlockReason::OutsideRadius {
                distance_meters,
                max_radius_meters,
            }) => {
                assert!(distance_meters > 15_000.0);
                assert_eq!(max_radius_meters, 100.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_submission_invalid_location() {
        let office = GeoPoint::new(-6.3, 106.9).unwrap();
        let geofence = GeofenceChecker::new(office, 100.0).unwrap();
        let bogus = GeoPoint {
            latitude: 0.0,
            longitude: 200.0,
        };
        let reason = check_submission(&geofence, bogus).unwrap_err();
        assert!(matches!(reason, BlockReason::InvalidLocation(_)));
        assert!(!reason.is_fatal());
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(849.6), "850 m");
        assert_eq!(format_distance(15_678.67), "15.7 km");
        assert_eq!(format_distance(100_000.0), "100.0 km");
    }

    #[test]
    fn test_outside_radius_message() {
        let reason = BlockReason::OutsideRadius {
            distance_meters: 15_678.67,
            max_radius_meters: 100.0,
        };
        assert_eq!(
            reason.to_string(),
            "You are 15.7 km from the office. Attendance is only allowed within 100 m."
        );
    }
}
