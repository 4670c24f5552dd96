//! Geofence distance check.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Coordinate or radius outside the valid range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidCoordinateError {
    #[error("Latitude {0} out of range [-90, 90]")]
    Latitude(f64),

    #[error("Longitude {0} out of range [-180, 180]")]
    Longitude(f64),

    #[error("Radius {0} must be a non-negative number of meters")]
    Radius(f64),
}

/// WGS84 latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a validated point.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinateError> {
        let point = Self { latitude, longitude };
        point.validate()?;
        Ok(point)
    }

    /// Check both components are finite and in range.
    pub fn validate(&self) -> Result<(), InvalidCoordinateError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(InvalidCoordinateError::Latitude(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(InvalidCoordinateError::Longitude(self.longitude));
        }
        Ok(())
    }

    /// Great-circle distance to `other` in meters (haversine, spherical Earth).
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        // Rounding can push `a` just past 1 for near-antipodal points.
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let a = a.clamp(0.0, 1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }
}

/// Outcome of a geofence check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeofenceResult {
    /// Unrounded great-circle distance.
    pub distance_meters: f64,
    /// `distance_meters <= max_radius_meters`.
    pub within_radius: bool,
}

/// Check whether `current` lies within `max_radius_meters` of `reference`.
///
/// The boundary is inclusive. Both points and the radius are validated
/// first; NaN fails every range check.
pub fn check_within_radius(
    current: GeoPoint,
    reference: GeoPoint,
    max_radius_meters: f64,
) -> Result<GeofenceResult, InvalidCoordinateError> {
    current.validate()?;
    reference.validate()?;
    if !(max_radius_meters.is_finite() && max_radius_meters >= 0.0) {
        return Err(InvalidCoordinateError::Radius(max_radius_meters));
    }

    let distance_meters = current.distance_to(&reference);

    Ok(GeofenceResult {
        distance_meters,
        within_radius: distance_meters <= max_radius_meters,
    })
}

/// Geofence around a fixed reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceChecker {
    reference: GeoPoint,
    max_radius_meters: f64,
}

impl GeofenceChecker {
    pub fn new(reference: GeoPoint, max_radius_meters: f64) -> Result<Self, InvalidCoordinateError> {
        reference.validate()?;
        if !(max_radius_meters.is_finite() && max_radius_meters >= 0.0) {
            return Err(InvalidCoordinateError::Radius(max_radius_meters));
        }
        Ok(Self {
            reference,
            max_radius_meters,
        })
    }

    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    pub fn max_radius_meters(&self) -> f64 {
        self.max_radius_meters
    }

    pub fn check(&self, current: GeoPoint) -> Result<GeofenceResult, InvalidCoordinateError> {
        check_within_radius(current, self.reference, self.max_radius_meters)
    }
}
