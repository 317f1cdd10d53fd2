//! Validation for geographic coordinates and query regions.

use crate::error::{GeoError, Result};
use geoscan_types::point::GeoPoint;
use geoscan_types::region::QueryRegion;

/// Validates a point has finite latitude in [-90, 90] and longitude in [-180, 180].
///
/// # Examples
///
/// ```
/// use geoscan::compute::validation::validate_geographic_point;
/// use geoscan_types::point::GeoPoint;
///
/// assert!(validate_geographic_point(&GeoPoint::new(40.7128, -74.0060)).is_ok());
/// assert!(validate_geographic_point(&GeoPoint::new(95.0, -74.0)).is_err());
/// assert!(validate_geographic_point(&GeoPoint::new(40.0, 200.0)).is_err());
/// ```
pub fn validate_geographic_point(point: &GeoPoint) -> Result<()> {
    let (lat, lng) = (point.lat(), point.lng());

    if !lat.is_finite() {
        return Err(GeoError::invalid_point(format!(
            "Latitude must be finite, got: {}",
            lat
        )));
    }

    if !lng.is_finite() {
        return Err(GeoError::invalid_point(format!(
            "Longitude must be finite, got: {}",
            lng
        )));
    }

    if !(-90.0..=90.0).contains(&lat) {
        return Err(GeoError::invalid_point(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            lat
        )));
    }

    if !(-180.0..=180.0).contains(&lng) {
        return Err(GeoError::invalid_point(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            lng
        )));
    }

    Ok(())
}

/// Validates the corners of a query rectangle.
///
/// Rectangles that wrap the antimeridian (`min.lng > max.lng`) are rejected
/// rather than silently covered the wrong way round.
pub fn validate_rectangle(min: &GeoPoint, max: &GeoPoint) -> Result<()> {
    validate_geographic_point(min)?;
    validate_geographic_point(max)?;

    if min.lat() > max.lat() {
        return Err(GeoError::InvalidRegion(format!(
            "Rectangle min latitude {} is above max latitude {}",
            min.lat(),
            max.lat()
        )));
    }

    if min.lng() > max.lng() {
        return Err(GeoError::InvalidRegion(format!(
            "Rectangle crosses the antimeridian (min lng {} > max lng {}), which is unsupported",
            min.lng(),
            max.lng()
        )));
    }

    Ok(())
}

/// Validates a circle's center and radius.
pub fn validate_circle(center: &GeoPoint, radius_meters: f64) -> Result<()> {
    validate_geographic_point(center)?;

    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(GeoError::InvalidRegion(format!(
            "Radius must be a positive finite number of meters, got: {}",
            radius_meters
        )));
    }

    Ok(())
}

pub fn validate_region(region: &QueryRegion) -> Result<()> {
    match region {
        QueryRegion::Rectangle { min, max } => validate_rectangle(min, max),
        QueryRegion::Circle {
            center,
            radius_meters,
        } => validate_circle(center, *radius_meters),
    }
}
