use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic point expressed as latitude and longitude in degrees.
///
/// The value is not validated on construction; the engine checks the
/// coordinate domain before using a point for indexing or querying.
///
/// # Examples
///
/// ```
/// use geoscan_types::point::GeoPoint;
///
/// let nyc = GeoPoint::new(40.7128, -74.0060);
/// assert_eq!(nyc.lat(), 40.7128);
/// assert_eq!(nyc.lng(), -74.0060);
/// assert!(nyc.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude in degrees.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Whether both coordinates are finite and inside `[-90, 90]` x `[-180, 180]`.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Convert to a `geo::Point` (x = longitude, y = latitude).
    pub fn to_geo(&self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }

    /// Great-circle distance in meters using the Haversine formula.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoscan_types::point::GeoPoint;
    ///
    /// let nyc = GeoPoint::new(40.7128, -74.0060);
    /// let la = GeoPoint::new(34.0522, -118.2437);
    /// assert!(nyc.haversine_distance(&la) > 3_900_000.0);
    /// ```
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        Haversine.distance(self.to_geo(), other.to_geo())
    }
}

impl From<Point<f64>> for GeoPoint {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<GeoPoint> for Point<f64> {
    fn from(point: GeoPoint) -> Self {
        point.to_geo()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}
