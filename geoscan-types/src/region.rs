use crate::point::GeoPoint;
use serde::{Deserialize, Serialize};

/// The area a query asks about.
///
/// Rectangles are closed on every edge and do not wrap around the
/// antimeridian (`min.lng <= max.lng`). Circles are measured on the
/// planet's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryRegion {
    Rectangle { min: GeoPoint, max: GeoPoint },
    Circle { center: GeoPoint, radius_meters: f64 },
}

/// Discriminator of [`QueryRegion`], handy for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Rectangle,
    Circle,
}

impl QueryRegion {
    pub fn rectangle(min: GeoPoint, max: GeoPoint) -> Self {
        Self::Rectangle { min, max }
    }

    pub fn circle(center: GeoPoint, radius_meters: f64) -> Self {
        Self::Circle {
            center,
            radius_meters,
        }
    }

    pub fn kind(&self) -> RegionKind {
        match self {
            Self::Rectangle { .. } => RegionKind::Rectangle,
            Self::Circle { .. } => RegionKind::Circle,
        }
    }

    /// Exact membership test.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoscan_types::point::GeoPoint;
    /// use geoscan_types::region::QueryRegion;
    ///
    /// let center = GeoPoint::new(48.8566, 2.3522);
    /// let circle = QueryRegion::circle(center, 5_000.0);
    /// assert!(circle.contains(&GeoPoint::new(48.8606, 2.3376)));
    /// assert!(!circle.contains(&GeoPoint::new(51.5074, -0.1278)));
    /// ```
    pub fn contains(&self, point: &GeoPoint) -> bool {
        match self {
            Self::Rectangle { min, max } => {
                (min.lat()..=max.lat()).contains(&point.lat())
                    && (min.lng()..=max.lng()).contains(&point.lng())
            }
            Self::Circle {
                center,
                radius_meters,
            } => center.haversine_distance(point) <= *radius_meters,
        }
    }
}
