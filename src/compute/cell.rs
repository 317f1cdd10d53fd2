//! Mapping between geographic coordinates and S2 cell ids.
//!
//! Points are indexed by the id of the S2 leaf cell containing them. Cell ids
//! are ordered along a Hilbert curve, so nearby points tend to have nearby
//! ids and a region can be approximated by a handful of contiguous id ranges.
//! The partition (shard) key of a point is the leading `hash_key_length` bits
//! of its cell id.

use crate::compute::range::GeohashRange;
use crate::compute::validation::{
    validate_circle, validate_geographic_point, validate_rectangle, validate_region,
};
use crate::config::CoveringConfig;
use crate::error::Result;
use geoscan_types::point::GeoPoint;
use geoscan_types::region::QueryRegion;
use s2::cellid::CellID;
use s2::latlng::LatLng;
use s2::rect::Rect;
use s2::region::RegionCoverer;

/// 64-bit S2 cell id. Ordering follows the Hilbert curve.
pub type CellId = u64;

/// Partition key derived from the leading bits of a [`CellId`].
pub type ShardKey = u64;

/// Deepest S2 level; leaf cells are roughly 1cm across.
pub const MAX_LEVEL: u8 = 30;

/// Mean Earth radius in meters, matching the Haversine metric used when filtering.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Relative slack added to a circle's angular radius before bounding it, so
/// rounding never drops a cell that the exact filter would accept.
const CIRCLE_BOUND_SLACK: f64 = 1e-6;

/// Leaf cell id of `point`.
///
/// # Examples
///
/// ```
/// use geoscan::compute::cell::cell_of;
/// use geoscan_types::point::GeoPoint;
///
/// let a = cell_of(&GeoPoint::new(40.7128, -74.0060)).unwrap();
/// let b = cell_of(&GeoPoint::new(40.7128, -74.0060)).unwrap();
/// assert_eq!(a, b);
/// assert!(cell_of(&GeoPoint::new(91.0, 0.0)).is_err());
/// ```
pub fn cell_of(point: &GeoPoint) -> Result<CellId> {
    cell_of_level(point, MAX_LEVEL)
}

/// Id of the cell at `level` containing `point`.
fn cell_of_level(point: &GeoPoint, level: u8) -> Result<CellId> {
    validate_geographic_point(point)?;

    let leaf = CellID::from(LatLng::from_degrees(point.lat(), point.lng()));
    if level >= MAX_LEVEL {
        Ok(leaf.0)
    } else {
        Ok(leaf.parent(level as u64).0)
    }
}

/// Leading `hash_key_length` bits of `cell`.
///
/// Monotonic in `cell`: if `a <= b` then `shard_key_of(a) <= shard_key_of(b)`.
#[inline]
pub fn shard_key_of(cell: CellId, hash_key_length: u8) -> ShardKey {
    debug_assert!((1..=64).contains(&hash_key_length));
    cell >> shard_shift(hash_key_length)
}

/// The full span of cell ids that map to `shard`.
pub fn shard_bounds(shard: ShardKey, hash_key_length: u8) -> GeohashRange {
    let shift = shard_shift(hash_key_length);
    let min = shard << shift;
    let max = min | low_mask(shift);
    GeohashRange::new_unchecked(min, max)
}

#[inline]
fn shard_shift(hash_key_length: u8) -> u32 {
    64 - hash_key_length as u32
}

#[inline]
fn low_mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

fn coverer(config: &CoveringConfig) -> RegionCoverer {
    RegionCoverer {
        min_level: config.min_level,
        max_level: config.max_level,
        level_mod: 1,
        max_cells: config.max_cells,
    }
}

/// Leaf-id ranges of the covering cells of a lat/lng rectangle, in degrees.
fn cover_degrees(
    lat_lo: f64,
    lng_lo: f64,
    lat_hi: f64,
    lng_hi: f64,
    config: &CoveringConfig,
) -> Vec<GeohashRange> {
    let rect = Rect::from_degrees(lat_lo, lng_lo, lat_hi, lng_hi);
    let union = coverer(config).covering(&rect);

    union
        .0
        .iter()
        .map(|cell| GeohashRange::new_unchecked(cell.range_min().0, cell.range_max().0))
        .collect()
}

/// Cell-id ranges whose union contains every leaf cell intersecting the rectangle.
///
/// The result is a superset of the rectangle; callers filter exactly afterwards.
pub fn cover_rectangle(
    min: &GeoPoint,
    max: &GeoPoint,
    config: &CoveringConfig,
) -> Result<Vec<GeohashRange>> {
    validate_rectangle(min, max)?;
    Ok(rectangle_ranges(min, max, config))
}

fn rectangle_ranges(min: &GeoPoint, max: &GeoPoint, config: &CoveringConfig) -> Vec<GeohashRange> {
    let ranges = cover_degrees(min.lat(), min.lng(), max.lat(), max.lng(), config);
    log::trace!(
        "covered rectangle {} - {} with {} cell ranges",
        min,
        max,
        ranges.len()
    );
    ranges
}

/// Cell-id ranges covering the bounding rectangle(s) of a circle.
pub fn cover_circle(
    center: &GeoPoint,
    radius_meters: f64,
    config: &CoveringConfig,
) -> Result<Vec<GeohashRange>> {
    validate_circle(center, radius_meters)?;
    Ok(circle_ranges(center, radius_meters, config))
}

fn circle_ranges(center: &GeoPoint, radius_meters: f64, config: &CoveringConfig) -> Vec<GeohashRange> {
    bounding_rects_of_circle(center, radius_meters)
        .into_iter()
        .flat_map(|(lo, hi)| cover_degrees(lo.lat(), lo.lng(), hi.lat(), hi.lng(), config))
        .collect()
}

pub fn cover_region(region: &QueryRegion, config: &CoveringConfig) -> Result<Vec<GeohashRange>> {
    validate_region(region)?;
    let ranges = match region {
        QueryRegion::Rectangle { min, max } => rectangle_ranges(min, max, config),
        QueryRegion::Circle {
            center,
            radius_meters,
        } => circle_ranges(center, *radius_meters, config),
    };
    Ok(ranges)
}

/// Lat/lng rectangles (as `(min, max)` corners) that together bound a circle.
///
/// Usually one rectangle. Caps reaching a pole widen to the whole longitude
/// band; caps crossing the antimeridian are split into two rectangles, one on
/// each side of ±180.
pub fn bounding_rects_of_circle(center: &GeoPoint, radius_meters: f64) -> Vec<(GeoPoint, GeoPoint)> {
    let angle = (radius_meters / EARTH_RADIUS_METERS) * (1.0 + CIRCLE_BOUND_SLACK);
    if angle >= std::f64::consts::PI {
        return vec![(GeoPoint::new(-90.0, -180.0), GeoPoint::new(90.0, 180.0))];
    }

    let dlat = angle.to_degrees();
    let lat_lo = center.lat() - dlat;
    let lat_hi = center.lat() + dlat;

    if lat_lo <= -90.0 || lat_hi >= 90.0 {
        return vec![(
            GeoPoint::new(lat_lo.max(-90.0), -180.0),
            GeoPoint::new(lat_hi.min(90.0), 180.0),
        )];
    }

    let sin_ratio = angle.sin() / center.lat().to_radians().cos();
    if sin_ratio >= 1.0 {
        return vec![(GeoPoint::new(lat_lo, -180.0), GeoPoint::new(lat_hi, 180.0))];
    }

    let dlng = sin_ratio.asin().to_degrees();
    let lng_lo = center.lng() - dlng;
    let lng_hi = center.lng() + dlng;

    if lng_lo < -180.0 {
        vec![
            (GeoPoint::new(lat_lo, lng_lo + 360.0), GeoPoint::new(lat_hi, 180.0)),
            (GeoPoint::new(lat_lo, -180.0), GeoPoint::new(lat_hi, lng_hi)),
        ]
    } else if lng_hi > 180.0 {
        vec![
            (GeoPoint::new(lat_lo, lng_lo), GeoPoint::new(lat_hi, 180.0)),
            (GeoPoint::new(lat_lo, -180.0), GeoPoint::new(lat_hi, lng_hi - 360.0)),
        ]
    } else {
        vec![(GeoPoint::new(lat_lo, lng_lo), GeoPoint::new(lat_hi, lng_hi))]
    }
}
