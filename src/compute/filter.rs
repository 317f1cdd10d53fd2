//! Exact post-filter for covering-based candidates.
//!
//! A covering is a superset of the query region, so the store returns points
//! that lie near but outside it. The filter decodes every candidate's payload
//! and keeps only the points the region actually contains.

use crate::error::Result;
use crate::storage::item::{Item, decode_point, string_attribute};
use geoscan_types::point::GeoPoint;
use geoscan_types::region::QueryRegion;

/// A stored item together with its decoded location.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoItem {
    pub point: GeoPoint,
    pub item: Item,
}

/// Keeps candidates whose payload point lies inside a region.
#[derive(Debug, Clone)]
pub struct ResultFilter<'a> {
    region: &'a QueryRegion,
    payload_attribute: &'a str,
}

impl<'a> ResultFilter<'a> {
    pub fn new(region: &'a QueryRegion, payload_attribute: &'a str) -> Self {
        Self {
            region,
            payload_attribute,
        }
    }

    /// Decode the payload point of `item`.
    pub fn decode(&self, item: &Item) -> Result<GeoPoint> {
        decode_point(string_attribute(item, self.payload_attribute)?)
    }

    /// Filter `items`, failing the whole step if any payload cannot be decoded.
    pub fn apply(&self, items: Vec<Item>) -> Result<Vec<GeoItem>> {
        let mut kept = Vec::new();
        for item in items {
            let point = self.decode(&item)?;
            if self.region.contains(&point) {
                kept.push(GeoItem { point, item });
            }
        }
        Ok(kept)
    }
}
