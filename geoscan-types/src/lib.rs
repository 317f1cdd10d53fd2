//! # geoscan-types
//!
//! Core geographic value types for the geoscan query engine.
//!
//! - **Points**: [`point::GeoPoint`], a latitude/longitude pair in degrees
//! - **Regions**: [`region::QueryRegion`], the rectangle or circle a query asks about
//!
//! All types are serializable with Serde and convert to and from the `geo`
//! crate's primitives.
//!
//! ## Examples
//!
//! ```rust
//! use geoscan_types::point::GeoPoint;
//! use geoscan_types::region::QueryRegion;
//!
//! let nyc = GeoPoint::new(40.7128, -74.0060);
//! let area = QueryRegion::rectangle(GeoPoint::new(40.70, -74.02), GeoPoint::new(40.73, -73.99));
//! assert!(area.contains(&nyc));
//! ```

pub mod point;
pub mod region;
