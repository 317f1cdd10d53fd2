//! Cell indexing, range planning, coordinate validation, and result filtering.

pub mod cell;
pub mod filter;
pub mod range;
pub mod validation;

pub use cell::{CellId, ShardKey, cell_of, cover_circle, cover_rectangle, shard_key_of};
pub use filter::{GeoItem, ResultFilter};
pub use range::{GeohashRange, ShardRange, merge_ranges, plan_scans};
