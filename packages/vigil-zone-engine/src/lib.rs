//! Zone polygon geometry, validated/versioned zone maps, and per-frame
//! membership evaluation with exclude-before-include semantics.

mod engine;
mod geometry;
mod loader;

pub use engine::ZoneEngine;
pub use geometry::{point_in_polygon, validate_polygon, PolygonError};
pub use loader::{build_zone_map, validate_zone_map, ZoneMapError};
