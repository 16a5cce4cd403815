//! Core primitives.
//!
//! Pure math with no state: world vectors and grid geometry.

pub mod geometry;
pub mod vec2;

// Re-export core types
pub use geometry::{canonical_point, make_aabb, overlaps, tile_aabb, to_tile, Aabb, TilePos};
pub use vec2::Vec2;
