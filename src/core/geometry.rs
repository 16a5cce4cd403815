//! Grid Geometry
//!
//! World ↔ tile conversion and axis-aligned bounding boxes.
//!
//! ## Conventions
//!
//! ```text
//!   tile (i, j) covers [i*S, (i+1)*S) × [j*S, (j+1)*S)
//!   canonical point    (i*S + S/2, j*S + S/2)
//! ```
//!
//! Overlap is half-open: boxes that merely touch along an edge do not
//! overlap, so a player can rest flush against a wall.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::TILE_SIZE;

/// Integer tile coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TilePos {
    /// Column index
    pub i: i32,
    /// Row index (grows downward)
    pub j: i32,
}

impl TilePos {
    /// Create a tile coordinate.
    #[inline]
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Tile containing a world point.
    #[inline]
    pub fn containing(point: Vec2) -> Self {
        Self {
            i: to_tile(point.x),
            j: to_tile(point.y),
        }
    }

    /// Tile containing a world point, or `None` when the point is not
    /// finite or lies beyond the range of tile indices.
    #[inline]
    pub fn try_containing(point: Vec2) -> Option<Self> {
        Some(Self {
            i: try_to_tile(point.x)?,
            j: try_to_tile(point.y)?,
        })
    }

    /// Center of this tile, the identity of a block placed here.
    #[inline]
    pub fn canonical_point(self) -> Vec2 {
        canonical_point(self.i, self.j)
    }

    /// World-space box covered by this tile.
    #[inline]
    pub fn aabb(self) -> Aabb {
        tile_aabb(self.i, self.j)
    }
}

/// Axis-aligned bounding box in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum x
    pub left: f64,
    /// Maximum x
    pub right: f64,
    /// Minimum y
    pub top: f64,
    /// Maximum y
    pub bottom: f64,
}

impl Aabb {
    /// Check overlap with another box (half-open).
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        overlaps(self, other)
    }

    /// Inclusive range of tiles this box touches.
    ///
    /// A right or bottom edge lying exactly on a tile boundary does not
    /// reach into the next tile.
    pub fn tile_span(&self) -> (TilePos, TilePos) {
        let min = TilePos::new(to_tile(self.left), to_tile(self.top));
        let max = TilePos::new(
            edge_to_tile(self.right).max(min.i),
            edge_to_tile(self.bottom).max(min.j),
        );
        (min, max)
    }
}

/// Tile index containing a world coordinate (floor division by tile size).
///
/// Saturates at the ends of the `i32` range. Use [`try_to_tile`] where a
/// saturated index would alias a real tile.
#[inline]
pub fn to_tile(world: f64) -> i32 {
    (world / TILE_SIZE).floor() as i32
}

/// Tile index containing a world coordinate, if it is representable.
#[inline]
pub fn try_to_tile(world: f64) -> Option<i32> {
    let t = (world / TILE_SIZE).floor();
    if t >= f64::from(i32::MIN) && t <= f64::from(i32::MAX) {
        Some(t as i32)
    } else {
        None
    }
}

/// Tile index of the last tile reached by an exclusive max edge.
#[inline]
fn edge_to_tile(edge: f64) -> i32 {
    ((edge / TILE_SIZE).ceil() as i32).saturating_sub(1)
}

/// World box covered by tile `(i, j)`.
#[inline]
pub fn tile_aabb(i: i32, j: i32) -> Aabb {
    let (i, j) = (f64::from(i), f64::from(j));
    Aabb {
        left: i * TILE_SIZE,
        right: (i + 1.0) * TILE_SIZE,
        top: j * TILE_SIZE,
        bottom: (j + 1.0) * TILE_SIZE,
    }
}

/// Center of tile `(i, j)`.
#[inline]
pub fn canonical_point(i: i32, j: i32) -> Vec2 {
    Vec2::new(
        f64::from(i) * TILE_SIZE + TILE_SIZE / 2.0,
        f64::from(j) * TILE_SIZE + TILE_SIZE / 2.0,
    )
}

/// Box centered on `(center_x, center_y)` with the given half extents.
#[inline]
pub fn make_aabb(center_x: f64, center_y: f64, half_w: f64, half_h: f64) -> Aabb {
    Aabb {
        left: center_x - half_w,
        right: center_x + half_w,
        top: center_y - half_h,
        bottom: center_y + half_h,
    }
}

/// True unless the boxes are separated on some axis. Touching edges are separated.
#[inline]
pub fn overlaps(a: &Aabb, b: &Aabb) -> bool {
    !(a.right <= b.left || a.left >= b.right || a.bottom <= b.top || a.top >= b.bottom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_tile_floors_negative() {
        assert_eq!(to_tile(0.0), 0);
        assert_eq!(to_tile(49.999), 0);
        assert_eq!(to_tile(50.0), 1);
        assert_eq!(to_tile(-0.001), -1);
        assert_eq!(to_tile(-50.0), -1);
        assert_eq!(to_tile(-50.001), -2);
    }

    #[test]
    fn test_try_to_tile_rejects_unrepresentable() {
        assert_eq!(try_to_tile(75.0), Some(1));
        assert_eq!(try_to_tile(-25.0), Some(-1));
        assert_eq!(try_to_tile(2.0e11), None);
        assert_eq!(try_to_tile(-2.0e11), None);
        assert_eq!(try_to_tile(f64::NAN), None);
        assert_eq!(try_to_tile(f64::INFINITY), None);

        // Every tile's own center maps back to it, including the extremes.
        for tile in [TilePos::new(i32::MAX, i32::MIN), TilePos::new(i32::MIN, i32::MAX)] {
            assert_eq!(TilePos::try_containing(tile.canonical_point()), Some(tile));
        }
        assert_eq!(TilePos::try_containing(Vec2::new(3.0e11 + 25.0, 25.0)), None);
    }

    #[test]
    fn test_tile_aabb_and_canonical_point() {
        let b = tile_aabb(1, 2);
        assert_eq!(b, Aabb { left: 50.0, right: 100.0, top: 100.0, bottom: 150.0 });
        assert_eq!(canonical_point(1, 1), Vec2::new(75.0, 75.0));
        assert_eq!(TilePos::containing(Vec2::new(75.0, 75.0)), TilePos::new(1, 1));
        assert_eq!(TilePos::new(-1, 0).canonical_point(), Vec2::new(-25.0, 25.0));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let wall = tile_aabb(1, 1);
        let flush = make_aabb(25.0, 75.0, 25.0, 25.0);
        assert_eq!(flush.right, wall.left);
        assert!(!overlaps(&flush, &wall));

        let below = make_aabb(75.0, 125.0, 25.0, 25.0);
        assert!(!overlaps(&below, &wall));
    }

    #[test]
    fn test_penetration_overlaps() {
        let wall = tile_aabb(1, 1);
        let inside = make_aabb(26.0, 75.0, 25.0, 25.0);
        assert!(overlaps(&inside, &wall));
        assert!(wall.overlaps(&inside));
    }

    #[test]
    fn test_tile_span_excludes_boundary_edges() {
        // Exactly one tile.
        let (min, max) = tile_aabb(3, 4).tile_span();
        assert_eq!(min, TilePos::new(3, 4));
        assert_eq!(max, TilePos::new(3, 4));

        // Straddling four tiles.
        let (min, max) = make_aabb(50.0, 50.0, 25.0, 25.0).tile_span();
        assert_eq!(min, TilePos::new(0, 0));
        assert_eq!(max, TilePos::new(1, 1));
    }

    #[test]
    fn test_tile_span_far_from_origin_saturates() {
        let (min, max) = make_aabb(-2.0e11, 0.0, 25.0, 25.0).tile_span();
        assert_eq!(min.i, i32::MIN);
        assert_eq!(max.i, i32::MIN);
        assert_eq!(min.j, -1);
        assert_eq!(max.j, 0);

        let (min, max) = make_aabb(2.0e11, 0.0, 25.0, 25.0).tile_span();
        assert_eq!((min.i, max.i), (i32::MAX, i32::MAX));
    }
}
