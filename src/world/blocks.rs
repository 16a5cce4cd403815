//! World Block Store
//!
//! Sparse set of occupied tiles. A block's identity is its canonical point
//! (the tile center), so the store is keyed by [`TilePos`] and value
//! equality of points is exact integer equality.
//!
//! Mutations are synchronous and visible to the very next query.

use std::collections::HashSet;

use crate::core::geometry::{make_aabb, overlaps, Aabb, TilePos};
use crate::core::vec2::Vec2;
use crate::TILE_SIZE;

/// First solid row of the offline ground band.
pub const GROUND_ROW: i32 = 13;
/// Column left open in the offline ground band.
pub const SHAFT_COLUMN: i32 = 12;
/// Row from which the shaft is open.
pub const SHAFT_ROW: i32 = 15;

/// Set of placed blocks.
#[derive(Clone, Debug, Default)]
pub struct WorldBlockStore {
    tiles: HashSet<TilePos>,
}

impl WorldBlockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a list of block points.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut store = Self::new();
        store.replace_all(points);
        store
    }

    /// Number of blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Check if the store is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Check for a block at the tile containing `point`.
    ///
    /// Points outside the tile range never hold a block.
    #[inline]
    pub fn has(&self, point: Vec2) -> bool {
        TilePos::try_containing(point).map_or(false, |tile| self.tiles.contains(&tile))
    }

    /// Check for a block at a tile.
    #[inline]
    pub fn has_tile(&self, tile: TilePos) -> bool {
        self.tiles.contains(&tile)
    }

    /// Add a block. Returns false if it was already present or `point`
    /// lies outside the tile range.
    #[inline]
    pub fn add(&mut self, point: Vec2) -> bool {
        TilePos::try_containing(point).map_or(false, |tile| self.add_tile(tile))
    }

    /// Add a block by tile. Returns false if it was already present.
    #[inline]
    pub fn add_tile(&mut self, tile: TilePos) -> bool {
        self.tiles.insert(tile)
    }

    /// Remove a block. Returns false if nothing was there.
    #[inline]
    pub fn remove(&mut self, point: Vec2) -> bool {
        TilePos::try_containing(point).map_or(false, |tile| self.remove_tile(tile))
    }

    /// Remove a block by tile. Returns false if nothing was there.
    #[inline]
    pub fn remove_tile(&mut self, tile: TilePos) -> bool {
        self.tiles.remove(&tile)
    }

    /// Clear and repopulate from a full snapshot.
    ///
    /// Only valid as the initial seed of a session: it discards everything
    /// the store currently holds. Points outside the tile range are skipped.
    pub fn replace_all<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = Vec2>,
    {
        self.tiles.clear();
        self.tiles
            .extend(points.into_iter().filter_map(TilePos::try_containing));
    }

    /// Fill the offline ground band for a `cols` x `rows` screen of tiles.
    ///
    /// Rows from [`GROUND_ROW`] down are solid, except column [`SHAFT_COLUMN`]
    /// which is open from [`SHAFT_ROW`] down. Returns the number of blocks
    /// added.
    pub fn seed_ground(&mut self, cols: i32, rows: i32) -> usize {
        let before = self.tiles.len();
        for j in GROUND_ROW..rows {
            for i in 0..cols {
                if i == SHAFT_COLUMN && j >= SHAFT_ROW {
                    continue;
                }
                self.tiles.insert(TilePos::new(i, j));
            }
        }
        self.tiles.len() - before
    }

    /// Iterate occupied tiles (unordered).
    pub fn tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.tiles.iter().copied()
    }

    /// Iterate canonical points of all blocks (unordered).
    pub fn points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.tiles.iter().map(|t| t.canonical_point())
    }

    /// Check whether `aabb` overlaps any stored block.
    ///
    /// Each block's box is rebuilt from its canonical point ± half a tile.
    /// Only tiles around the query's span are checked; when that window holds
    /// more cells than the store has blocks, a linear scan is cheaper.
    pub fn overlaps_any(&self, aabb: &Aabb) -> bool {
        if self.tiles.is_empty() {
            return false;
        }

        let (min, max) = aabb.tile_span();
        // One cell of slack on every side keeps the lookup exact under rounding.
        let (min_i, max_i) = (min.i.saturating_sub(1), max.i.saturating_add(1));
        let (min_j, max_j) = (min.j.saturating_sub(1), max.j.saturating_add(1));
        let cells = (i64::from(max_i) - i64::from(min_i) + 1)
            * (i64::from(max_j) - i64::from(min_j) + 1);

        if cells as u64 > self.tiles.len() as u64 {
            return self.tiles.iter().any(|t| overlaps(aabb, &block_aabb(*t)));
        }

        for j in min_j..=max_j {
            for i in min_i..=max_i {
                let tile = TilePos::new(i, j);
                if self.tiles.contains(&tile) && overlaps(aabb, &block_aabb(tile)) {
                    return true;
                }
            }
        }
        false
    }
}

/// Box of a block built from its canonical point.
#[inline]
fn block_aabb(tile: TilePos) -> Aabb {
    let center = tile.canonical_point();
    let half = TILE_SIZE / 2.0;
    make_aabb(center.x, center.y, half, half)
}
