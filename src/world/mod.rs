//! World State Module
//!
//! Local mirror of shared world state, kept consistent with the server
//! through the sync client.
//!
//! ## Module Structure
//!
//! - `blocks`: Sparse set of occupied tiles
//! - `roster`: Remote players and their last-known positions

pub mod blocks;
pub mod roster;

// Re-export key types
pub use blocks::WorldBlockStore;
pub use roster::{PlayerId, RemoteRoster};

/// Everything the server is authoritative for, as mirrored locally.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    /// Placed blocks.
    pub blocks: WorldBlockStore,
    /// Other connected players.
    pub roster: RemoteRoster,
}

impl WorldState {
    /// Empty world.
    pub fn new() -> Self {
        Self::default()
    }
}
