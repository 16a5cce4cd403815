//! Simulation Module
//!
//! Per-tick movement of the local player. Synchronous and allocation-free;
//! reads the block store but never mutates shared state.
//!
//! ## Module Structure
//!
//! - `input`: Directional input snapshot
//! - `movement`: Friction and axis-separated collision

pub mod input;
pub mod movement;

// Re-export key types
pub use input::{Direction, DirectionalInput};
pub use movement::{integrate, MovementConfig, PlayerState, TickOutcome};
