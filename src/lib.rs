//! # Blockworld Client Core
//!
//! Movement integration and world-state synchronization for a multiplayer,
//! tile-aligned 2D block world.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    BLOCKWORLD CLIENT                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Pure primitives                           │
//! │  ├── vec2.rs     - Float world vector                        │
//! │  └── geometry.rs - Tiles, AABBs, half-open overlap           │
//! │                                                              │
//! │  world/          - Local mirror of shared state              │
//! │  ├── blocks.rs   - Sparse block store                        │
//! │  └── roster.rs   - Remote players, last-known positions      │
//! │                                                              │
//! │  sim/            - Per-tick simulation                       │
//! │  ├── input.rs    - Directional input snapshot                │
//! │  └── movement.rs - Friction + axis-separated collision       │
//! │                                                              │
//! │  network/        - Server channel                            │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── sync.rs     - Position hysteresis, intents, dispatch    │
//! │  └── transport.rs- WebSocket binding                         │
//! │                                                              │
//! │  session.rs      - Per-connection context                    │
//! │  render.rs       - Rendering adapter seam                    │
//! │  config.rs       - Client configuration                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threading
//!
//! Everything under `core/`, `world/`, `sim/` and the sync client is
//! synchronous and single-writer. The host loop owns one [`Session`] and
//! applies ticks and inbound events from a single task; only the transport
//! runs background tasks, and those never touch session state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod network;
pub mod render;
pub mod session;
pub mod sim;
pub mod world;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError};
pub use core::geometry::{Aabb, TilePos};
pub use core::vec2::Vec2;
pub use network::protocol::{ClientMessage, ServerMessage};
pub use network::sync::{SyncClient, SyncConfig};
pub use network::transport::{Outbound, TransportError};
pub use render::{RenderAdapter, RenderSync, Viewport};
pub use session::Session;
pub use sim::input::DirectionalInput;
pub use sim::movement::{MovementConfig, PlayerState, TickOutcome};
pub use world::blocks::WorldBlockStore;
pub use world::roster::{PlayerId, RemoteRoster};
pub use world::WorldState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Edge length of one grid cell in world units.
pub const TILE_SIZE: f64 = 50.0;

/// Default simulation tick rate (Hz).
pub const TICK_RATE: u32 = 60;
