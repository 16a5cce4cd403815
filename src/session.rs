//! Client Session
//!
//! Per-connection context: the local player, the world mirror and the sync
//! client, created on connect and dropped on disconnect. The host loop owns
//! exactly one session and is its only writer.

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::core::vec2::Vec2;
use crate::network::protocol::{ProtocolError, ServerMessage};
use crate::network::sync::{IntentOutcome, SyncClient, SyncConfig};
use crate::network::transport::Outbound;
use crate::sim::input::DirectionalInput;
use crate::sim::movement::{integrate, MovementConfig, PlayerState, TickOutcome};
use crate::world::WorldState;

/// One connected session.
pub struct Session<T: Outbound> {
    id: Uuid,
    tick: u64,
    player: PlayerState,
    world: WorldState,
    movement: MovementConfig,
    sync: SyncClient<T>,
}

impl<T: Outbound> Session<T> {
    /// Start a session with the player at rest at `spawn`.
    pub fn new(outbound: T, spawn: Vec2, movement: MovementConfig, sync: SyncConfig) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, x = spawn.x, y = spawn.y, "session started");
        Self {
            id,
            tick: 0,
            player: PlayerState::new(spawn),
            world: WorldState::new(),
            movement,
            sync: SyncClient::new(outbound, sync),
        }
    }

    /// Start a session from client configuration.
    pub fn from_config(outbound: T, config: &ClientConfig) -> Self {
        Self::new(outbound, config.spawn, config.movement, config.sync)
    }

    /// Local session id (log correlation only; the server never sees it).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Local player.
    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// World mirror.
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// World mirror, mutably (offline seeding).
    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    /// Movement tuning in use.
    pub fn movement(&self) -> &MovementConfig {
        &self.movement
    }

    /// Sync client.
    pub fn sync(&self) -> &SyncClient<T> {
        &self.sync
    }

    /// Sync client, mutably.
    pub fn sync_mut(&mut self) -> &mut SyncClient<T> {
        &mut self.sync
    }

    /// Run one simulation tick and report the committed position upstream.
    pub fn tick(&mut self, input: &DirectionalInput) -> TickOutcome {
        self.tick += 1;
        self.sync.advance_tick();
        let outcome = integrate(&mut self.player, input, &self.world.blocks, &self.movement);
        self.sync.report_position(&mut self.player);
        outcome
    }

    /// Apply one inbound text frame. Malformed frames are dropped.
    pub fn handle_inbound(&mut self, text: &str) -> Result<(), ProtocolError> {
        self.sync.handle_text(text, &mut self.world)
    }

    /// Apply one decoded inbound event.
    pub fn apply(&mut self, msg: ServerMessage) {
        self.sync.apply(msg, &mut self.world);
    }

    /// Ask the server to flip the tile under a world point.
    pub fn toggle_block(&mut self, point: Vec2) -> IntentOutcome {
        let outcome = self.sync.request_toggle(point, &self.world);
        debug!(x = point.x, y = point.y, ?outcome, "block toggle");
        outcome
    }
}
