//! Sync Client
//!
//! Keeps the local world mirror consistent with the server and decides when
//! local changes go upstream.
//!
//! ## Outbound
//!
//! - Position: level-triggered hysteresis. A report goes out whenever the
//!   committed position differs from the last *successfully sent* one by more
//!   than the threshold on either axis, so a failed send is retried on the
//!   next tick without any timer.
//! - Block intents: a toggle on a tile sends delete if the store has a block
//!   there, create otherwise. The store is not touched until the server
//!   confirms. One intent per tile may be pending; repeats are suppressed
//!   until the confirmation arrives or the intent times out.
//!
//! ## Inbound
//!
//! Every event is applied the moment it is handed over, in delivery order.
//! Add/remove/upsert/disconnect are idempotent; malformed events are dropped
//! individually.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use tracing::{debug, trace, warn};

use crate::core::geometry::TilePos;
use crate::core::vec2::Vec2;
use crate::network::protocol::{BlockPoint, ClientMessage, ProtocolError, ServerMessage};
use crate::network::transport::Outbound;
use crate::sim::movement::PlayerState;
use crate::world::WorldState;

/// Sync tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Per-axis displacement (world units) that triggers a position report.
    pub report_threshold: f64,
    /// Ticks an unconfirmed block intent stays pending.
    pub intent_timeout_ticks: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            report_threshold: 1.0,
            intent_timeout_ticks: 120,
        }
    }
}

/// Kind of block intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Place a block.
    Create,
    /// Remove a block.
    Delete,
}

/// An intent awaiting server confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingIntent {
    /// What was requested.
    pub kind: IntentKind,
    /// Sync tick at which it was sent.
    pub issued_tick: u64,
}

/// Result of a block toggle request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentOutcome {
    /// Intent sent and now pending.
    Sent(IntentKind),
    /// An intent for this tile is already pending.
    Suppressed(IntentKind),
    /// The transport refused the message; nothing is pending.
    Failed(IntentKind),
    /// The point lies outside the tile range; nothing was sent.
    OutOfRange,
}

/// Counters for periodic status logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Position reports sent.
    pub positions_sent: u64,
    /// Block intents sent.
    pub intents_sent: u64,
    /// Intents suppressed as duplicates.
    pub intents_suppressed: u64,
    /// Intents that timed out unconfirmed.
    pub intents_expired: u64,
    /// Outbound sends that failed.
    pub send_failures: u64,
    /// Inbound events applied.
    pub events_applied: u64,
    /// Inbound events dropped as malformed.
    pub events_dropped: u64,
}

/// Client side of the world-state channel.
pub struct SyncClient<T: Outbound> {
    outbound: T,
    config: SyncConfig,
    pending: HashMap<TilePos, PendingIntent>,
    tick: u64,
    stats: SyncStats,
}

impl<T: Outbound> SyncClient<T> {
    /// Create a sync client sending through `outbound`.
    pub fn new(outbound: T, config: SyncConfig) -> Self {
        Self {
            outbound,
            config,
            pending: HashMap::new(),
            tick: 0,
            stats: SyncStats::default(),
        }
    }

    /// Outbound sink.
    pub fn outbound(&self) -> &T {
        &self.outbound
    }

    /// Outbound sink, mutably.
    pub fn outbound_mut(&mut self) -> &mut T {
        &mut self.outbound
    }

    /// Current counters.
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Number of unconfirmed intents.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending intent for a tile, if any.
    pub fn pending_at(&self, tile: TilePos) -> Option<PendingIntent> {
        self.pending.get(&tile).copied()
    }

    /// Advance the sync clock by one tick and expire stale intents.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
        let timeout = self.config.intent_timeout_ticks;
        let now = self.tick;
        let before = self.pending.len();
        self.pending.retain(|tile, intent| {
            let alive = now.saturating_sub(intent.issued_tick) < timeout;
            if !alive {
                debug!(i = tile.i, j = tile.j, kind = ?intent.kind, "block intent expired unconfirmed");
            }
            alive
        });
        self.stats.intents_expired += (before - self.pending.len()) as u64;
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Report the player's committed position if it moved past the threshold.
    ///
    /// Returns true if a report was sent. `last_reported` only changes on a
    /// successful send.
    pub fn report_position(&mut self, player: &mut PlayerState) -> bool {
        let due = match player.last_reported {
            None => true,
            Some(last) => player
                .position
                .exceeds_on_any_axis(last, self.config.report_threshold),
        };
        if !due {
            return false;
        }

        match self.outbound.send(&ClientMessage::position(player.position)) {
            Ok(()) => {
                player.last_reported = Some(player.position);
                self.stats.positions_sent += 1;
                trace!(x = player.position.x, y = player.position.y, "position reported");
                true
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!("Failed to send position: {}", e);
                false
            }
        }
    }

    /// Request the opposite of the tile's current state at `point`.
    pub fn request_toggle(&mut self, point: Vec2, world: &WorldState) -> IntentOutcome {
        let Some(tile) = TilePos::try_containing(point) else {
            debug!(x = point.x, y = point.y, "toggle outside tile range ignored");
            return IntentOutcome::OutOfRange;
        };
        let kind = if world.blocks.has_tile(tile) {
            IntentKind::Delete
        } else {
            IntentKind::Create
        };

        if let Some(pending) = self.pending.get(&tile) {
            self.stats.intents_suppressed += 1;
            debug!(i = tile.i, j = tile.j, kind = ?pending.kind, "intent already pending");
            return IntentOutcome::Suppressed(pending.kind);
        }

        let canonical = tile.canonical_point();
        let msg = match kind {
            IntentKind::Create => ClientMessage::create_block(canonical),
            IntentKind::Delete => ClientMessage::delete_block(canonical),
        };

        match self.outbound.send(&msg) {
            Ok(()) => {
                self.pending.insert(tile, PendingIntent { kind, issued_tick: self.tick });
                self.stats.intents_sent += 1;
                debug!(x = canonical.x, y = canonical.y, ?kind, "block intent sent");
                IntentOutcome::Sent(kind)
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!("Failed to send block intent: {}", e);
                IntentOutcome::Failed(kind)
            }
        }
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Decode and apply one inbound text frame.
    ///
    /// A malformed frame is logged and dropped; the world is left untouched.
    pub fn handle_text(&mut self, text: &str, world: &mut WorldState) -> Result<(), ProtocolError> {
        match ServerMessage::from_json(text) {
            Ok(msg) => {
                self.apply(msg, world);
                Ok(())
            }
            Err(e) => {
                self.stats.events_dropped += 1;
                warn!("Dropping malformed server message: {} - {}", e, text);
                Err(e)
            }
        }
    }

    /// Apply one decoded inbound event.
    ///
    /// A block event whose point lies outside the tile range is dropped like
    /// a malformed one.
    pub fn apply(&mut self, msg: ServerMessage, world: &mut WorldState) {
        trace!(kind = msg.kind(), "applying server event");

        match msg {
            ServerMessage::RosterSnapshot { players } => {
                world
                    .roster
                    .replace_snapshot(players.into_iter().map(|p| {
                        let pos = p.position();
                        (p.id, pos)
                    }));
                debug!(players = world.roster.len(), "roster replaced");
            }
            ServerMessage::RosterUpdate(entry) => {
                let pos = entry.position();
                if world.roster.upsert(entry.id.clone(), pos) {
                    debug!(id = %entry.id, "remote player joined");
                }
            }
            ServerMessage::PlayerDisconnected { id } => {
                if !world.roster.remove(&id) {
                    debug!(id = %id, "disconnect for unknown player");
                }
            }
            ServerMessage::BlocksSnapshot { blocks } => {
                world.blocks.replace_all(
                    blocks
                        .iter()
                        .filter_map(inbound_tile)
                        .map(TilePos::canonical_point),
                );
                self.pending.clear();
                debug!(blocks = world.blocks.len(), "block store seeded");
            }
            ServerMessage::BlockCreated(point) => {
                let Some(tile) = inbound_tile(&point) else {
                    self.stats.events_dropped += 1;
                    return;
                };
                world.blocks.add_tile(tile);
                self.confirm(tile, IntentKind::Create);
            }
            ServerMessage::BlockDeleted(point) => {
                let Some(tile) = inbound_tile(&point) else {
                    self.stats.events_dropped += 1;
                    return;
                };
                world.blocks.remove_tile(tile);
                self.confirm(tile, IntentKind::Delete);
            }
        }
        self.stats.events_applied += 1;
    }

    /// Clear a pending intent matched by a confirmation.
    fn confirm(&mut self, tile: TilePos, kind: IntentKind) {
        if let Some(pending) = self.pending.get(&tile) {
            if pending.kind == kind {
                self.pending.remove(&tile);
            }
        }
    }
}

/// Tile of an inbound block point. Off-center points land in the tile that
/// contains them; points outside the tile range are rejected.
fn inbound_tile(point: &BlockPoint) -> Option<TilePos> {
    let p = point.point();
    let Some(tile) = TilePos::try_containing(p) else {
        warn!(x = p.x, y = p.y, "Dropping block point outside tile range");
        return None;
    };
    if tile.canonical_point() != p {
        debug!(x = p.x, y = p.y, i = tile.i, j = tile.j, "non-canonical block point snapped to tile center");
    }
    Some(tile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::RosterEntry;
    use crate::network::transport::Loopback;
    use crate::world::roster::PlayerId;
    use proptest::prelude::*;

    fn client() -> SyncClient<Loopback> {
        SyncClient::new(Loopback::new(), SyncConfig::default())
    }

    #[test]
    fn test_first_position_always_reported() {
        let mut sync = client();
        let mut player = PlayerState::new(Vec2::new(0.5, 0.5));
        assert!(sync.report_position(&mut player));
        assert_eq!(player.last_reported, Some(Vec2::new(0.5, 0.5)));
        assert!(!sync.report_position(&mut player));
    }

    #[test]
    fn test_position_threshold_is_cumulative() {
        let mut sync = client();
        let mut player = PlayerState::new(Vec2::ZERO);
        sync.report_position(&mut player);

        player.position = Vec2::new(0.6, 0.0);
        assert!(!sync.report_position(&mut player));
        player.position = Vec2::new(1.0, 0.9);
        assert!(!sync.report_position(&mut player));
        player.position = Vec2::new(1.2, 0.9);
        assert!(sync.report_position(&mut player));

        let sent = sync.outbound_mut().drain();
        assert_eq!(
            sent,
            vec![
                ClientMessage::PositionUpdate { x: 0.0, y: 0.0 },
                ClientMessage::PositionUpdate { x: 1.2, y: 0.9 },
            ]
        );
    }

    #[test]
    fn test_failed_report_retries_next_tick() {
        let mut sync = client();
        let mut player = PlayerState::new(Vec2::new(10.0, 10.0));
        sync.outbound_mut().set_link_up(false);
        assert!(!sync.report_position(&mut player));
        assert_eq!(player.last_reported, None);
        assert_eq!(sync.stats().send_failures, 1);

        sync.outbound_mut().set_link_up(true);
        assert!(sync.report_position(&mut player));
        assert_eq!(player.last_reported, Some(Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn test_toggle_sends_create_or_delete_without_mutating() {
        let mut sync = client();
        let mut world = WorldState::new();
        world.blocks.add(Vec2::new(75.0, 75.0));

        assert_eq!(
            sync.request_toggle(Vec2::new(110.0, 140.0), &world),
            IntentOutcome::Sent(IntentKind::Create)
        );
        assert_eq!(
            sync.request_toggle(Vec2::new(60.0, 99.0), &world),
            IntentOutcome::Sent(IntentKind::Delete)
        );
        assert!(!world.blocks.has(Vec2::new(125.0, 125.0)));
        assert!(world.blocks.has(Vec2::new(75.0, 75.0)));

        let sent = sync.outbound_mut().drain();
        assert_eq!(
            sent,
            vec![
                ClientMessage::CreateBlock { x: 125.0, y: 125.0 },
                ClientMessage::DeleteBlock { x: 75.0, y: 75.0 },
            ]
        );
    }

    #[test]
    fn test_duplicate_intent_suppressed_until_confirmed() {
        let mut sync = client();
        let mut world = WorldState::new();
        let p = Vec2::new(125.0, 125.0);

        assert_eq!(sync.request_toggle(p, &world), IntentOutcome::Sent(IntentKind::Create));
        assert_eq!(sync.request_toggle(p, &world), IntentOutcome::Suppressed(IntentKind::Create));
        assert_eq!(sync.outbound().len(), 1);

        sync.apply(ServerMessage::BlockCreated(p.into()), &mut world);
        assert!(world.blocks.has(p));
        assert_eq!(sync.pending_len(), 0);

        sync.apply(ServerMessage::BlockCreated(p.into()), &mut world);
        assert!(world.blocks.has(p));
        assert_eq!(world.blocks.len(), 1);

        assert_eq!(sync.request_toggle(p, &world), IntentOutcome::Sent(IntentKind::Delete));
    }

    #[test]
    fn test_mismatched_confirmation_keeps_pending() {
        let mut sync = client();
        let mut world = WorldState::new();
        let p = Vec2::new(25.0, 25.0);
        sync.request_toggle(p, &world);
        sync.apply(ServerMessage::BlockDeleted(p.into()), &mut world);
        assert_eq!(
            sync.pending_at(TilePos::new(0, 0)).map(|i| i.kind),
            Some(IntentKind::Create)
        );
    }

    #[test]
    fn test_failed_intent_is_not_pending() {
        let mut sync = client();
        let world = WorldState::new();
        sync.outbound_mut().set_link_up(false);
        assert_eq!(
            sync.request_toggle(Vec2::new(25.0, 25.0), &world),
            IntentOutcome::Failed(IntentKind::Create)
        );
        assert_eq!(sync.pending_len(), 0);
    }

    #[test]
    fn test_pending_intent_expires() {
        let mut sync = SyncClient::new(
            Loopback::new(),
            SyncConfig { intent_timeout_ticks: 3, ..SyncConfig::default() },
        );
        let world = WorldState::new();
        let p = Vec2::new(25.0, 25.0);
        sync.request_toggle(p, &world);
        sync.advance_tick();
        sync.advance_tick();
        assert_eq!(sync.pending_len(), 1);
        sync.advance_tick();
        assert_eq!(sync.pending_len(), 0);
        assert_eq!(sync.stats().intents_expired, 1);
        assert_eq!(sync.request_toggle(p, &world), IntentOutcome::Sent(IntentKind::Create));
    }

    #[test]
    fn test_blocks_snapshot_seeds_store_and_clears_pending() {
        let mut sync = client();
        let mut world = WorldState::new();
        sync.request_toggle(Vec2::new(25.0, 25.0), &world);
        sync.handle_text(
            r#"{"type":"blocks_snapshot","blocks":[{"x":25,"y":25},{"x":75,"y":25}]}"#,
            &mut world,
        )
        .unwrap();
        assert_eq!(world.blocks.len(), 2);
        assert_eq!(sync.pending_len(), 0);
    }

    #[test]
    fn test_roster_event_sequence() {
        let mut sync = client();
        let mut world = WorldState::new();
        for text in [
            r#"{"type":"roster_snapshot","players":[{"id":"a","x":0,"y":0}]}"#,
            r#"{"type":"roster_update","id":"b","x":10,"y":10}"#,
            r#"{"type":"player_disconnected","id":"a"}"#,
            r#"{"type":"player_disconnected","id":"a"}"#,
        ] {
            sync.handle_text(text, &mut world).unwrap();
        }
        let roster: Vec<(PlayerId, Vec2)> = world.roster.iter().map(|(id, p)| (id.clone(), p)).collect();
        assert_eq!(roster, vec![(PlayerId::new("b"), Vec2::new(10.0, 10.0))]);
    }

    #[test]
    fn test_malformed_event_dropped_and_processing_continues() {
        let mut sync = client();
        let mut world = WorldState::new();
        assert!(sync.handle_text(r#"{"type":"block_created","x":1}"#, &mut world).is_err());
        sync.handle_text(r#"{"type":"block_created","x":125,"y":125}"#, &mut world).unwrap();
        assert_eq!(world.blocks.len(), 1);
        assert_eq!(sync.stats().events_dropped, 1);
        assert_eq!(sync.stats().events_applied, 1);
    }

    #[test]
    fn test_far_block_points_dropped_without_aliasing() {
        let mut sync = client();
        let mut world = WorldState::new();
        sync.handle_text(r#"{"type":"block_created","x":2e11,"y":25}"#, &mut world).unwrap();
        sync.handle_text(r#"{"type":"block_created","x":-3e11,"y":25}"#, &mut world).unwrap();
        assert!(world.blocks.is_empty());
        assert!(!world.blocks.has(Vec2::new(5.0e11 + 25.0, 25.0)));
        assert_eq!(sync.stats().events_dropped, 2);
        assert_eq!(sync.stats().events_applied, 0);

        world.blocks.add(Vec2::new(75.0, 75.0));
        sync.handle_text(r#"{"type":"block_deleted","x":2e11,"y":2e11}"#, &mut world).unwrap();
        assert_eq!(world.blocks.len(), 1);

        sync.handle_text(
            r#"{"type":"blocks_snapshot","blocks":[{"x":2e11,"y":0},{"x":25,"y":25}]}"#,
            &mut world,
        )
        .unwrap();
        assert_eq!(world.blocks.points().collect::<Vec<_>>(), vec![Vec2::new(25.0, 25.0)]);
    }

    #[test]
    fn test_off_center_point_lands_in_its_tile() {
        let mut sync = client();
        let mut world = WorldState::new();
        sync.handle_text(r#"{"type":"block_created","x":60,"y":99.5}"#, &mut world).unwrap();
        assert_eq!(world.blocks.points().collect::<Vec<_>>(), vec![Vec2::new(75.0, 75.0)]);
    }

    #[test]
    fn test_toggle_outside_tile_range_sends_nothing() {
        let mut sync = client();
        let world = WorldState::new();
        assert_eq!(
            sync.request_toggle(Vec2::new(-2.0e11, 0.0), &world),
            IntentOutcome::OutOfRange
        );
        assert!(sync.outbound().is_empty());
        assert_eq!(sync.pending_len(), 0);
    }

    #[test]
    fn test_roster_snapshot_applied_from_entries() {
        let mut sync = client();
        let mut world = WorldState::new();
        world.roster.upsert("stale".into(), Vec2::ZERO);
        sync.apply(
            ServerMessage::RosterSnapshot {
                players: vec![RosterEntry { id: "x".into(), x: 5.0, y: 6.0 }],
            },
            &mut world,
        );
        assert_eq!(world.roster.len(), 1);
        assert_eq!(world.roster.get(&"x".into()), Some(Vec2::new(5.0, 6.0)));
    }

    proptest! {
        #[test]
        fn prop_report_iff_threshold_exceeded(
            moves in proptest::collection::vec((-2.0f64..2.0, -2.0f64..2.0), 1..60),
        ) {
            let mut sync = client();
            let mut player = PlayerState::new(Vec2::ZERO);
            sync.report_position(&mut player);

            let mut last = Vec2::ZERO;
            for (dx, dy) in moves {
                player.position = player.position + Vec2::new(dx, dy);
                let expected = player.position.exceeds_on_any_axis(last, 1.0);
                let sent = sync.report_position(&mut player);
                prop_assert_eq!(sent, expected);
                if sent {
                    last = player.position;
                }
                prop_assert_eq!(player.last_reported, Some(last));
            }
        }
    }
}
