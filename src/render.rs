//! Rendering Adapter Seam
//!
//! The core never draws. Once per frame it hands the host adapter the
//! player's screen position, a screen position for every live block and
//! remote player, and spawn/despawn calls when those appear or disappear.
//!
//! The camera is centered on the local player:
//!
//! ```text
//!   screen = viewport_center + (world - player)
//! ```

use std::collections::HashSet;
use tracing::debug;

use crate::core::geometry::TilePos;
use crate::core::vec2::Vec2;
use crate::world::roster::PlayerId;
use crate::world::WorldState;

/// Screen size in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

impl Viewport {
    /// Create a viewport.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Screen center, where the player is drawn.
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Project a world point with the camera on `camera`.
    #[inline]
    pub fn to_screen(&self, world: Vec2, camera: Vec2) -> Vec2 {
        self.center() + (world - camera)
    }

    /// Inverse of [`to_screen`](Self::to_screen), for pointer input.
    #[inline]
    pub fn to_world(&self, screen: Vec2, camera: Vec2) -> Vec2 {
        camera + (screen - self.center())
    }

    /// Number of whole tiles needed to cover the viewport, `(cols, rows)`.
    pub fn tile_cover(&self) -> (i32, i32) {
        let cols = (self.width / crate::TILE_SIZE).ceil() as i32;
        let rows = (self.height / crate::TILE_SIZE).ceil() as i32;
        (cols, rows)
    }
}

/// Identity of a rendered entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// A placed block.
    Block(TilePos),
    /// A remote player.
    Remote(PlayerId),
}

/// Host-side renderer.
pub trait RenderAdapter {
    /// Create the visual for a new entity.
    fn spawn(&mut self, key: &EntityKey);
    /// Move an entity to a screen position.
    fn place(&mut self, key: &EntityKey, screen: Vec2);
    /// Release the visual for an entity that is gone.
    fn despawn(&mut self, key: &EntityKey);
    /// Move the local player's visual.
    fn place_player(&mut self, screen: Vec2);
}

/// Lifecycle changes emitted by one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Entities spawned.
    pub spawned: usize,
    /// Entities despawned.
    pub despawned: usize,
    /// Entities placed (excluding the player).
    pub placed: usize,
}

/// Keeps the adapter's entity set in step with the world mirror.
#[derive(Debug, Default)]
pub struct RenderSync {
    rendered: HashSet<EntityKey>,
}

impl RenderSync {
    /// Nothing rendered yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities the adapter currently holds.
    pub fn rendered_len(&self) -> usize {
        self.rendered.len()
    }

    /// Check if an entity is currently rendered.
    pub fn is_rendered(&self, key: &EntityKey) -> bool {
        self.rendered.contains(key)
    }

    /// Diff the world against the previous frame and drive the adapter.
    ///
    /// Despawns run first, then spawns, then every live entity is placed.
    /// Screen positions are snapped to whole pixels.
    pub fn sync<R: RenderAdapter>(
        &mut self,
        camera: Vec2,
        world: &WorldState,
        viewport: &Viewport,
        adapter: &mut R,
    ) -> FrameStats {
        let mut stats = FrameStats::default();

        let live: Vec<(EntityKey, Vec2)> = world
            .blocks
            .tiles()
            .map(|t| (EntityKey::Block(t), t.canonical_point()))
            .chain(
                world
                    .roster
                    .iter()
                    .map(|(id, pos)| (EntityKey::Remote(id.clone()), pos)),
            )
            .collect();
        let live_keys: HashSet<&EntityKey> = live.iter().map(|(k, _)| k).collect();

        self.rendered.retain(|key| {
            if live_keys.contains(key) {
                true
            } else {
                adapter.despawn(key);
                stats.despawned += 1;
                false
            }
        });

        for (key, world_pos) in &live {
            if !self.rendered.contains(key) {
                adapter.spawn(key);
                self.rendered.insert(key.clone());
                stats.spawned += 1;
            }
            adapter.place(key, viewport.to_screen(*world_pos, camera).round());
            stats.placed += 1;
        }

        adapter.place_player(viewport.center().round());

        if stats.spawned > 0 || stats.despawned > 0 {
            debug!(spawned = stats.spawned, despawned = stats.despawned, "render set changed");
        }
        stats
    }
}

/// Adapter that reports lifecycle facts to the log instead of drawing.
#[derive(Debug, Default)]
pub struct TracingRenderer {
    /// Last player screen position.
    pub player: Vec2,
}

impl RenderAdapter for TracingRenderer {
    fn spawn(&mut self, key: &EntityKey) {
        debug!(?key, "spawn");
    }

    fn place(&mut self, _key: &EntityKey, _screen: Vec2) {}

    fn despawn(&mut self, key: &EntityKey) {
        debug!(?key, "despawn");
    }

    fn place_player(&mut self, screen: Vec2) {
        self.player = screen;
    }
}
