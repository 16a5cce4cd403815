//! Movement Integrator
//!
//! Turns directional input into velocity and resolves the player's position
//! against the block store, one tick at a time.
//!
//! ## Tick phases
//!
//! 1. Input: each held direction adds a fixed impulse to its velocity axis.
//! 2. Friction: velocity decays by a damping factor and snaps to zero below
//!    a small epsilon.
//! 3. Collision: X is resolved fully before Y. A rejected axis keeps its old
//!    coordinate and loses its velocity; the other axis is unaffected, so a
//!    player pushing diagonally into a wall slides along it.
//!
//! Nothing here can fail: empty and huge block stores take the same path.

use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::core::geometry::{make_aabb, Aabb};
use crate::core::vec2::Vec2;
use crate::sim::input::DirectionalInput;
use crate::world::blocks::WorldBlockStore;
use crate::TILE_SIZE;

/// Tuning for the integrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Velocity added per held direction per tick (world units/tick).
    pub impulse: f64,
    /// Per-tick velocity multiplier.
    pub damping: f64,
    /// Speeds below this snap to exactly zero.
    pub rest_epsilon: f64,
    /// Half the player's edge length.
    pub half_extent: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            impulse: 3.0,
            damping: 0.92,
            rest_epsilon: 0.01,
            half_extent: TILE_SIZE / 2.0,
        }
    }
}

/// The local player's kinematic state.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerState {
    /// World-space center.
    pub position: Vec2,
    /// World units per tick.
    pub velocity: Vec2,
    /// Last position sent upstream (`None` until the first report).
    pub last_reported: Option<Vec2>,
}

impl PlayerState {
    /// Player at rest at `position`.
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            last_reported: None,
        }
    }

    /// Collision box at the current position.
    #[inline]
    pub fn aabb(&self, config: &MovementConfig) -> Aabb {
        player_aabb(self.position, config)
    }
}

/// What happened during one tick.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct TickOutcome {
    /// The X move was rejected.
    pub collided_x: bool,
    /// The Y move was rejected.
    pub collided_y: bool,
    /// Committed position.
    pub position: Vec2,
    /// Velocity after resolution.
    pub velocity: Vec2,
}

/// Player box centered at `center`.
#[inline]
pub fn player_aabb(center: Vec2, config: &MovementConfig) -> Aabb {
    make_aabb(center.x, center.y, config.half_extent, config.half_extent)
}

/// Input phase.
#[inline]
pub fn apply_input(player: &mut PlayerState, input: &DirectionalInput, config: &MovementConfig) {
    player.velocity += input.impulse(config.impulse);
}

/// Friction phase for a single axis.
#[inline]
pub fn damp_axis(v: f64, config: &MovementConfig) -> f64 {
    let damped = v * config.damping;
    if damped.abs() < config.rest_epsilon {
        0.0
    } else {
        damped
    }
}

/// Friction phase.
#[inline]
pub fn apply_friction(player: &mut PlayerState, config: &MovementConfig) {
    player.velocity.x = damp_axis(player.velocity.x, config);
    player.velocity.y = damp_axis(player.velocity.y, config);
}

/// Collision phase. Returns `(collided_x, collided_y)`.
pub fn resolve_collisions(
    player: &mut PlayerState,
    blocks: &WorldBlockStore,
    config: &MovementConfig,
) -> (bool, bool) {
    let old = player.position;

    // X first, at the old Y.
    let try_x = Vec2::new(old.x + player.velocity.x, old.y);
    let collided_x = blocks.overlaps_any(&player_aabb(try_x, config));
    if collided_x {
        player.velocity.x = 0.0;
    } else {
        player.position.x = try_x.x;
    }

    // Then Y, at the possibly updated X.
    let try_y = Vec2::new(player.position.x, old.y + player.velocity.y);
    let collided_y = blocks.overlaps_any(&player_aabb(try_y, config));
    if collided_y {
        player.velocity.y = 0.0;
    } else {
        player.position.y = try_y.y;
    }

    (collided_x, collided_y)
}

/// Run one full tick: input, friction, collision.
pub fn integrate(
    player: &mut PlayerState,
    input: &DirectionalInput,
    blocks: &WorldBlockStore,
    config: &MovementConfig,
) -> TickOutcome {
    apply_input(player, input, config);
    apply_friction(player, config);
    let (collided_x, collided_y) = resolve_collisions(player, blocks, config);

    trace!(
        collided_x,
        collided_y,
        x = player.position.x,
        y = player.position.y,
        vx = player.velocity.x,
        vy = player.velocity.y,
        "tick integrated"
    );

    TickOutcome {
        collided_x,
        collided_y,
        position: player.position,
        velocity: player.velocity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{overlaps, TilePos};
    use crate::sim::input::Direction;
    use proptest::prelude::*;

    fn wall(tiles: &[(i32, i32)]) -> WorldBlockStore {
        WorldBlockStore::from_points(tiles.iter().map(|&(i, j)| TilePos::new(i, j).canonical_point()))
    }

    #[test]
    fn test_input_then_friction() {
        let config = MovementConfig::default();
        let mut player = PlayerState::new(Vec2::ZERO);
        let out = integrate(&mut player, &DirectionalInput::held(Direction::Right), &WorldBlockStore::new(), &config);
        assert!((out.velocity.x - 3.0 * 0.92).abs() < 1e-12);
        assert!((out.position.x - 3.0 * 0.92).abs() < 1e-12);
        assert_eq!(out.position.y, 0.0);
    }

    #[test]
    fn test_stops_flush_against_block() {
        // Block at tile (1, 1) spans [50, 100]; player half-extent 25.
        let config = MovementConfig::default();
        let blocks = wall(&[(1, 1)]);
        let mut player = PlayerState::new(Vec2::new(10.0, 75.0));

        for _ in 0..5 {
            player.velocity = Vec2::new(3.0, 0.0);
            let (cx, _) = resolve_collisions(&mut player, &blocks, &config);
            assert!(!cx);
        }
        assert_eq!(player.position.x, 25.0);

        player.velocity = Vec2::new(3.0, 0.0);
        let (cx, cy) = resolve_collisions(&mut player, &blocks, &config);
        assert!(cx);
        assert!(!cy);
        assert_eq!(player.position.x, 25.0);
        assert_eq!(player.velocity.x, 0.0);
        assert_eq!(player.aabb(&config).right, 50.0);
    }

    #[test]
    fn test_wall_slide_keeps_parallel_motion() {
        // Vertical wall at column 1; player left of it moving down-right.
        let config = MovementConfig::default();
        let blocks = wall(&[(1, 0), (1, 1), (1, 2), (1, 3)]);
        let mut player = PlayerState::new(Vec2::new(25.0, 75.0));
        player.velocity = Vec2::new(4.0, 4.0);

        let (cx, cy) = resolve_collisions(&mut player, &blocks, &config);
        assert!(cx);
        assert!(!cy);
        assert_eq!(player.position, Vec2::new(25.0, 79.0));
        assert_eq!(player.velocity, Vec2::new(0.0, 4.0));
    }

    #[test]
    fn test_concave_corner_resolves_axes_independently() {
        // Floor at row 2 and wall at column 2 around tile (1, 1).
        let config = MovementConfig::default();
        let blocks = wall(&[(2, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
        let mut player = PlayerState::new(Vec2::new(75.0, 75.0));
        player.velocity = Vec2::new(5.0, 5.0);

        let (cx, cy) = resolve_collisions(&mut player, &blocks, &config);
        assert!(cx && cy);
        assert_eq!(player.position, Vec2::new(75.0, 75.0));
        assert_eq!(player.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_x_resolved_before_y() {
        // Only the diagonal target tile is blocked. Testing the combined
        // diagonal box would reject both axes; axis separation lets X through
        // and then blocks Y from the new X.
        let config = MovementConfig::default();
        let blocks = wall(&[(1, 1)]);
        let mut player = PlayerState::new(Vec2::new(25.0, 25.0));
        player.velocity = Vec2::new(10.0, 10.0);

        let (cx, cy) = resolve_collisions(&mut player, &blocks, &config);
        assert!(!cx);
        assert!(cy);
        assert_eq!(player.position, Vec2::new(35.0, 25.0));
        assert_eq!(player.velocity, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_friction_reaches_exact_zero() {
        let config = MovementConfig::default();
        let mut player = PlayerState::new(Vec2::ZERO);
        player.velocity = Vec2::new(30.0, -7.5);
        let mut ticks = 0;
        while player.velocity != Vec2::ZERO {
            apply_friction(&mut player, &config);
            ticks += 1;
            assert!(ticks < 1000, "friction never converged");
        }
        assert_eq!(player.velocity.x, 0.0);
        assert_eq!(player.velocity.y, 0.0);
    }

    proptest! {
        #[test]
        fn prop_committed_box_never_overlaps(
            tiles in proptest::collection::vec((-4i32..4, -4i32..4), 0..24),
            start_i in -6i32..6,
            start_j in -6i32..6,
            steps in proptest::collection::vec((-60.0f64..60.0, -60.0f64..60.0), 1..30),
        ) {
            let config = MovementConfig::default();
            let blocks = wall(&tiles);
            let start = TilePos::new(start_i, start_j);
            prop_assume!(!blocks.has_tile(start));

            let mut player = PlayerState::new(start.canonical_point());
            for (vx, vy) in steps {
                player.velocity = Vec2::new(vx, vy);
                resolve_collisions(&mut player, &blocks, &config);
                let body = player.aabb(&config);
                for t in blocks.tiles() {
                    prop_assert!(!overlaps(&body, &t.aabb()));
                }
            }
        }

        #[test]
        fn prop_friction_converges(vx in -1.0e6f64..1.0e6, vy in -1.0e6f64..1.0e6) {
            let config = MovementConfig::default();
            let mut player = PlayerState::new(Vec2::ZERO);
            player.velocity = Vec2::new(vx, vy);
            let mut ticks = 0u32;
            while player.velocity != Vec2::ZERO {
                apply_friction(&mut player, &config);
                ticks += 1;
                prop_assert!(ticks < 1000);
            }
        }
    }
}
