//! Movement integration, player separation and coin pickup

use crate::config::GameConfig;

use super::world::{CoinId, PlayerId, WorldState};

/// Speed multiplier both players get for the tick after they collide
pub const COLLISION_SPEED_LOSS: f32 = 0.8;

/// What one physics step changed
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepOutcome {
    /// Player pairs pushed apart this step
    pub collisions: usize,
    /// Coins consumed this step, in scan order
    pub pickups: Vec<(PlayerId, CoinId)>,
}

/// Physics system for the arena. Every step integrates with the fixed
/// configured `dt`, never with measured wall-clock time.
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance the world by one tick
    pub fn step(world: &mut WorldState, config: &GameConfig) -> StepOutcome {
        Self::integrate_movement(world, config);
        let collisions = Self::resolve_player_collisions(world, config);
        let pickups = Self::collect_coins(world, config);
        StepOutcome {
            collisions,
            pickups,
        }
    }

    /// Move every player along its input direction, consuming any
    /// speed penalty from the previous tick
    pub fn integrate_movement(world: &mut WorldState, config: &GameConfig) {
        let dt = config.dt();

        for player in world.players.values_mut() {
            let (dx, dy) = player.input.direction();
            let len = (dx * dx + dy * dy).sqrt();
            if len > 0.0 {
                let step = config.player_speed * dt * player.speed_multiplier / len;
                player.x += dx * step;
                player.y += dy * step;
            }
            player.speed_multiplier = 1.0;

            (player.x, player.y) = Self::clamp_to_map(player.x, player.y, config);
        }
    }

    /// Push overlapping players apart, pair by pair in ascending id order.
    /// Each pair sees the positions left by the pairs before it.
    pub fn resolve_player_collisions(world: &mut WorldState, config: &GameConfig) -> usize {
        let radius = config.player_radius;
        let ids: Vec<PlayerId> = world.players.keys().copied().collect();
        let mut collisions = 0;

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (Some(a), Some(b)) = (world.players.get(&ids[i]), world.players.get(&ids[j]))
                else {
                    continue;
                };

                let Some(((ax, ay), (bx, by))) =
                    Self::separate((a.x, a.y, a.score), (b.x, b.y, b.score), radius)
                else {
                    continue;
                };
                collisions += 1;

                for (id, x, y) in [(ids[i], ax, ay), (ids[j], bx, by)] {
                    if let Some(player) = world.players.get_mut(&id) {
                        (player.x, player.y) = Self::clamp_to_map(x, y, config);
                        player.speed_multiplier = COLLISION_SPEED_LOSS;
                    }
                }
            }
        }

        collisions
    }

    /// Separate two circles of equal `radius` given as (x, y, score).
    /// Returns the new centers, or None when they do not overlap or sit
    /// exactly on top of each other.
    pub fn separate(
        a: (f32, f32, u32),
        b: (f32, f32, u32),
        radius: f32,
    ) -> Option<((f32, f32), (f32, f32))> {
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        let dist = (dx * dx + dy * dy).sqrt();

        // Coincident centers have no separation axis
        if dist <= 0.0 || dist >= 2.0 * radius {
            return None;
        }

        let overlap = 2.0 * radius - dist;
        let nx = dx / dist;
        let ny = dy / dist;

        let push_a = overlap * Self::dominance_share(a.2, b.2);
        let push_b = overlap * Self::dominance_share(b.2, a.2);

        Some((
            (a.0 - nx * push_a, a.1 - ny * push_a),
            (b.0 + nx * push_b, b.1 + ny * push_b),
        ))
    }

    /// Fraction of the overlap a player absorbs: the smoothed dominance
    /// ratio `(other + 1) / (own + other + 2)`. The plain ratio
    /// `other / (own + other + 1)` leaves two scoreless players stuck
    /// together; the smoothed one gives them half each. Shares of the
    /// two players sum to 1 and the higher score always moves less.
    pub fn dominance_share(own_score: u32, other_score: u32) -> f32 {
        let own = own_score as f32;
        let other = other_score as f32;
        (other + 1.0) / (own + other + 2.0)
    }

    /// Award coins to the first player found overlapping them. A coin is
    /// removed the moment it is claimed, so it is never scored twice.
    pub fn collect_coins(world: &mut WorldState, config: &GameConfig) -> Vec<(PlayerId, CoinId)> {
        let reach = config.player_radius + config.coin_radius;
        let reach_sq = reach * reach;
        let coins = &mut world.coins;
        let mut pickups = Vec::new();

        for player in world.players.values_mut() {
            coins.retain(|&coin_id, coin| {
                let dx = coin.x - player.x;
                let dy = coin.y - player.y;
                if dx * dx + dy * dy <= reach_sq {
                    player.score += 1;
                    pickups.push((player.id, coin_id));
                    false
                } else {
                    true
                }
            });
        }

        pickups
    }

    /// Keep a player center inside the map, inset by the player radius
    pub fn clamp_to_map(x: f32, y: f32, config: &GameConfig) -> (f32, f32) {
        let r = config.player_radius;
        (
            x.clamp(r, config.map_width - r),
            y.clamp(r, config.map_height - r),
        )
    }
}
