//! Authoritative world state: players, coins and their id counters

use rand::Rng;
use std::collections::BTreeMap;

use crate::config::GameConfig;

pub type PlayerId = u64;
pub type CoinId = u64;

/// Latest movement intent received from a client
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputIntent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Client-supplied timestamp, or server time when the client sent none
    pub stamp: f64,
}

impl InputIntent {
    /// Unnormalized direction: x grows to the right, y grows downwards
    pub fn direction(&self) -> (f32, f32) {
        let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
        (axis(self.left, self.right), axis(self.up, self.down))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub score: u32,
    pub input: InputIntent,
    /// Movement penalty for the next tick, reset to 1.0 once used
    pub speed_multiplier: f32,
}

impl Player {
    pub fn new(id: PlayerId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            score: 0,
            input: InputIntent::default(),
            speed_multiplier: 1.0,
        }
    }
}

/// Coins never move once spawned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coin {
    pub id: CoinId,
    pub x: f32,
    pub y: f32,
}

/// All live players and coins. Ordered maps give every system the same
/// stable enumeration order (ascending id).
#[derive(Debug)]
pub struct WorldState {
    pub players: BTreeMap<PlayerId, Player>,
    pub coins: BTreeMap<CoinId, Coin>,
    next_player_id: PlayerId,
    next_coin_id: CoinId,
}

impl WorldState {
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            coins: BTreeMap::new(),
            next_player_id: 1,
            next_coin_id: 1,
        }
    }

    /// Create a player at a random position inside the playable area
    pub fn spawn_player(&mut self, config: &GameConfig, rng: &mut impl Rng) -> PlayerId {
        let r = config.player_radius;
        let x = rng.gen_range(r..=config.map_width - r);
        let y = rng.gen_range(r..=config.map_height - r);
        self.insert_player(x, y)
    }

    /// Create a player at an exact position
    pub fn insert_player(&mut self, x: f32, y: f32) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        self.players.insert(id, Player::new(id, x, y));
        id
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn insert_coin(&mut self, x: f32, y: f32) -> CoinId {
        let id = self.next_coin_id;
        self.next_coin_id += 1;
        self.coins.insert(id, Coin { id, x, y });
        id
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}
