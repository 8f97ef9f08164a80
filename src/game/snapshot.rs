//! Snapshot building and size statistics

use crate::ws::protocol::{CoinSnapshot, PlayerSnapshot, ServerMsg};

use super::world::WorldState;

/// Build a snapshot message of every live player and coin
pub fn build_snapshot(world: &WorldState, server_time: u64) -> ServerMsg {
    let players = world
        .players
        .values()
        .map(|p| PlayerSnapshot {
            id: p.id,
            x: p.x,
            y: p.y,
            score: p.score,
        })
        .collect();

    let coins = world
        .coins
        .values()
        .map(|c| CoinSnapshot {
            id: c.id,
            x: c.x,
            y: c.y,
        })
        .collect();

    ServerMsg::Snapshot {
        t: server_time,
        players,
        coins,
    }
}

/// Snapshot size stats for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_players_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, player_count: usize, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_players_per_snapshot =
            self.avg_players_per_snapshot * ((n - 1.0) / n) + (player_count as f32 / n);
    }

    pub fn avg_bytes(&self) -> u64 {
        self.total_bytes.checked_div(self.total_snapshots).unwrap_or(0)
    }
}
