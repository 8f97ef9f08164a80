//! Outbound delay broadcaster

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, trace};

use crate::ws::protocol::ServerMsg;

use super::snapshot::{build_snapshot, SnapshotStats};
use super::world::{PlayerId, WorldState};

/// Serialized frame ready for a connection's writer task
pub type Frame = Arc<str>;

/// Send side of one client connection
pub type ClientSender = mpsc::Sender<Frame>;

/// How often snapshot statistics are logged
const STATS_LOG_EVERY: u64 = 600;

/// Delivers serialized messages to clients after a fixed delay. Every
/// delivery has its own timer; nothing is retried or coalesced.
pub struct Broadcaster {
    delay: Duration,
    clients: BTreeMap<PlayerId, ClientSender>,
    stats: SnapshotStats,
}

impl Broadcaster {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            clients: BTreeMap::new(),
            stats: SnapshotStats::default(),
        }
    }

    pub fn add_client(&mut self, player_id: PlayerId, sender: ClientSender) {
        self.clients.insert(player_id, sender);
    }

    /// Stop targeting a client. Deliveries already scheduled for it no-op
    /// once its connection has closed.
    pub fn remove_client(&mut self, player_id: PlayerId) {
        self.clients.remove(&player_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Serialize one snapshot and schedule it for every connected client
    pub fn broadcast(&mut self, world: &WorldState, server_time: u64, now: Instant) {
        let Some(frame) = encode(&build_snapshot(world, server_time)) else {
            return;
        };

        self.stats.record(world.players.len(), frame.len());
        if self.stats.total_snapshots % STATS_LOG_EVERY == 0 {
            debug!(
                snapshots = self.stats.total_snapshots,
                avg_bytes = self.stats.avg_bytes(),
                avg_players = self.stats.avg_players_per_snapshot,
                "Snapshot stats"
            );
        }

        let deliver_at = now + self.delay;
        for (&player_id, sender) in &self.clients {
            schedule(player_id, sender.clone(), frame.clone(), deliver_at);
        }
    }

    /// Schedule a message for a single client
    pub fn send_to(&self, player_id: PlayerId, msg: &ServerMsg, now: Instant) {
        let Some(sender) = self.clients.get(&player_id) else {
            return;
        };
        if let Some(frame) = encode(msg) {
            schedule(player_id, sender.clone(), frame, now + self.delay);
        }
    }
}

fn encode(msg: &ServerMsg) -> Option<Frame> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(json.into()),
        Err(e) => {
            error!(error = %e, "Failed to serialize outbound message");
            None
        }
    }
}

fn schedule(player_id: PlayerId, sender: ClientSender, frame: Frame, deliver_at: Instant) {
    tokio::spawn(async move {
        sleep_until(deliver_at).await;
        if let Err(e) = sender.try_send(frame) {
            trace!(player_id, error = %e, "Dropped outbound frame");
        }
    });
}
