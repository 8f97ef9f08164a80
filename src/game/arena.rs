//! Arena state and authoritative tick loop

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::config::GameConfig;
use crate::util::time::unix_millis;
use crate::ws::protocol::{MapSize, ServerMsg};

use super::broadcast::{Broadcaster, ClientSender};
use super::input::{apply_inbound, Applied};
use super::physics::{PhysicsSystem, StepOutcome};
use super::queue::{InboundMsg, InboundQueue};
use super::spawner::CoinSpawner;
use super::world::{CoinId, PlayerId, WorldState};

/// Connection lifecycle requests, handled at the start of a tick
#[derive(Debug)]
pub enum ArenaCommand {
    Join {
        sender: ClientSender,
        reply: oneshot::Sender<JoinAck>,
    },
    Leave {
        player_id: PlayerId,
    },
}

/// Answer to a join: the new player's id and the welcome to send
#[derive(Debug, Clone, PartialEq)]
pub struct JoinAck {
    pub player_id: PlayerId,
    pub welcome: ServerMsg,
}

/// Raw payload together with the instant it came off the socket
#[derive(Debug)]
pub struct Arrival {
    pub msg: InboundMsg,
    pub at: Instant,
}

#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("Arena is no longer running")]
    Closed,
}

/// Counters readable outside the tick loop
#[derive(Debug, Default)]
pub struct ArenaStats {
    players: AtomicUsize,
    coins: AtomicUsize,
    tick: AtomicU64,
}

impl ArenaStats {
    pub fn players(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    pub fn coins(&self) -> usize {
        self.coins.load(Ordering::Relaxed)
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }
}

/// Handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    command_tx: mpsc::Sender<ArenaCommand>,
    inbound_tx: mpsc::Sender<Arrival>,
    pub stats: Arc<ArenaStats>,
}

impl ArenaHandle {
    /// Ask the arena for a new player bound to `sender`
    pub async fn join(&self, sender: ClientSender) -> Result<JoinAck, ArenaError> {
        let (reply, ack) = oneshot::channel();
        self.command_tx
            .send(ArenaCommand::Join { sender, reply })
            .await
            .map_err(|_| ArenaError::Closed)?;
        ack.await.map_err(|_| ArenaError::Closed)
    }

    pub async fn leave(&self, player_id: PlayerId) {
        let _ = self
            .command_tx
            .send(ArenaCommand::Leave { player_id })
            .await;
    }

    /// Hand a raw client payload to the inbound delay queue
    pub async fn submit(&self, player_id: PlayerId, raw: String) -> Result<(), ArenaError> {
        let arrival = Arrival {
            msg: InboundMsg { player_id, raw },
            at: Instant::now(),
        };
        self.inbound_tx
            .send(arrival)
            .await
            .map_err(|_| ArenaError::Closed)
    }
}

/// What a single tick did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub applied_inputs: usize,
    pub physics: StepOutcome,
    pub spawned: Option<CoinId>,
}

/// The authoritative arena. World state is owned here and only mutated
/// from `run_tick`.
pub struct GameArena {
    config: GameConfig,
    world: WorldState,
    inbound: InboundQueue,
    spawner: CoinSpawner,
    broadcaster: Broadcaster,
    rng: ChaCha8Rng,
    tick: u64,
    command_rx: mpsc::Receiver<ArenaCommand>,
    inbound_rx: mpsc::Receiver<Arrival>,
    stats: Arc<ArenaStats>,
}

impl GameArena {
    pub fn new(config: GameConfig) -> (Self, ArenaHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (inbound_tx, inbound_rx) = mpsc::channel(1024);
        let stats = Arc::new(ArenaStats::default());

        let handle = ArenaHandle {
            command_tx,
            inbound_tx,
            stats: stats.clone(),
        };

        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
        let arena = Self {
            world: WorldState::new(),
            inbound: InboundQueue::new(config.inbound_delay),
            spawner: CoinSpawner::new(&config, Instant::now()),
            broadcaster: Broadcaster::new(config.outbound_delay),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            command_rx,
            inbound_rx,
            stats,
            config,
        };

        (arena, handle)
    }

    /// Run the fixed-rate tick loop
    pub async fn run(mut self) {
        info!(
            tick_ms = self.config.tick.as_millis() as u64,
            inbound_delay_ms = self.config.inbound_delay.as_millis() as u64,
            outbound_delay_ms = self.config.outbound_delay.as_millis() as u64,
            "Arena started"
        );

        let mut tick_interval = interval(self.config.tick);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            let report = self.run_tick(Instant::now(), unix_millis());
            trace!(
                tick = report.tick,
                applied_inputs = report.applied_inputs,
                collisions = report.physics.collisions,
                spawned = report.spawned,
                pending_inbound = self.inbound.len(),
                "Tick complete"
            );
        }
    }

    /// One tick: lifecycle commands, inbound drain, inputs, physics,
    /// spawning, then the outbound snapshot
    pub fn run_tick(&mut self, now: Instant, now_ms: u64) -> TickReport {
        self.tick += 1;
        self.process_commands();

        while let Ok(arrival) = self.inbound_rx.try_recv() {
            self.inbound.enqueue(arrival.msg, arrival.at);
        }

        let mut applied_inputs = 0;
        for msg in self.inbound.drain_ready(now) {
            match apply_inbound(&mut self.world, msg, now_ms) {
                Applied::Intent(player_id) => {
                    trace!(player_id, "Input applied");
                    applied_inputs += 1;
                }
                Applied::Reply(player_id, reply) => {
                    self.broadcaster.send_to(player_id, &reply, now)
                }
                Applied::Dropped => {}
            }
        }

        let physics = PhysicsSystem::step(&mut self.world, &self.config);
        for (player_id, coin_id) in &physics.pickups {
            debug!(player_id, coin_id, "Coin collected");
        }

        let spawned = self
            .spawner
            .tick(&mut self.world, &self.config, &mut self.rng, now);

        self.broadcaster.broadcast(&self.world, now_ms, now);
        self.publish_stats();

        TickReport {
            tick: self.tick,
            applied_inputs,
            physics,
            spawned,
        }
    }

    /// Register a connection and create its player
    pub fn connect(&mut self, sender: ClientSender) -> JoinAck {
        let player_id = self.world.spawn_player(&self.config, &mut self.rng);
        self.broadcaster.add_client(player_id, sender);

        info!(
            player_id,
            player_count = self.world.players.len(),
            clients = self.broadcaster.client_count(),
            "Player joined arena"
        );

        JoinAck {
            player_id,
            welcome: ServerMsg::Welcome {
                id: player_id,
                map: MapSize {
                    w: self.config.map_width as u32,
                    h: self.config.map_height as u32,
                },
                t: unix_millis(),
            },
        }
    }

    /// Drop a connection and its player
    pub fn disconnect(&mut self, player_id: PlayerId) {
        self.broadcaster.remove_client(player_id);
        if self.world.remove_player(player_id).is_some() {
            info!(
                player_id,
                player_count = self.world.players.len(),
                "Player left arena"
            );
        }
    }

    /// Queue a raw payload as if it had arrived at `arrived_at`
    #[cfg(test)]
    pub fn enqueue_inbound(&mut self, msg: InboundMsg, arrived_at: Instant) {
        self.inbound.enqueue(msg, arrived_at);
    }

    #[cfg(test)]
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    #[cfg(test)]
    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    fn process_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                ArenaCommand::Join { sender, reply } => {
                    let ack = self.connect(sender);
                    let player_id = ack.player_id;
                    if reply.send(ack).is_err() {
                        // Connection went away before it was welcomed
                        self.disconnect(player_id);
                    }
                }
                ArenaCommand::Leave { player_id } => self.disconnect(player_id),
            }
        }
    }

    fn publish_stats(&self) {
        self.stats
            .players
            .store(self.world.players.len(), Ordering::Relaxed);
        self.stats
            .coins
            .store(self.world.coins.len(), Ordering::Relaxed);
        self.stats.tick.store(self.tick, Ordering::Relaxed);
    }
}
