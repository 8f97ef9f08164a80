//! Coin spawning on a fixed interval, up to a population cap

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{GameConfig, COIN_SPAWN_MARGIN};

use super::world::{CoinId, WorldState};

pub struct CoinSpawner {
    interval: Duration,
    max_coins: usize,
    last_spawn: Instant,
}

impl CoinSpawner {
    pub fn new(config: &GameConfig, now: Instant) -> Self {
        Self {
            interval: config.coin_spawn_interval,
            max_coins: config.max_coins,
            last_spawn: now,
        }
    }

    /// Spawn at most one coin once the interval has elapsed. The timer
    /// restarts even when the cap blocks the spawn, so a full arena skips
    /// intervals instead of banking them.
    pub fn tick(
        &mut self,
        world: &mut WorldState,
        config: &GameConfig,
        rng: &mut impl Rng,
        now: Instant,
    ) -> Option<CoinId> {
        if now.saturating_duration_since(self.last_spawn) <= self.interval {
            return None;
        }
        self.last_spawn = now;

        if world.coins.len() >= self.max_coins {
            return None;
        }

        let x = rng.gen_range(COIN_SPAWN_MARGIN..=config.map_width - COIN_SPAWN_MARGIN);
        let y = rng.gen_range(COIN_SPAWN_MARGIN..=config.map_height - COIN_SPAWN_MARGIN);
        Some(world.insert_coin(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup(max_coins: usize) -> (GameConfig, CoinSpawner, ChaCha8Rng, Instant) {
        let config = GameConfig {
            max_coins,
            coin_spawn_interval: ms(1000),
            ..GameConfig::default()
        };
        let t0 = Instant::now();
        let spawner = CoinSpawner::new(&config, t0);
        (config, spawner, ChaCha8Rng::seed_from_u64(1), t0)
    }

    #[test]
    fn waits_for_the_interval_to_pass() {
        let (config, mut spawner, mut rng, t0) = setup(5);
        let mut world = WorldState::new();

        assert_eq!(spawner.tick(&mut world, &config, &mut rng, t0 + ms(500)), None);
        assert_eq!(spawner.tick(&mut world, &config, &mut rng, t0 + ms(1000)), None);
        assert!(spawner.tick(&mut world, &config, &mut rng, t0 + ms(1001)).is_some());
        assert_eq!(spawner.tick(&mut world, &config, &mut rng, t0 + ms(1500)), None);
        assert_eq!(world.coins.len(), 1);
    }

    #[test]
    fn never_exceeds_cap() {
        let (config, mut spawner, mut rng, t0) = setup(3);
        let mut world = WorldState::new();

        for i in 1..=20 {
            spawner.tick(&mut world, &config, &mut rng, t0 + ms(1001 * i));
            assert!(world.coins.len() <= 3);
        }
        assert_eq!(world.coins.len(), 3);
    }

    #[test]
    fn full_arena_still_restarts_the_timer() {
        let (config, mut spawner, mut rng, t0) = setup(1);
        let mut world = WorldState::new();
        let first = spawner
            .tick(&mut world, &config, &mut rng, t0 + ms(1001))
            .unwrap();

        // Interval passes while full: no spawn, timer restarts anyway
        assert_eq!(spawner.tick(&mut world, &config, &mut rng, t0 + ms(2002)), None);
        world.coins.remove(&first);

        // Space freed, but the restarted interval has not elapsed yet
        assert_eq!(spawner.tick(&mut world, &config, &mut rng, t0 + ms(2500)), None);
        let second = spawner.tick(&mut world, &config, &mut rng, t0 + ms(3003));
        assert_eq!(second, Some(first + 1));
    }

    #[test]
    fn coins_respect_edge_margin() {
        let (config, mut spawner, mut rng, t0) = setup(usize::MAX);
        let mut world = WorldState::new();
        for i in 1..=100 {
            spawner.tick(&mut world, &config, &mut rng, t0 + ms(1001 * i));
        }
        assert_eq!(world.coins.len(), 100);
        for coin in world.coins.values() {
            assert!(coin.x >= COIN_SPAWN_MARGIN && coin.x <= config.map_width - COIN_SPAWN_MARGIN);
            assert!(coin.y >= COIN_SPAWN_MARGIN && coin.y <= config.map_height - COIN_SPAWN_MARGIN);
        }
    }
}
