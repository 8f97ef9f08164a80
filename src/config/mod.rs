//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Distance kept between freshly spawned coins and the map edges
pub const COIN_SPAWN_MARGIN: f32 = 20.0;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated), any origin when unset
    pub client_origin: Option<String>,
    /// Simulation constants, fixed for the lifetime of the process
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").ok(),
            game: GameConfig::from_env()?,
        })
    }
}

/// Arena simulation constants
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub map_width: f32,
    pub map_height: f32,
    pub player_radius: f32,
    pub coin_radius: f32,
    /// Player speed in map units per second
    pub player_speed: f32,
    /// Fixed simulation step
    pub tick: Duration,
    pub coin_spawn_interval: Duration,
    pub max_coins: usize,
    /// Time between a client message arriving and the simulation seeing it
    pub inbound_delay: Duration,
    /// Time between a snapshot being built and it reaching a client
    pub outbound_delay: Duration,
    /// Seed for spawn positions; random when not configured
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_width: 800.0,
            map_height: 600.0,
            player_radius: 16.0,
            coin_radius: 8.0,
            player_speed: 200.0,
            tick: Duration::from_millis(50),
            coin_spawn_interval: Duration::from_millis(1000),
            max_coins: 10,
            inbound_delay: Duration::from_millis(100),
            outbound_delay: Duration::from_millis(100),
            seed: None,
        }
    }
}

impl GameConfig {
    /// Load game constants, falling back to defaults for unset variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let millis = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse_var(&lookup, key)?
                .map(Duration::from_millis)
                .unwrap_or(default))
        };

        let config = Self {
            map_width: parse_var::<u32>(&lookup, "MAP_WIDTH")?
                .map_or(defaults.map_width, |w| w as f32),
            map_height: parse_var::<u32>(&lookup, "MAP_HEIGHT")?
                .map_or(defaults.map_height, |h| h as f32),
            player_radius: parse_var(&lookup, "PLAYER_RADIUS")?.unwrap_or(defaults.player_radius),
            coin_radius: parse_var(&lookup, "COIN_RADIUS")?.unwrap_or(defaults.coin_radius),
            player_speed: parse_var(&lookup, "PLAYER_SPEED")?.unwrap_or(defaults.player_speed),
            tick: millis("TICK_MS", defaults.tick)?,
            coin_spawn_interval: millis("COIN_SPAWN_INTERVAL_MS", defaults.coin_spawn_interval)?,
            max_coins: parse_var(&lookup, "MAX_COINS")?.unwrap_or(defaults.max_coins),
            inbound_delay: millis("INBOUND_DELAY_MS", defaults.inbound_delay)?,
            outbound_delay: millis("OUTBOUND_DELAY_MS", defaults.outbound_delay)?,
            seed: parse_var(&lookup, "ARENA_SEED")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject geometry the simulation cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.is_zero() {
            return Err(ConfigError::Invalid("TICK_MS"));
        }
        if !is_positive(self.player_radius) {
            return Err(ConfigError::Invalid("PLAYER_RADIUS"));
        }
        if !is_positive(self.coin_radius) {
            return Err(ConfigError::Invalid("COIN_RADIUS"));
        }
        if !is_positive(self.player_speed) {
            return Err(ConfigError::Invalid("PLAYER_SPEED"));
        }
        // Map sizes go out as integers in the welcome message
        let min_extent = (2.0 * self.player_radius).max(2.0 * COIN_SPAWN_MARGIN);
        if !is_map_extent(self.map_width, min_extent) {
            return Err(ConfigError::Invalid("MAP_WIDTH"));
        }
        if !is_map_extent(self.map_height, min_extent) {
            return Err(ConfigError::Invalid("MAP_HEIGHT"));
        }
        Ok(())
    }

    /// Fixed step length in seconds, used for every integration step
    pub fn dt(&self) -> f32 {
        self.tick.as_secs_f32()
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn is_map_extent(value: f32, min_extent: f32) -> bool {
    is_positive(value) && value.fract() == 0.0 && value > min_extent
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key)),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_test::assert_ok;

    fn lookup_from(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = assert_ok!(GameConfig::from_lookup(|_| None));
        assert_eq!(config, GameConfig::default());
        assert!((config.dt() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = assert_ok!(GameConfig::from_lookup(lookup_from(&[
            ("MAP_WIDTH", "1024"),
            ("TICK_MS", "20"),
            ("MAX_COINS", "3"),
            ("INBOUND_DELAY_MS", "0"),
            ("ARENA_SEED", "42"),
        ])));
        assert_eq!(config.map_width, 1024.0);
        assert_eq!(config.tick, Duration::from_millis(20));
        assert_eq!(config.max_coins, 3);
        assert_eq!(config.inbound_delay, Duration::ZERO);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn malformed_value_names_the_variable() {
        let err = GameConfig::from_lookup(lookup_from(&[("MAX_COINS", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MAX_COINS")));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let err = GameConfig::from_lookup(lookup_from(&[("TICK_MS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("TICK_MS")));
    }

    #[test]
    fn non_finite_speed_is_rejected() {
        for raw in ["NaN", "inf", "-200", "0"] {
            let err = GameConfig::from_lookup(lookup_from(&[("PLAYER_SPEED", raw)])).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid("PLAYER_SPEED")), "{raw}");
        }
    }

    #[test]
    fn non_finite_radius_is_rejected() {
        let err = GameConfig::from_lookup(lookup_from(&[("COIN_RADIUS", "inf")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("COIN_RADIUS")));
        let err = GameConfig::from_lookup(lookup_from(&[("PLAYER_RADIUS", "NaN")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PLAYER_RADIUS")));
    }

    #[test]
    fn map_size_must_be_a_whole_number() {
        for raw in ["inf", "NaN", "800.9", "-800"] {
            let err = GameConfig::from_lookup(lookup_from(&[("MAP_WIDTH", raw)])).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid("MAP_WIDTH")), "{raw}");
        }
        let err = GameConfig::from_lookup(lookup_from(&[("MAP_HEIGHT", "600.5")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MAP_HEIGHT")));
    }

    #[test]
    fn hand_built_config_is_validated() {
        let config = GameConfig {
            map_width: 800.5,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid("MAP_WIDTH"))));
        let config = GameConfig {
            player_speed: f32::NAN,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid("PLAYER_SPEED"))));
    }

    #[test]
    fn map_must_fit_a_player() {
        let err = GameConfig::from_lookup(lookup_from(&[("MAP_WIDTH", "30")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MAP_WIDTH")));
    }
}
