//! Client Configuration
//!
//! Defaults suit a local server; every field can be overridden from the
//! environment (a `.env` file is loaded by the binary first).

use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use crate::core::geometry::TilePos;
use crate::core::vec2::Vec2;
use crate::network::sync::SyncConfig;
use crate::render::Viewport;
use crate::sim::movement::MovementConfig;

/// Highest accepted tick rate (Hz).
pub const MAX_TICK_RATE: u32 = 1000;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is present but does not parse.
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// What was expected
        reason: &'static str,
    },
}

/// Client configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// WebSocket endpoint of the world server.
    pub server_url: String,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Screen size.
    pub viewport: Viewport,
    /// Player spawn position in world units.
    pub spawn: Vec2,
    /// Run without a server against a seeded local world.
    pub offline: bool,
    /// Capacity of the inbound and outbound frame queues.
    pub queue_capacity: usize,
    /// Integrator tuning.
    pub movement: MovementConfig,
    /// Sync tuning.
    pub sync: SyncConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/ws".to_string(),
            tick_rate: crate::TICK_RATE,
            viewport: Viewport::default(),
            spawn: Vec2::new(625.0, 325.0),
            offline: false,
            queue_capacity: 256,
            movement: MovementConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Create config from an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |name: &str| vars.get(name).map(String::as_str);

        let mut config = Self::default();

        if let Some(url) = get("BLOCKWORLD_SERVER_URL") {
            config.server_url = url.to_string();
        }
        if let Some(raw) = get("BLOCKWORLD_TICK_RATE") {
            config.tick_rate = parse_num("BLOCKWORLD_TICK_RATE", raw)?;
            if config.tick_rate == 0 {
                return Err(invalid("BLOCKWORLD_TICK_RATE", raw, "must be positive"));
            }
            if config.tick_rate > MAX_TICK_RATE {
                return Err(invalid("BLOCKWORLD_TICK_RATE", raw, "must be at most 1000"));
            }
        }
        if let Some(raw) = get("BLOCKWORLD_VIEWPORT") {
            let (w, h) = parse_pair("BLOCKWORLD_VIEWPORT", raw, 'x')?;
            if w <= 0.0 || h <= 0.0 {
                return Err(invalid("BLOCKWORLD_VIEWPORT", raw, "must be positive"));
            }
            config.viewport = Viewport::new(w, h);
        }
        if let Some(raw) = get("BLOCKWORLD_SPAWN") {
            let (x, y) = parse_pair("BLOCKWORLD_SPAWN", raw, ',')?;
            config.spawn = Vec2::new(x, y);
            if TilePos::try_containing(config.spawn).is_none() {
                return Err(invalid("BLOCKWORLD_SPAWN", raw, "outside the tile range"));
            }
        }
        if let Some(raw) = get("BLOCKWORLD_INTENT_TIMEOUT_TICKS") {
            config.sync.intent_timeout_ticks = parse_num("BLOCKWORLD_INTENT_TIMEOUT_TICKS", raw)?;
        }
        if let Some(raw) = get("BLOCKWORLD_QUEUE_CAPACITY") {
            config.queue_capacity = parse_num("BLOCKWORLD_QUEUE_CAPACITY", raw)?;
            if config.queue_capacity == 0 {
                return Err(invalid("BLOCKWORLD_QUEUE_CAPACITY", raw, "must be positive"));
            }
        }
        if let Some(raw) = get("BLOCKWORLD_OFFLINE") {
            config.offline = parse_bool("BLOCKWORLD_OFFLINE", raw)?;
        }

        Ok(config)
    }

    /// Tick period.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.tick_rate))
    }
}

fn invalid(var: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason,
    }
}

fn parse_num<T: FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(var, raw, "expected a number"))
}

fn parse_pair(var: &'static str, raw: &str, sep: char) -> Result<(f64, f64), ConfigError> {
    let (a, b) = raw
        .split_once(sep)
        .ok_or_else(|| invalid(var, raw, "expected two numbers"))?;
    let a: f64 = parse_num(var, a)?;
    let b: f64 = parse_num(var, b)?;
    if !a.is_finite() || !b.is_finite() {
        return Err(invalid(var, raw, "must be finite"));
    }
    Ok((a, b))
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(invalid(var, raw, "expected true or false")),
    }
}
