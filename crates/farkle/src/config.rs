//! Server configuration read from `FARKLE_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use farkle_game::GameConfig;
use farkle_registry::RegistryConfig;

/// Problems found while reading or checking configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but can't be parsed.
    #[error("{key}: cannot parse {value:?}")]
    Invalid { key: &'static str, value: String },

    /// Values parse but don't make sense together.
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Everything the server needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    /// Capacity of each participant's outbound queue.
    pub send_buffer_size: usize,
    pub game: GameConfig,
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            send_buffer_size: 256,
            game: GameConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the process environment. Unset or blank variables keep their
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through
    /// `lookup`, so tests don't have to touch the real environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let d = Self::default();

        let code_alphabet = match get("FARKLE_GAME_CODE_CHARS") {
            Some(chars) => chars.to_uppercase().chars().collect(),
            None => d.registry.code_alphabet,
        };

        let config = Self {
            bind_host: get("FARKLE_BIND").unwrap_or(d.bind_host),
            port: parse_var("FARKLE_PORT", get("FARKLE_PORT"), d.port)?,
            send_buffer_size: parse_var(
                "FARKLE_SEND_BUFFER_SIZE",
                get("FARKLE_SEND_BUFFER_SIZE"),
                d.send_buffer_size,
            )?,
            game: GameConfig {
                slots: parse_var("FARKLE_NUM_PLAYERS", get("FARKLE_NUM_PLAYERS"), d.game.slots)?,
                dice_per_hand: parse_var(
                    "FARKLE_NUM_DICE",
                    get("FARKLE_NUM_DICE"),
                    d.game.dice_per_hand,
                )?,
                default_victory_target: parse_var(
                    "FARKLE_DEFAULT_VICTORY_SCORE",
                    get("FARKLE_DEFAULT_VICTORY_SCORE"),
                    d.game.default_victory_target,
                )?,
                min_victory_target: parse_var(
                    "FARKLE_MIN_VICTORY_SCORE",
                    get("FARKLE_MIN_VICTORY_SCORE"),
                    d.game.min_victory_target,
                )?,
                max_victory_target: parse_var(
                    "FARKLE_MAX_VICTORY_SCORE",
                    get("FARKLE_MAX_VICTORY_SCORE"),
                    d.game.max_victory_target,
                )?,
            },
            registry: RegistryConfig {
                code_length: parse_var(
                    "FARKLE_GAME_CODE_LENGTH",
                    get("FARKLE_GAME_CODE_LENGTH"),
                    d.registry.code_length,
                )?,
                code_alphabet,
                retention: duration_var(
                    "FARKLE_FINISHED_GAME_RETENTION",
                    get("FARKLE_FINISHED_GAME_RETENTION"),
                    d.registry.retention,
                )?,
                sweep_interval: duration_var(
                    "FARKLE_CLEANUP_INTERVAL",
                    get("FARKLE_CLEANUP_INTERVAL"),
                    d.registry.sweep_interval,
                )?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the server can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let inconsistent = |msg: String| Err(ConfigError::Inconsistent(msg));
        let game = &self.game;

        if game.slots < 2 {
            return inconsistent(format!("need at least 2 player slots, got {}", game.slots));
        }
        if game.dice_per_hand == 0 {
            return inconsistent("dice per hand must be positive".into());
        }
        if self.send_buffer_size == 0 {
            return inconsistent("send buffer size must be positive".into());
        }
        if self.registry.code_length == 0 {
            return inconsistent("game code length must be positive".into());
        }
        if self.registry.code_alphabet.is_empty() {
            return inconsistent("game code alphabet is empty".into());
        }
        if game.min_victory_target > game.default_victory_target
            || game.default_victory_target > game.max_victory_target
        {
            return inconsistent(format!(
                "victory scores must satisfy min <= default <= max, got {} / {} / {}",
                game.min_victory_target, game.default_victory_target, game.max_victory_target
            ));
        }
        if self.registry.sweep_interval.is_zero() {
            return inconsistent("cleanup interval must be positive".into());
        }
        Ok(())
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn parse_var<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn duration_var(
    key: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => parse_duration(&value).ok_or(ConfigError::Invalid { key, value }),
    }
}

/// Parses `90`, `1500ms`, `30s`, `5m` or `2h`. A bare number is seconds.
fn parse_duration(raw: &str) -> Option<Duration> {
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let n: u64 = digits.parse().ok()?;
    match unit.trim() {
        "ms" => Some(Duration::from_millis(n)),
        "" | "s" => Some(Duration::from_secs(n)),
        "m" => n.checked_mul(60).map(Duration::from_secs),
        "h" => n.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}
