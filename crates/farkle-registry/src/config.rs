//! Registry configuration.

use std::time::Duration;

/// Characters that can't be confused with one another when read aloud or
/// typed: no `I`, `O`, `0` or `1`.
pub const DEFAULT_CODE_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// How codes are drawn and how long finished sessions linger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Characters per game code.
    pub code_length: usize,

    /// Characters a code is drawn from.
    pub code_alphabet: Vec<char>,

    /// How long a finished session stays findable so clients can read the
    /// final scoreboard.
    pub retention: Duration,

    /// How often the reaper sweeps.
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            code_length: 5,
            code_alphabet: DEFAULT_CODE_ALPHABET.chars().collect(),
            retention: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}
