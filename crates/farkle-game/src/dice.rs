//! Dice rolling behind a trait so tests can script every roll.

use std::sync::Arc;

use farkle_scoring::FACES;
use rand::Rng;

/// Highest face on a die, independent of how many dice a hand has.
const TOP_FACE: u8 = FACES as u8;

/// Source of die faces for one session.
pub trait DiceRoller: Send {
    /// Returns the next face, in 1..=6.
    fn roll(&mut self) -> u8;
}

/// Builds a fresh roller for each new session.
pub type RollerFactory = Arc<dyn Fn() -> Box<dyn DiceRoller> + Send + Sync>;

/// Factory handing out [`RandomRoller`]s.
pub fn random_roller_factory() -> RollerFactory {
    Arc::new(|| Box::new(RandomRoller))
}

/// Factory handing out a [`SequenceRoller`] over `faces` to every session.
pub fn sequence_roller_factory(faces: Vec<u8>) -> RollerFactory {
    Arc::new(move || Box::new(SequenceRoller::new(faces.clone())))
}

// ---------------------------------------------------------------------------
// RandomRoller
// ---------------------------------------------------------------------------

/// Uniform rolls from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRoller;

impl DiceRoller for RandomRoller {
    fn roll(&mut self) -> u8 {
        rand::rng().random_range(1..=TOP_FACE)
    }
}

// ---------------------------------------------------------------------------
// SequenceRoller
// ---------------------------------------------------------------------------

/// Cycles through a fixed list of faces. Deterministic games for tests.
///
/// Values outside 1..=6 are clamped; an empty list always rolls 1.
#[derive(Debug, Clone)]
pub struct SequenceRoller {
    faces: Vec<u8>,
    next: usize,
}

impl SequenceRoller {
    pub fn new(faces: Vec<u8>) -> Self {
        let faces = faces.into_iter().map(|f| f.clamp(1, TOP_FACE)).collect();
        Self { faces, next: 0 }
    }
}

impl DiceRoller for SequenceRoller {
    fn roll(&mut self) -> u8 {
        if self.faces.is_empty() {
            return 1;
        }
        let face = self.faces[self.next % self.faces.len()];
        self.next = (self.next + 1) % self.faces.len();
        face
    }
}
