//! The scoring combinations and the face counts they consume.

use crate::{FaceCounts, FACES};

/// One scoring group of dice.
///
/// Faces are stored as their printed value (1..=6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combo {
    /// One of every face. Full hand only.
    Straight,
    /// Exactly three different pairs and nothing else. Full hand only.
    ThreePairs,
    /// Four of one face plus a pair of another. Full hand only.
    FourWithPair { four: u8, pair: u8 },
    /// Two different triples. Full hand only.
    TwoTriples { low: u8, high: u8 },
    /// Three to six dice of the same face.
    OfAKind { face: u8, count: u8 },
    /// A lone 1 or 5.
    Single(u8),
}

impl Combo {
    /// Points awarded for this combination.
    pub fn points(&self) -> u32 {
        match *self {
            Self::Straight | Self::ThreePairs | Self::FourWithPair { .. } => 1500,
            Self::TwoTriples { .. } => 2500,
            Self::OfAKind { face, count: 3 } => {
                if face == 1 {
                    1000
                } else {
                    100 * u32::from(face)
                }
            }
            Self::OfAKind { count: 4, .. } => 1000,
            Self::OfAKind { count: 5, .. } => 2000,
            Self::OfAKind { .. } => 3000,
            Self::Single(1) => 100,
            Self::Single(_) => 50,
        }
    }

    /// Returns `true` for combinations that are only legal when the dice
    /// under evaluation form a complete hand.
    pub fn full_hand_only(&self) -> bool {
        matches!(
            self,
            Self::Straight
                | Self::ThreePairs
                | Self::FourWithPair { .. }
                | Self::TwoTriples { .. }
        )
    }

    /// Subtracts the dice this combination uses from `counts`.
    ///
    /// Returns `None` if `counts` doesn't contain them.
    pub fn consume(&self, counts: &FaceCounts) -> Option<FaceCounts> {
        let mut rest = *counts;
        match *self {
            Self::Straight => {
                for face in 1..=FACES as u8 {
                    take(&mut rest, face, 1)?;
                }
            }
            Self::ThreePairs => {
                for face in 1..=FACES as u8 {
                    if rest[idx(face)] == 2 {
                        take(&mut rest, face, 2)?;
                    }
                }
            }
            Self::FourWithPair { four, pair } => {
                take(&mut rest, four, 4)?;
                take(&mut rest, pair, 2)?;
            }
            Self::TwoTriples { low, high } => {
                take(&mut rest, low, 3)?;
                take(&mut rest, high, 3)?;
            }
            Self::OfAKind { face, count } => take(&mut rest, face, count)?,
            Self::Single(face) => take(&mut rest, face, 1)?,
        }
        Some(rest)
    }
}

fn idx(face: u8) -> usize {
    usize::from(face.saturating_sub(1)).min(FACES - 1)
}

fn take(counts: &mut FaceCounts, face: u8, n: u8) -> Option<()> {
    let slot = &mut counts[idx(face)];
    *slot = slot.checked_sub(n)?;
    Some(())
}

/// Lists every combination that can be taken out of `counts`.
///
/// Full-hand combinations are offered only when the counts add up to
/// exactly `hand_size` dice.
pub(crate) fn legal(counts: &FaceCounts, hand_size: usize) -> Vec<Combo> {
    let total: usize = counts.iter().map(|&c| usize::from(c)).sum();
    let mut combos = Vec::new();
    if total == 0 {
        return combos;
    }

    let faces = move || (1..=FACES as u8).map(move |f| (f, counts[idx(f)]));

    if total == hand_size {
        if counts.iter().all(|&c| c >= 1) {
            combos.push(Combo::Straight);
        }
        let pairs = counts.iter().filter(|&&c| c == 2).count();
        if pairs == 3 && counts.iter().all(|&c| c == 0 || c == 2) {
            combos.push(Combo::ThreePairs);
        }
        for (four, fc) in faces() {
            if fc < 4 {
                continue;
            }
            for (pair, pc) in faces() {
                if pair != four && pc >= 2 {
                    combos.push(Combo::FourWithPair { four, pair });
                }
            }
        }
        for (low, lc) in faces() {
            for (high, hc) in faces() {
                if low < high && lc >= 3 && hc >= 3 {
                    combos.push(Combo::TwoTriples { low, high });
                }
            }
        }
    }

    for (face, count) in faces() {
        for n in 3..=count.min(FACES as u8) {
            combos.push(Combo::OfAKind { face, count: n });
        }
    }
    for face in [1, 5] {
        if counts[idx(face)] >= 1 {
            combos.push(Combo::Single(face));
        }
    }
    combos
}

/// The first legal combination, if any.
pub(crate) fn first_legal(counts: &FaceCounts, hand_size: usize) -> Option<Combo> {
    legal(counts, hand_size).into_iter().next()
}
