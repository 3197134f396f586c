//! Scoring engine for Farkle.
//!
//! Two pure questions are answered here, both over a multiset of die
//! faces:
//!
//! - [`ScoringRules::has_any_scoring_option`]: does this roll contain at
//!   least one scoring combination? A roll that doesn't is a bust.
//! - [`ScoringRules::score_selection`]: does this selection split
//!   *exactly* into scoring combinations, and if so what is the best
//!   total? Any leftover die makes the whole selection invalid.
//!
//! Dice are reduced to a [`FaceCounts`] vector first; every combination
//! is a subtraction on that vector, so the search never depends on the
//! order the dice were listed in.
//!
//! ```rust
//! use farkle_scoring::ScoringRules;
//!
//! let rules = ScoringRules::new(6);
//! assert_eq!(rules.score_selection(&[1, 1, 1]), Some(1000));
//! assert_eq!(rules.score_selection(&[2, 3, 4]), None);
//! assert!(!rules.has_any_scoring_option(&[2, 2, 3, 4, 6, 6]));
//! ```

mod combo;
mod search;

pub use combo::Combo;

/// Number of faces on a die.
pub const FACES: usize = 6;

/// How many dice show each face; index 0 is face 1.
pub type FaceCounts = [u8; FACES];

/// Counts the faces in `values`.
///
/// Returns `None` if any value is outside 1..=6 or a face appears more
/// than 255 times.
pub fn face_counts(values: &[u8]) -> Option<FaceCounts> {
    let mut counts = [0u8; FACES];
    for &value in values {
        if !(1..=FACES as u8).contains(&value) {
            return None;
        }
        let slot = &mut counts[usize::from(value - 1)];
        *slot = slot.checked_add(1)?;
    }
    Some(counts)
}

/// Scoring rules parameterised by the size of a full hand.
///
/// Straight, three pairs, four-of-a-kind plus a pair, and two triples only
/// count when the dice being evaluated are a full hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringRules {
    hand_size: usize,
}

impl ScoringRules {
    /// Creates rules for hands of `hand_size` dice.
    pub fn new(hand_size: usize) -> Self {
        Self { hand_size }
    }

    /// Returns `true` if any scoring combination is present in `values`.
    ///
    /// Empty input and out-of-range faces have no option.
    pub fn has_any_scoring_option(&self, values: &[u8]) -> bool {
        face_counts(values)
            .is_some_and(|counts| combo::first_legal(&counts, self.hand_size).is_some())
    }

    /// Returns the maximum points obtainable by partitioning *all* of
    /// `values` into scoring combinations, or `None` if no exact
    /// partition exists.
    pub fn score_selection(&self, values: &[u8]) -> Option<u32> {
        if values.is_empty() {
            return None;
        }
        let counts = face_counts(values)?;
        search::best_partition(counts, self.hand_size)
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::new(FACES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ScoringRules {
        ScoringRules::default()
    }

    // =====================================================================
    // face_counts
    // =====================================================================

    #[test]
    fn test_face_counts_groups_by_face() {
        assert_eq!(face_counts(&[1, 5, 5, 6]), Some([1, 0, 0, 0, 2, 1]));
    }

    #[test]
    fn test_face_counts_rejects_out_of_range() {
        assert_eq!(face_counts(&[0]), None);
        assert_eq!(face_counts(&[7]), None);
    }

    // =====================================================================
    // score_selection
    // =====================================================================

    #[test]
    fn test_score_selection_known_values() {
        let r = rules();
        assert_eq!(r.score_selection(&[1, 1, 1]), Some(1000));
        assert_eq!(r.score_selection(&[1, 2, 3, 4, 5, 6]), Some(1500));
        assert_eq!(r.score_selection(&[2, 3, 4]), None);
        assert_eq!(r.score_selection(&[5, 5]), Some(100));
        assert_eq!(r.score_selection(&[1, 1, 1, 1, 1, 1]), Some(3000));
    }

    #[test]
    fn test_score_selection_singles() {
        let r = rules();
        assert_eq!(r.score_selection(&[1]), Some(100));
        assert_eq!(r.score_selection(&[5]), Some(50));
        assert_eq!(r.score_selection(&[1, 5]), Some(150));
    }

    #[test]
    fn test_score_selection_triples_of_each_face() {
        let r = rules();
        assert_eq!(r.score_selection(&[2, 2, 2]), Some(200));
        assert_eq!(r.score_selection(&[3, 3, 3]), Some(300));
        assert_eq!(r.score_selection(&[4, 4, 4]), Some(400));
        assert_eq!(r.score_selection(&[5, 5, 5]), Some(500));
        assert_eq!(r.score_selection(&[6, 6, 6]), Some(600));
    }

    #[test]
    fn test_score_selection_n_of_a_kind() {
        let r = rules();
        assert_eq!(r.score_selection(&[3, 3, 3, 3]), Some(1000));
        assert_eq!(r.score_selection(&[3, 3, 3, 3, 3]), Some(2000));
        assert_eq!(r.score_selection(&[3, 3, 3, 3, 3, 3]), Some(3000));
    }

    #[test]
    fn test_score_selection_takes_best_partition() {
        // Four 1s: triple + single (1100) beats four of a kind (1000).
        assert_eq!(rules().score_selection(&[1, 1, 1, 1]), Some(1100));
        // Triple 5s plus a single 5 (550) loses to four of a kind.
        assert_eq!(rules().score_selection(&[5, 5, 5, 5]), Some(1000));
    }

    #[test]
    fn test_score_selection_full_hand_combos() {
        let r = rules();
        assert_eq!(r.score_selection(&[2, 2, 3, 3, 4, 4]), Some(1500));
        assert_eq!(r.score_selection(&[2, 2, 2, 2, 3, 3]), Some(1500));
        assert_eq!(r.score_selection(&[2, 2, 2, 3, 3, 3]), Some(2500));
    }

    #[test]
    fn test_score_selection_full_hand_combos_need_full_hand() {
        let r = ScoringRules::new(8);
        assert_eq!(r.score_selection(&[2, 2, 3, 3, 4, 4]), None);
        // No straight on a partial hand, so 2, 3, 4 and 6 are left over.
        assert_eq!(r.score_selection(&[1, 2, 3, 4, 5, 6]), None);
        assert_eq!(r.score_selection(&[1, 5]), Some(150));
    }

    #[test]
    fn test_score_selection_any_leftover_invalidates() {
        let r = rules();
        assert_eq!(r.score_selection(&[1, 1, 1, 2]), None);
        assert_eq!(r.score_selection(&[5, 6]), None);
        assert_eq!(r.score_selection(&[2, 2, 3, 3, 4, 6]), None);
    }

    #[test]
    fn test_score_selection_rejects_empty_and_bad_faces() {
        let r = rules();
        assert_eq!(r.score_selection(&[]), None);
        assert_eq!(r.score_selection(&[1, 7]), None);
        assert_eq!(r.score_selection(&[0, 5]), None);
    }

    #[test]
    fn test_score_selection_is_order_independent() {
        let r = rules();
        assert_eq!(
            r.score_selection(&[6, 5, 4, 3, 2, 1]),
            r.score_selection(&[1, 2, 3, 4, 5, 6])
        );
    }

    #[test]
    fn test_score_selection_is_idempotent() {
        let r = rules();
        let dice = [1, 1, 5, 5, 5, 2];
        let first = r.score_selection(&dice);
        assert_eq!(first, None);
        assert_eq!(r.score_selection(&dice), first);

        let dice = [1, 1, 5, 5, 5];
        assert_eq!(r.score_selection(&dice), Some(700));
        assert_eq!(r.score_selection(&dice), Some(700));
    }

    // =====================================================================
    // has_any_scoring_option
    // =====================================================================

    #[test]
    fn test_has_option_known_values() {
        let r = rules();
        assert!(!r.has_any_scoring_option(&[2, 2, 3, 4, 6]));
        assert!(!r.has_any_scoring_option(&[2, 2, 3, 4, 6, 6]));
        assert!(r.has_any_scoring_option(&[1, 2, 2, 3, 4, 6]));
        assert!(r.has_any_scoring_option(&[2, 2, 3, 3, 4, 4]));
    }

    #[test]
    fn test_has_option_three_pairs_only_on_full_hand() {
        let r = ScoringRules::new(8);
        assert!(!r.has_any_scoring_option(&[2, 2, 3, 3, 4, 4]));
    }

    #[test]
    fn test_has_option_triples_and_singles() {
        let r = rules();
        assert!(r.has_any_scoring_option(&[4, 4, 4]));
        assert!(r.has_any_scoring_option(&[5]));
        assert!(!r.has_any_scoring_option(&[2, 3]));
    }

    #[test]
    fn test_has_option_empty_or_invalid_is_false() {
        let r = rules();
        assert!(!r.has_any_scoring_option(&[]));
        assert!(!r.has_any_scoring_option(&[9, 9, 9]));
    }

    #[test]
    fn test_has_option_is_idempotent() {
        let r = rules();
        let dice = [2, 2, 3, 3, 4, 4];
        assert_eq!(r.has_any_scoring_option(&dice), r.has_any_scoring_option(&dice));
    }
}
