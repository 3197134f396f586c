//! Exact-partition search over face counts.

use std::collections::HashMap;

use crate::combo;
use crate::FaceCounts;

/// Best total over every way of splitting `counts` into legal
/// combinations with nothing left over.
///
/// The memo lives for one call; entries map a remainder to its best
/// score, or `None` when the remainder can't be fully consumed.
pub(crate) fn best_partition(counts: FaceCounts, hand_size: usize) -> Option<u32> {
    let mut memo = HashMap::new();
    best(counts, hand_size, &mut memo)
}

fn best(
    counts: FaceCounts,
    hand_size: usize,
    memo: &mut HashMap<FaceCounts, Option<u32>>,
) -> Option<u32> {
    if counts.iter().all(|&c| c == 0) {
        return Some(0);
    }
    if let Some(&known) = memo.get(&counts) {
        return known;
    }

    let mut result: Option<u32> = None;
    for candidate in combo::legal(&counts, hand_size) {
        let Some(rest) = candidate.consume(&counts) else {
            continue;
        };
        if let Some(tail) = best(rest, hand_size, memo) {
            let total = candidate.points() + tail;
            result = Some(result.map_or(total, |r| r.max(total)));
        }
    }

    memo.insert(counts, result);
    result
}
