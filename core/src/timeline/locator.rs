//! Checkpoint lookup by timeline index
//!
//! Checkpoints are sorted strictly ascending by index, so both lookups are a
//! binary search. Results are clamped to the ends of the array instead of
//! failing: asking for an index before the first checkpoint yields the first,
//! asking past the last yields the last.

use crate::checkpoint::Checkpoint;

/// Slot of the last checkpoint at or before `index`, clamped to slot 0.
pub fn last_slot(checkpoints: &[Checkpoint], index: usize) -> usize {
    match checkpoints.binary_search_by_key(&index, |c| c.index) {
        Ok(slot) => slot,
        Err(insert) => insert.saturating_sub(1),
    }
}

/// Slot of the first checkpoint at or after `index`, clamped to the last slot.
pub fn next_slot(checkpoints: &[Checkpoint], index: usize) -> usize {
    match checkpoints.binary_search_by_key(&index, |c| c.index) {
        Ok(slot) => slot,
        Err(insert) => insert.min(checkpoints.len().saturating_sub(1)),
    }
}

/// Last checkpoint at or before `index`. `None` only if there are no checkpoints.
pub fn last_at_or_before(checkpoints: &[Checkpoint], index: usize) -> Option<&Checkpoint> {
    checkpoints.get(last_slot(checkpoints, index))
}

/// First checkpoint at or after `index`. `None` only if there are no checkpoints.
pub fn next_at_or_after(checkpoints: &[Checkpoint], index: usize) -> Option<&Checkpoint> {
    checkpoints.get(next_slot(checkpoints, index))
}
