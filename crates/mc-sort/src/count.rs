//! Per-action thread ranges over a mapping sorted by action.
//!
//! ```text
//! actions by thread:   0 0 2 2 2 -      (4 actions, "-" = no action)
//! count:              [0 5 2 5 5]       first thread per action, rest = 5
//! backfill:           [0 2 2 5 5]       every [o[i], o[i+1]) is a range
//! ```

use std::ops::Range;

use mc_core::{ActionId, TrackSlotId};
use mc_track::SimStateData;

// ── ActionKey ─────────────────────────────────────────────────────────────────

/// Which selected-action column a mapping is sorted by.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ActionKey {
    AlongStep,
    PostStep,
}

impl ActionKey {
    pub fn column(self, sim: &SimStateData) -> &[ActionId] {
        match self {
            ActionKey::AlongStep => &sim.along_step_action,
            ActionKey::PostStep  => &sim.post_step_action,
        }
    }
}

// ── Counting ──────────────────────────────────────────────────────────────────

/// Record the first thread of every action in `offsets`.
///
/// `offsets` has one entry per action plus a final entry.  Threads must be
/// sorted by `actions` (invalid ids last).  The final entry, and the entry of
/// every action with no threads, is set to the number of threads holding a
/// valid action; run [`backfill_action_count`] before using the result as
/// ranges.
pub fn count_tracks_per_action(
    threads: &[TrackSlotId],
    actions: &[ActionId],
    offsets: &mut [usize],
) {
    let Some(num_actions) = offsets.len().checked_sub(1) else {
        return;
    };
    let action_of = |slot: &TrackSlotId| actions[slot.index()];
    let num_valid = threads
        .iter()
        .take_while(|slot| action_of(slot).index() < num_actions)
        .count();

    offsets.fill(num_valid);
    for (thread, slot) in threads[..num_valid].iter().enumerate().rev() {
        offsets[action_of(slot).index()] = thread;
    }
}

/// Give every empty action the offset of the next populated one, so
/// `offsets` is non-decreasing.
pub fn backfill_action_count(offsets: &mut [usize]) {
    for i in (0..offsets.len().saturating_sub(1)).rev() {
        offsets[i] = offsets[i].min(offsets[i + 1]);
    }
}

/// `true` when action ids never decrease along the mapping.
pub fn is_sorted_by_action(threads: &[TrackSlotId], actions: &[ActionId]) -> bool {
    threads
        .windows(2)
        .all(|w| actions[w[0].index()] <= actions[w[1].index()])
}

// ── ActionOffsets ─────────────────────────────────────────────────────────────

/// Cached per-action ranges, tagged with the column the mapping was sorted
/// by.  Any other reordering must call [`ActionOffsets::invalidate`].
#[derive(Clone, Debug, Default)]
pub struct ActionOffsets {
    key:     Option<ActionKey>,
    offsets: Vec<usize>,
}

impl ActionOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the ranges for a mapping just sorted by `key`.
    pub fn update(
        &mut self,
        key:         ActionKey,
        threads:     &[TrackSlotId],
        actions:     &[ActionId],
        num_actions: usize,
    ) {
        self.offsets.clear();
        self.offsets.resize(num_actions + 1, 0);
        count_tracks_per_action(threads, actions, &mut self.offsets);
        backfill_action_count(&mut self.offsets);
        self.key = Some(key);
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }

    #[inline]
    pub fn key(&self) -> Option<ActionKey> {
        self.key
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.offsets
    }

    /// Threads running `action`, if the mapping is currently sorted by
    /// `key`.  `None` means the caller must scan every thread.
    pub fn threads(&self, action: ActionId, key: ActionKey) -> Option<Range<usize>> {
        if self.key != Some(key) {
            return None;
        }
        let i = action.get()?.index();
        let start = *self.offsets.get(i)?;
        let end = *self.offsets.get(i + 1)?;
        Some(start..end)
    }

    /// Number of threads holding a valid action.
    pub fn num_assigned(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }
}
