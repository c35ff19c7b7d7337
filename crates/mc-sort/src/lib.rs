//! `mc-sort` — reorder the thread → slot mapping without moving slot data.
//!
//! Every action launch walks a `threads: [TrackSlotId]` array, one entry per
//! lane.  The functions here permute that array so lanes that do the same
//! work sit next to each other, and compute where each action's lanes start.
//!
//! | Function                        | Resulting order                                   |
//! |---------------------------------|---------------------------------------------------|
//! | [`reindex_identity`]            | `threads[i] == i`                                 |
//! | [`reindex_status`]              | active slots before inactive ones                 |
//! | [`reindex_charge`]              | neutral before charged                            |
//! | [`reindex_particle_type`]       | grouped by `ParticleId`                           |
//! | [`reindex_along_step_action`]   | ascending along-step `ActionId`, invalid last     |
//! | [`reindex_step_limit_action`]   | ascending post-step `ActionId`, invalid last      |
//! | [`reindex_shuffle`]             | a uniform random permutation                      |
//!
//! [`count_tracks_per_action`] + [`backfill_action_count`] then turn a mapping
//! sorted by action into half-open thread ranges, one per action.
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                     |
//! |------------|------------------------------------------------------------|
//! | `parallel` | Sorts use `rayon`'s `par_sort_by_key` (still stable).      |

pub mod count;
pub mod reindex;


pub use count::{
    ActionKey, ActionOffsets, backfill_action_count, count_tracks_per_action,
    is_sorted_by_action,
};
pub use reindex::{
    is_partitioned_by_status, reindex_along_step_action, reindex_charge, reindex_identity,
    reindex_particle_type, reindex_shuffle, reindex_status, reindex_step_limit_action,
};
