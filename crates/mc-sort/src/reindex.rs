//! Permutations of the thread → slot mapping.
//!
//! All functions take the mapping and read-only slot columns; none of them
//! touch per-slot data.  Sorts are stable in both the serial and the Rayon
//! build, so ties keep their previous relative order.

use mc_core::{ParticleId, SimRng, TrackSlotId};
use mc_track::{ParticleParams, SimStateData, TrackStatus};

/// Stable sort of `threads` by a per-slot key.
fn sort_threads<K, F>(threads: &mut [TrackSlotId], key: F)
where
    K: Ord + Send,
    F: Fn(TrackSlotId) -> K + Sync,
{
    #[cfg(not(feature = "parallel"))]
    {
        threads.sort_by_key(|&slot| key(slot));
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        threads.par_sort_by_key(|&slot| key(slot));
    }
}

/// Reset to the identity mapping.
pub fn reindex_identity(threads: &mut [TrackSlotId]) {
    for (i, slot) in threads.iter_mut().enumerate() {
        *slot = TrackSlotId(i as u32);
    }
}

/// Move every active slot ahead of every inactive one.
pub fn reindex_status(threads: &mut [TrackSlotId], status: &[TrackStatus]) {
    sort_threads(threads, |slot| !status[slot.index()].is_active());
}

/// Neutral particles first, then charged.
pub fn reindex_charge(
    threads:      &mut [TrackSlotId],
    particle_ids: &[ParticleId],
    particles:    &ParticleParams,
) {
    sort_threads(threads, |slot| particles.is_charged(particle_ids[slot.index()]));
}

/// Group by particle species in ascending id order.
pub fn reindex_particle_type(threads: &mut [TrackSlotId], particle_ids: &[ParticleId]) {
    sort_threads(threads, |slot| particle_ids[slot.index()]);
}

/// Ascending along-step action; slots with no action sort last.
pub fn reindex_along_step_action(threads: &mut [TrackSlotId], sim: &SimStateData) {
    sort_threads(threads, |slot| sim.along_step_action[slot.index()]);
}

/// Ascending post-step action; slots with no action sort last.
pub fn reindex_step_limit_action(threads: &mut [TrackSlotId], sim: &SimStateData) {
    sort_threads(threads, |slot| sim.post_step_action[slot.index()]);
}

pub fn reindex_shuffle(threads: &mut [TrackSlotId], rng: &mut SimRng) {
    rng.shuffle(threads);
}

/// `true` when no active slot follows an inactive one.
pub fn is_partitioned_by_status(threads: &[TrackSlotId], status: &[TrackStatus]) -> bool {
    threads
        .windows(2)
        .all(|w| status[w[0].index()].is_active() || !status[w[1].index()].is_active())
}
