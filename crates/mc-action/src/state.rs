//! Mutable per-stream state and the lane launcher.

use std::marker::PhantomData;
use std::ops::Range;

use mc_core::{ActionId, SimRng, ThreadId, TrackSlotId};
use mc_init::{PrimaryStateData, TrackInitStateData};
use mc_sort::{ActionKey, ActionOffsets, reindex_identity};
use mc_track::{TrackSlots, TrackStatus, TrackView};
use tracing::info;

use crate::{ActionResult, CoreParams, Executor, MemSpace};

// ── StepCounters ──────────────────────────────────────────────────────────────

/// Occupancy snapshot taken at the end of a step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepCounters {
    /// Slots that are not `Inactive` after recycling.
    pub num_active:       usize,
    pub num_alive:        usize,
    /// Initializers waiting for a vacancy.
    pub num_initializers: usize,
    pub num_vacancies:    usize,
    /// Primaries staged but not yet converted.
    pub num_pending:      usize,
    /// Secondaries queued during the step.
    pub num_secondaries:  usize,
    /// Tracks that ended the step errored.
    pub num_errored:      usize,
}

impl StepCounters {
    /// Nothing left to transport.
    pub fn is_done(&self) -> bool {
        self.num_active == 0 && self.num_initializers == 0 && self.num_pending == 0
    }
}

// ── CoreState ─────────────────────────────────────────────────────────────────

/// Track slots, queues, and the thread → slot mapping for one stream.
///
/// `M` selects the memory space.  Only [`Host`](crate::Host) state can be
/// constructed in this build.
#[derive(Debug)]
pub struct CoreState<M: MemSpace> {
    pub slots:     TrackSlots,
    pub init:      TrackInitStateData,
    pub primaries: PrimaryStateData,

    /// `threads[t]` is the slot lane `t` works on.  Always a permutation of
    /// all slot ids.
    pub threads: Vec<TrackSlotId>,

    /// Per-action thread ranges, valid while the mapping stays sorted.
    pub offsets: ActionOffsets,

    pub counters: StepCounters,

    /// Host-side randomness (mapping shuffles).
    pub rng: SimRng,

    executor:  Executor,
    _memspace: PhantomData<M>,
}

impl<M: MemSpace> CoreState<M> {
    /// Allocate state sized by `params.config`.
    ///
    /// # Errors
    ///
    /// [`ActionError::NotConfigured`](crate::ActionError::NotConfigured) if
    /// `M` is not available, or a config error for invalid sizes.
    pub fn new(params: &CoreParams) -> ActionResult<Self> {
        M::check_available()?;
        params.config.validate()?;

        let n = params.config.num_track_slots;
        let slots = TrackSlots::new(&params.sim, n)?;
        let init = TrackInitStateData::new(&params.init, n);
        let executor = Executor::from_config(&params.config)?;

        info!(
            memspace = M::NAME,
            slots = n,
            capacity = params.init.capacity,
            executor = %executor.name(),
            "allocated core state"
        );

        Ok(Self {
            slots,
            init,
            primaries: PrimaryStateData::default(),
            threads: (0..n as u32).map(TrackSlotId).collect(),
            offsets: ActionOffsets::new(),
            counters: StepCounters::default(),
            rng: SimRng::new(params.config.seed),
            executor,
            _memspace: PhantomData,
        })
    }

    /// Number of slots (and lanes).
    #[inline]
    pub fn size(&self) -> usize {
        self.slots.count
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Return to the identity mapping and drop cached action ranges.
    pub fn reset_threads(&mut self) {
        reindex_identity(&mut self.threads);
        self.offsets.invalidate();
    }

    /// Threads assigned to `action` when the mapping is sorted by `key`.
    pub fn action_threads(&self, action: ActionId, key: ActionKey) -> Option<Range<usize>> {
        self.offsets.threads(action, key)
    }

    /// Run `f` once for every lane in `range`, each with exclusive access to
    /// the slot that lane maps to.
    ///
    /// Only the slots of `threads[range]` are borrowed, so a narrow range
    /// costs in proportion to its length rather than to the slot count.
    pub fn launch<F>(&mut self, range: Range<usize>, f: F)
    where
        F: Fn(ThreadId, &mut TrackView<'_>) + Sync,
    {
        let end = range.end.min(self.threads.len());
        let start = range.start.min(end);
        if start == end {
            return;
        }

        let mut by_slot: Vec<(usize, ThreadId)> = (start..end)
            .zip(&self.threads[start..end])
            .map(|(t, slot)| (slot.index(), ThreadId(t as u32)))
            .collect();
        by_slot.sort_unstable_by_key(|&(slot, _)| slot);
        by_slot.dedup_by_key(|&mut (slot, _)| slot);

        let mut lanes: Vec<(ThreadId, TrackView<'_>)> = self
            .slots
            .select_mut(by_slot.iter().map(|&(slot, _)| slot))
            .zip(&by_slot)
            .map(|(view, &(_, thread))| (thread, view))
            .collect();
        lanes.sort_unstable_by_key(|&(thread, _)| thread);
        self.executor.run(&mut lanes, &f);
    }

    /// Run `f` for every lane whose selected `key` action is `action`.
    ///
    /// Uses the cached thread range when the mapping is sorted by `key`;
    /// otherwise scans every lane.
    pub fn launch_action<F>(&mut self, action: ActionId, key: ActionKey, f: F)
    where
        F: Fn(ThreadId, &mut TrackView<'_>) + Sync,
    {
        let range = self.action_threads(action, key).unwrap_or(0..self.size());
        self.launch(range, |thread, view| {
            let selected = match key {
                ActionKey::AlongStep => *view.sim.along_step_action,
                ActionKey::PostStep  => *view.sim.post_step_action,
            };
            if selected == action {
                f(thread, view);
            }
        });
    }

    /// Recount occupancy from the slot and queue state.
    ///
    /// `num_secondaries` and `num_errored` are recorded by the end-of-step
    /// action before dead slots are recycled, and are kept as they are.
    pub fn update_counters(&mut self) {
        let status = &self.slots.sim.status;
        self.counters = StepCounters {
            num_active:       status.iter().filter(|s| s.is_active()).count(),
            num_alive:        status.iter().filter(|&&s| s == TrackStatus::Alive).count(),
            num_initializers: self.init.num_initializers(),
            num_vacancies:    self.init.num_vacancies(),
            num_pending:      self.primaries.count,
            ..self.counters
        };
    }
}
