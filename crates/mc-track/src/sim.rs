//! Per-slot bookkeeping: identity, counters, status, and selected actions.

use mc_core::{ActionId, CoreResult, EventId, ParticleId, PrimaryId, Real, TrackId, validate};
use rustc_hash::FxHashMap;

use crate::store::select;

// ── TrackStatus ───────────────────────────────────────────────────────────────

/// Lifecycle state of the track occupying a slot.
///
/// ```text
/// Inactive → Initializing → Alive → (Alive)* → {Killed | Errored} → Inactive
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackStatus {
    /// No live track; the slot may be filled from an initializer.
    #[default]
    Inactive,
    /// Just written from an initializer; not yet seen by the pre-step.
    Initializing,
    Alive,
    /// Terminated by an unexpected internal failure.
    Errored,
    /// Terminated by physics or geometry.
    Killed,
}

impl TrackStatus {
    /// Slot hosts a track (possibly one that died this step).
    #[inline]
    pub fn is_active(self) -> bool {
        self != TrackStatus::Inactive
    }

    /// Track terminated this step and the slot awaits recycling.
    #[inline]
    pub fn is_dead(self) -> bool {
        matches!(self, TrackStatus::Killed | TrackStatus::Errored)
    }

    /// Single-character code used in diagnostics.
    pub fn code(self) -> char {
        match self {
            TrackStatus::Inactive     => '_',
            TrackStatus::Initializing => 'i',
            TrackStatus::Alive        => 'a',
            TrackStatus::Errored      => 'E',
            TrackStatus::Killed       => 'x',
        }
    }
}

// ── LoopingThreshold ──────────────────────────────────────────────────────────

/// Per-particle policy for killing tracks that the propagator flags as
/// looping.
///
/// Above `threshold_energy` a track may loop for `max_steps` consecutive
/// steps; below it only for `max_subthreshold_steps`.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoopingThreshold {
    pub max_subthreshold_steps: u32,
    pub max_steps:              u32,
    /// Kinetic energy in MeV.
    pub threshold_energy:       Real,
}

impl Default for LoopingThreshold {
    fn default() -> Self {
        Self {
            max_subthreshold_steps: 10,
            max_steps:              100,
            threshold_energy:       250.0,
        }
    }
}

impl LoopingThreshold {
    /// `true` when a track with `num_looping_steps` consecutive looping steps
    /// at kinetic energy `energy` must be killed.
    pub fn exceeded(&self, num_looping_steps: u32, energy: Real) -> bool {
        let limit = if energy < self.threshold_energy {
            self.max_subthreshold_steps
        } else {
            self.max_steps
        };
        num_looping_steps > limit
    }
}

// ── SimParamsData ─────────────────────────────────────────────────────────────

/// Shared, read-only parameters for the sim state.
#[derive(Clone, Debug, Default)]
pub struct SimParamsData {
    /// Looping thresholds by particle.  Empty disables looping detection
    /// and the `num_looping_steps` column is not allocated.
    pub looping: FxHashMap<ParticleId, LoopingThreshold>,

    /// Tracks taking more than this many steps are sent to the tracking cut.
    pub max_steps: Option<u32>,
}

impl SimParamsData {
    /// Looping policy for `particle`, if one is configured.
    #[inline]
    pub fn looping_for(&self, particle: ParticleId) -> Option<&LoopingThreshold> {
        self.looping.get(&particle)
    }
}

// ── SimStateData ──────────────────────────────────────────────────────────────

/// Structure-of-Arrays sim state.  Every column is indexed by `TrackSlotId`
/// and has exactly `size()` elements (except `num_looping_steps`, which is
/// empty when looping detection is disabled).
#[derive(Clone, Debug, Default)]
pub struct SimStateData {
    pub track_ids:         Vec<TrackId>,
    pub parent_ids:        Vec<TrackId>,
    pub primary_ids:       Vec<PrimaryId>,
    pub event_ids:         Vec<EventId>,
    pub num_steps:         Vec<u32>,
    pub num_looping_steps: Vec<u32>,
    /// Lab-frame time in ns.
    pub time:              Vec<Real>,
    pub status:            Vec<TrackStatus>,
    pub step_length:       Vec<Real>,
    pub post_step_action:  Vec<ActionId>,
    pub along_step_action: Vec<ActionId>,
    pub weight:            Vec<Real>,
}

impl SimStateData {
    /// Allocate every column to `size` and mark all slots inactive.
    pub fn resize(&mut self, params: &SimParamsData, size: usize) -> CoreResult<()> {
        validate!(size > 0, "sim state requires at least one track slot");

        self.track_ids         = vec![TrackId::INVALID; size];
        self.parent_ids        = vec![TrackId::INVALID; size];
        self.primary_ids       = vec![PrimaryId::INVALID; size];
        self.event_ids         = vec![EventId::INVALID; size];
        self.num_steps         = vec![0; size];
        self.num_looping_steps = if params.looping.is_empty() { Vec::new() } else { vec![0; size] };
        self.time              = vec![0.0; size];
        self.status            = vec![TrackStatus::Inactive; size];
        self.step_length       = vec![0.0; size];
        self.post_step_action  = vec![ActionId::INVALID; size];
        self.along_step_action = vec![ActionId::INVALID; size];
        self.weight            = vec![0.0; size];
        Ok(())
    }

    /// Number of slots.
    #[inline]
    pub fn size(&self) -> usize {
        self.status.len()
    }

    /// All required columns are allocated with the same length.
    pub fn is_valid(&self) -> bool {
        let n = self.size();
        n > 0
            && self.track_ids.len() == n
            && self.parent_ids.len() == n
            && self.primary_ids.len() == n
            && self.event_ids.len() == n
            && self.num_steps.len() == n
            && (self.num_looping_steps.is_empty() || self.num_looping_steps.len() == n)
            && self.time.len() == n
            && self.step_length.len() == n
            && self.post_step_action.len() == n
            && self.along_step_action.len() == n
            && self.weight.len() == n
    }

    /// One mutable view per slot, in slot order.
    pub fn views_mut(&mut self) -> impl Iterator<Item = SimView<'_>> {
        let n = self.size();
        self.select_mut(0..n)
    }

    /// Views of `slots` only.  Indices must be strictly increasing; the
    /// iterator stops at the first one that is not.
    pub fn select_mut<I>(&mut self, slots: I) -> impl Iterator<Item = SimView<'_>>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut track_id    = self.track_ids.iter_mut();
        let mut parent_id   = self.parent_ids.iter_mut();
        let mut primary_id  = self.primary_ids.iter_mut();
        let mut event_id    = self.event_ids.iter_mut();
        let mut num_steps   = self.num_steps.iter_mut();
        let mut looping     = self.num_looping_steps.iter_mut();
        let mut time        = self.time.iter_mut();
        let mut status      = self.status.iter_mut();
        let mut step_length = self.step_length.iter_mut();
        let mut post_step   = self.post_step_action.iter_mut();
        let mut along_step  = self.along_step_action.iter_mut();
        let mut weight      = self.weight.iter_mut();

        select(slots, move |skip| {
            Some(SimView {
                track_id:          track_id.nth(skip)?,
                parent_id:         parent_id.nth(skip)?,
                primary_id:        primary_id.nth(skip)?,
                event_id:          event_id.nth(skip)?,
                num_steps:         num_steps.nth(skip)?,
                num_looping_steps: looping.nth(skip),
                time:              time.nth(skip)?,
                status:            status.nth(skip)?,
                step_length:       step_length.nth(skip)?,
                post_step_action:  post_step.nth(skip)?,
                along_step_action: along_step.nth(skip)?,
                weight:            weight.nth(skip)?,
            })
        })
    }
}

/// Exclusive borrow of one slot's sim columns.
#[derive(Debug)]
pub struct SimView<'a> {
    pub track_id:          &'a mut TrackId,
    pub parent_id:         &'a mut TrackId,
    pub primary_id:        &'a mut PrimaryId,
    pub event_id:          &'a mut EventId,
    pub num_steps:         &'a mut u32,
    /// `None` when looping detection is disabled.
    pub num_looping_steps: Option<&'a mut u32>,
    pub time:              &'a mut Real,
    pub status:            &'a mut TrackStatus,
    pub step_length:       &'a mut Real,
    pub post_step_action:  &'a mut ActionId,
    pub along_step_action: &'a mut ActionId,
    pub weight:            &'a mut Real,
}

impl SimView<'_> {
    /// Return the slot to its empty state.
    pub fn clear(&mut self) {
        *self.track_id          = TrackId::INVALID;
        *self.parent_id         = TrackId::INVALID;
        *self.primary_id        = PrimaryId::INVALID;
        *self.event_id          = EventId::INVALID;
        *self.num_steps         = 0;
        *self.time              = 0.0;
        *self.status            = TrackStatus::Inactive;
        *self.step_length       = 0.0;
        *self.post_step_action  = ActionId::INVALID;
        *self.along_step_action = ActionId::INVALID;
        *self.weight            = 0.0;
        if let Some(n) = self.num_looping_steps.as_deref_mut() {
            *n = 0;
        }
    }
}
