//! `TrackSlots` — the fixed-width SoA arrays every action operates on.
//!
//! # Access pattern
//!
//! Actions never index columns directly.  They receive one [`TrackView`] per
//! lane: a bundle of disjoint `&mut` borrows into a single slot's elements of
//! every column.  Views are produced by [`TrackSlots::views_mut`] by splitting
//! each column's `iter_mut()`, so a set of views can be handed to Rayon
//! workers without any `unsafe` and without a lane ever touching another
//! slot.

use mc_core::{ParticleId, Real, Real3, TrackRng, TrackSlotId, CoreResult};

use crate::geo::{GeoStateData, GeoView};
use crate::particle::{ParticleParams, ParticleStateData, ParticleView};
use crate::sim::{SimParamsData, SimStateData, SimView, TrackStatus};

// ── Secondary ─────────────────────────────────────────────────────────────────

/// A particle emitted by an interaction, buffered in its parent's slot until
/// the end-of-step extension turns it into an initializer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Secondary {
    pub particle_id: ParticleId,
    /// Kinetic energy in MeV.
    pub energy:      Real,
    pub dir:         Real3,
}

/// Walk strictly increasing `slots`, handing `take` how many column
/// elements to skip since the previous slot.
pub(crate) fn select<T, I, F>(slots: I, mut take: F) -> impl Iterator<Item = T>
where
    I: IntoIterator<Item = usize>,
    F: FnMut(usize) -> Option<T>,
{
    let mut slots = slots.into_iter();
    let mut next = 0usize;
    std::iter::from_fn(move || {
        let slot = slots.next()?;
        let skip = slot.checked_sub(next)?;
        next = slot + 1;
        take(skip)
    })
}

// ── TrackSlots ────────────────────────────────────────────────────────────────

/// Structure-of-Arrays storage for every track slot.
///
/// All columns have exactly `count` elements and are indexed by
/// `TrackSlotId`.
#[derive(Debug)]
pub struct TrackSlots {
    /// Number of slots.  Equals the length of every column.
    pub count: usize,

    pub sim:      SimStateData,
    pub particle: ParticleStateData,
    pub geo:      GeoStateData,

    /// Per-slot random state, reseeded whenever a new track moves in.
    pub rngs: Vec<TrackRng>,

    /// Secondaries emitted during the current step, per parent slot.
    pub secondaries: Vec<Vec<Secondary>>,
}

impl TrackSlots {
    /// Allocate `count` inactive slots.
    pub fn new(params: &SimParamsData, count: usize) -> CoreResult<Self> {
        let mut sim = SimStateData::default();
        sim.resize(params, count)?;
        let mut particle = ParticleStateData::default();
        particle.resize(count);
        let mut geo = GeoStateData::default();
        geo.resize(count);

        Ok(Self {
            count,
            sim,
            particle,
            geo,
            rngs:        vec![TrackRng::unseeded(); count],
            secondaries: vec![Vec::new(); count],
        })
    }

    /// Iterator over all slot ids in ascending order.
    pub fn slot_ids(&self) -> impl Iterator<Item = TrackSlotId> + '_ {
        (0..self.count as u32).map(TrackSlotId)
    }

    #[inline]
    pub fn status(&self, slot: TrackSlotId) -> TrackStatus {
        self.sim.status[slot.index()]
    }

    /// Number of slots whose status satisfies `pred`.
    pub fn count_status(&self, pred: impl Fn(TrackStatus) -> bool) -> usize {
        self.sim.status.iter().filter(|&&s| pred(s)).count()
    }

    /// One exclusive view per slot, in slot order.
    pub fn views_mut(&mut self) -> impl Iterator<Item = TrackView<'_>> {
        self.sim
            .views_mut()
            .zip(self.particle.views_mut())
            .zip(self.geo.views_mut())
            .zip(self.rngs.iter_mut().zip(self.secondaries.iter_mut()))
            .enumerate()
            .map(|(i, (((sim, particle), geo), (rng, secondaries)))| TrackView {
                slot: TrackSlotId(i as u32),
                sim,
                particle,
                geo,
                rng,
                secondaries,
            })
    }

    /// Exclusive views of `slots` only, in the order given.
    ///
    /// Indices must be strictly increasing.  Iteration stops at the first
    /// index that is not, or that is out of range.  Columns are advanced
    /// with `nth`, so the cost follows the number of selected slots.
    pub fn select_mut<I>(&mut self, slots: I) -> impl Iterator<Item = TrackView<'_>>
    where
        I: IntoIterator<Item = usize>,
        I::IntoIter: Clone,
    {
        let slots = slots.into_iter();
        let mut rngs = self.rngs.iter_mut();
        let mut buffers = self.secondaries.iter_mut();
        let lanes = select(slots.clone(), move |skip| Some((rngs.nth(skip)?, buffers.nth(skip)?)));

        self.sim
            .select_mut(slots.clone())
            .zip(self.particle.select_mut(slots.clone()))
            .zip(self.geo.select_mut(slots.clone()))
            .zip(lanes)
            .zip(slots)
            .map(|((((sim, particle), geo), (rng, secondaries)), i)| TrackView {
                slot: TrackSlotId(i as u32),
                sim,
                particle,
                geo,
                rng,
                secondaries,
            })
    }

    /// Exclusive view of a single slot.
    pub fn view_mut(&mut self, slot: TrackSlotId) -> Option<TrackView<'_>> {
        self.select_mut([slot.index()]).next()
    }

    /// Render one character per slot: `_` inactive, `C` charged, `N` neutral.
    pub fn occupancy_pattern(&self, particles: &ParticleParams) -> String {
        self.sim
            .status
            .iter()
            .zip(&self.particle.particle_id)
            .map(|(status, &pid)| match status {
                TrackStatus::Inactive => '_',
                _ if particles.is_charged(pid) => 'C',
                _ => 'N',
            })
            .collect()
    }

    /// Render each slot's status code (see [`TrackStatus::code`]).
    pub fn status_pattern(&self) -> String {
        self.sim.status.iter().map(|s| s.code()).collect()
    }
}

// ── TrackView ─────────────────────────────────────────────────────────────────

/// Exclusive access to one slot, handed to a single lane of an action launch.
#[derive(Debug)]
pub struct TrackView<'a> {
    pub slot:        TrackSlotId,
    pub sim:         SimView<'a>,
    pub particle:    ParticleView<'a>,
    pub geo:         GeoView<'a>,
    pub rng:         &'a mut TrackRng,
    pub secondaries: &'a mut Vec<Secondary>,
}

impl TrackView<'_> {
    #[inline]
    pub fn status(&self) -> TrackStatus {
        *self.sim.status
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        *self.sim.status == TrackStatus::Alive
    }

    /// Physically expected termination.
    #[inline]
    pub fn kill(&mut self) {
        *self.sim.status = TrackStatus::Killed;
    }

    /// Unexpected per-track failure; other lanes are unaffected.
    #[inline]
    pub fn mark_errored(&mut self) {
        *self.sim.status = TrackStatus::Errored;
    }

    #[inline]
    pub fn energy(&self) -> Real {
        *self.particle.energy
    }

    #[inline]
    pub fn particle_id(&self) -> ParticleId {
        *self.particle.particle_id
    }

    pub fn push_secondary(&mut self, secondary: Secondary) {
        self.secondaries.push(secondary);
    }
}
