//! Queue storage: initializer buffer, vacancy stack, counters, and the
//! pending-primary staging area.

use std::sync::atomic::{AtomicU32, Ordering};

use mc_core::{CoreConfig, EventId, TrackId, TrackOrder, TrackSlotId};

use crate::{InitError, InitResult, Primary, TrackInitializer};

// ── InitParams ────────────────────────────────────────────────────────────────

/// The subset of `CoreConfig` the initializer kernels need.
#[derive(Copy, Clone, Debug)]
pub struct InitParams {
    pub capacity:    usize,
    pub max_events:  usize,
    pub track_order: TrackOrder,
    pub seed:        u64,
}

impl InitParams {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            capacity:    config.initializer_capacity,
            max_events:  config.max_events,
            track_order: config.track_order,
            seed:        config.seed,
        }
    }
}

// ── InitializerBuffer ─────────────────────────────────────────────────────────

/// Fixed-capacity stack of initializers.
///
/// Storage is allocated once; only the running `size` changes.  Pushing past
/// the capacity is reported as [`InitError::Capacity`], never by growing.
#[derive(Debug)]
pub struct InitializerBuffer {
    storage: Vec<TrackInitializer>,
    size:    usize,
}

impl InitializerBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![TrackInitializer::default(); capacity],
            size:    0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Currently queued initializers, oldest first.
    pub fn as_slice(&self) -> &[TrackInitializer] {
        &self.storage[..self.size]
    }

    /// Check that `n` more initializers fit.
    pub fn check_room(&self, n: usize) -> InitResult<()> {
        if self.size + n > self.capacity() {
            return Err(InitError::Capacity {
                capacity:  self.capacity(),
                existing:  self.size,
                requested: n,
            });
        }
        Ok(())
    }

    /// Claim the next `n` entries and return them for writing.
    pub fn grow(&mut self, n: usize) -> InitResult<&mut [TrackInitializer]> {
        self.check_room(n)?;
        let start = self.size;
        self.size += n;
        Ok(&mut self.storage[start..self.size])
    }

    /// Drop everything at or above `len`.
    pub fn truncate(&mut self, len: usize) {
        self.size = self.size.min(len);
    }
}

// ── TrackInitStateData ────────────────────────────────────────────────────────

/// Mutable queue state for one stream.
#[derive(Debug)]
pub struct TrackInitStateData {
    /// Scratch ordering used when pairing initializers with vacancies.
    pub indices: Vec<usize>,

    /// Per-slot secondary counts, exclusive-scanned in place; the final
    /// element holds the total.  Length = slot count + 1.
    pub secondary_counts: Vec<u32>,

    /// Stack of empty slots.  Never longer than the slot count.
    pub vacancies: Vec<TrackSlotId>,

    /// Tracks created so far, per event.  Incremented with fetch-add.
    pub track_counters: Vec<AtomicU32>,

    pub initializers: InitializerBuffer,

    /// Total tracks created (primaries and secondaries).
    pub num_generated: u64,
}

impl TrackInitStateData {
    /// Every slot starts vacant.
    pub fn new(params: &InitParams, num_slots: usize) -> Self {
        let mut vacancies = Vec::with_capacity(num_slots);
        vacancies.extend((0..num_slots as u32).map(TrackSlotId));
        Self {
            indices:          Vec::new(),
            secondary_counts: vec![0; num_slots + 1],
            vacancies,
            track_counters:   (0..params.max_events).map(|_| AtomicU32::new(0)).collect(),
            initializers:     InitializerBuffer::new(params.capacity),
            num_generated:    0,
        }
    }

    #[inline]
    pub fn num_initializers(&self) -> usize {
        self.initializers.len()
    }

    #[inline]
    pub fn num_vacancies(&self) -> usize {
        self.vacancies.len()
    }

    /// Allocate the next track id for `event`.
    ///
    /// Safe to call from many lanes at once; ids within an event are unique
    /// and increase in allocation order.
    #[inline]
    pub fn next_track_id(&self, event: EventId) -> TrackId {
        allocate_track_id(&self.track_counters, event)
    }

    /// Tracks created so far for `event`.
    pub fn tracks_created(&self, event: EventId) -> u32 {
        self.track_counters
            .get(event.index())
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Forget per-event counters, e.g. between independent runs.
    pub fn reset_counters(&mut self) {
        for counter in &mut self.track_counters {
            *counter.get_mut() = 0;
        }
    }
}

/// Fetch-and-add on the counter for `event`; `TrackId::INVALID` if the
/// event has no counter.
#[inline]
pub(crate) fn allocate_track_id(counters: &[AtomicU32], event: EventId) -> TrackId {
    match counters.get(event.index()) {
        Some(counter) => TrackId(counter.fetch_add(1, Ordering::Relaxed)),
        None => TrackId::INVALID,
    }
}

// ── PrimaryStateData ──────────────────────────────────────────────────────────

/// Staging area for one batch of primaries awaiting conversion.
#[derive(Debug, Default)]
pub struct PrimaryStateData {
    pub primaries: Vec<Primary>,
    /// Number of staged primaries still to convert; zero when idle.
    pub count: usize,
}

impl PrimaryStateData {
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.count > 0
    }

    pub fn pending(&self) -> &[Primary] {
        &self.primaries[..self.count]
    }
}
