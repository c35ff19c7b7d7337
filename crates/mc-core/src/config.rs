//! Run configuration.
//!
//! `CoreConfig` is built once by the driver (in code or from a JSON file with
//! the `serde` feature) and passed explicitly through setup.  Nothing in the
//! stepping path reads environment variables or global state.

use std::fmt;

use crate::{CoreError, CoreResult, Real};

// ── TrackOrder ────────────────────────────────────────────────────────────────

/// How the thread → slot mapping is arranged each step.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrackOrder {
    /// Identity mapping; slots are processed in storage order.
    #[default]
    Unsorted,
    /// Neutral tracks are initialized into low slots, charged into high slots.
    PartitionCharge,
    /// Randomly permute the mapping at the start of every step.
    Shuffle,
    /// Active slots before inactive ones.
    PartitionStatus,
    /// Group threads by particle species.
    SortParticleType,
    /// Group threads by selected along-step action.
    SortAlongStepAction,
    /// Group threads by selected post-step action.
    SortStepLimitAction,
    /// Sort by along-step action, then again by post-step action.
    SortBothAction,
}

impl TrackOrder {
    /// Reorders the mapping at `sort_start`.
    pub fn sorts_at_start(self) -> bool {
        matches!(self, Self::Shuffle | Self::PartitionStatus | Self::SortParticleType)
    }

    /// Reorders the mapping just before the along-step bucket.
    pub fn sorts_along(self) -> bool {
        matches!(self, Self::SortAlongStepAction | Self::SortBothAction)
    }

    /// Reorders the mapping just before the post-step bucket.
    pub fn sorts_post(self) -> bool {
        matches!(self, Self::SortStepLimitAction | Self::SortBothAction)
    }
}

impl fmt::Display for TrackOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unsorted            => "unsorted",
            Self::PartitionCharge     => "partition-charge",
            Self::Shuffle             => "shuffle",
            Self::PartitionStatus     => "partition-status",
            Self::SortParticleType    => "sort-particle-type",
            Self::SortAlongStepAction => "sort-along-step-action",
            Self::SortStepLimitAction => "sort-step-limit-action",
            Self::SortBothAction      => "sort-both-action",
        };
        f.write_str(s)
    }
}

// ── CoreConfig ────────────────────────────────────────────────────────────────

/// Top-level configuration for one transport stream.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoreConfig {
    /// Number of track slots (the width of every SoA column).
    pub num_track_slots: usize,

    /// Fixed size of the initializer buffer.  Exceeding it is fatal.
    pub initializer_capacity: usize,

    /// Number of distinct events whose track counters are kept.
    pub max_events: usize,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,

    /// Worker threads for the host executor with the `parallel` feature.
    /// `None` uses Rayon's global pool; `Some(1)` runs serially.
    pub num_threads: Option<usize>,

    /// Maximum number of loop iterations in `Stepper::run`.
    pub max_steps: u64,

    /// Thread → slot mapping policy.
    pub track_order: TrackOrder,

    /// Tracks below this kinetic energy (MeV) are killed by the tracking cut.
    pub energy_cutoff: Real,

    /// Accumulate wall-clock time per action.
    pub action_times: bool,

    /// Register the per-action, per-particle post-step counter.
    pub action_diagnostic: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            num_track_slots:      64,
            initializer_capacity: 1024,
            max_events:           16,
            seed:                 12345,
            num_threads:          Some(1),
            max_steps:            100_000,
            track_order:          TrackOrder::Unsorted,
            energy_cutoff:        1e-3,
            action_times:         false,
            action_diagnostic:    false,
        }
    }
}

impl CoreConfig {
    /// Check sizes and limits before any state is allocated.
    pub fn validate(&self) -> CoreResult<()> {
        if self.num_track_slots == 0 {
            return Err(CoreError::Config("num_track_slots must be positive".into()));
        }
        if u32::try_from(self.num_track_slots).is_err() {
            return Err(CoreError::Config(format!(
                "num_track_slots {} exceeds the slot id range",
                self.num_track_slots
            )));
        }
        if self.initializer_capacity == 0 {
            return Err(CoreError::Config("initializer_capacity must be positive".into()));
        }
        if self.max_events == 0 {
            return Err(CoreError::Config("max_events must be positive".into()));
        }
        if self.max_steps == 0 {
            return Err(CoreError::Config("max_steps must be positive".into()));
        }
        if self.num_threads == Some(0) {
            return Err(CoreError::Config("num_threads must be positive when set".into()));
        }
        if self.energy_cutoff.is_nan() || self.energy_cutoff < 0.0 {
            return Err(CoreError::Config(format!(
                "energy_cutoff must be non-negative (got {})",
                self.energy_cutoff
            )));
        }
        Ok(())
    }
}
