//! Deterministic per-track RNG.
//!
//! # Determinism strategy
//!
//! A track's RNG is (re)seeded when the track is written into a slot:
//!
//!   seed = global_seed XOR (event_id * MIXING_CONSTANT) XOR rotl(track_id * MIXING_CONSTANT, 32)
//!
//! The seed depends only on the track's identity, never on the slot it lands
//! in or the thread that steps it.  Sorting, shuffling, and parallel
//! execution therefore leave results unchanged.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::{EventId, TrackId};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-slot random state.
///
/// Stored in a parallel `Vec<TrackRng>` beside the other SoA columns; each
/// lane of an action launch gets exclusive `&mut` access to its own entry.
#[derive(Clone, Debug)]
pub struct TrackRng(SmallRng);

impl TrackRng {
    /// Seed from the run's global seed and the owning track's identity.
    pub fn new(global_seed: u64, event: EventId, track: TrackId) -> Self {
        let e = (event.0 as u64).wrapping_mul(MIXING_CONSTANT);
        let t = (track.0 as u64).wrapping_mul(MIXING_CONSTANT).rotate_left(32);
        TrackRng(SmallRng::seed_from_u64(global_seed ^ e ^ t))
    }

    /// Placeholder state for slots that hold no track.
    pub fn unseeded() -> Self {
        TrackRng(SmallRng::seed_from_u64(0))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Uniform sample in `[0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// Sample a distance from an exponential distribution with the given
    /// mean free path inverse (`xs`, in 1/length).  Returns `f64::INFINITY`
    /// for a non-positive `xs`.
    #[inline]
    pub fn exponential(&mut self, xs: f64) -> f64 {
        if xs <= 0.0 {
            return f64::INFINITY;
        }
        // 1 - u lies in (0, 1], so the log is finite.
        -(1.0 - self.uniform()).ln() / xs
    }

    /// Isotropic unit vector.
    pub fn isotropic(&mut self) -> [f64; 3] {
        let cost: f64 = self.gen_range(-1.0..=1.0);
        let phi: f64 = self.gen_range(0.0..std::f64::consts::TAU);
        let sint = (1.0 - cost * cost).max(0.0).sqrt();
        [sint * phi.cos(), sint * phi.sin(), cost]
    }
}

/// Deterministic random state for host-side setup work (shuffling the
/// thread mapping, sampling toy sources) that is not tied to one track.
#[derive(Debug)]
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child `SimRng` with a different seed offset.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        SimRng(SmallRng::seed_from_u64(child_seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Shuffle a mutable slice in-place (Fisher-Yates).
    #[inline]
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.0);
    }
}
