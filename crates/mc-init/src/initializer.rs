//! Descriptors for tracks that exist but do not yet occupy a slot.

use mc_core::{EventId, ParticleId, PrimaryId, Real, Real3, TrackId};

/// An externally supplied source particle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Primary {
    pub particle_id: ParticleId,
    /// Kinetic energy in MeV.
    pub energy:      Real,
    pub position:    Real3,
    pub direction:   Real3,
    /// Lab-frame time in ns.
    pub time:        Real,
    pub event_id:    EventId,
    pub primary_id:  PrimaryId,
    pub weight:      Real,
}

/// Identity and bookkeeping part of an initializer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimTrackInitializer {
    pub track_id:   TrackId,
    pub parent_id:  TrackId,
    pub primary_id: PrimaryId,
    pub event_id:   EventId,
    pub time:       Real,
    pub weight:     Real,
}

impl SimTrackInitializer {
    /// Both the track and event ids are set.  Invalid initializers are never
    /// consumed.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.track_id.is_valid() && self.event_id.is_valid()
    }
}

impl Default for SimTrackInitializer {
    fn default() -> Self {
        Self {
            track_id:   TrackId::INVALID,
            parent_id:  TrackId::INVALID,
            primary_id: PrimaryId::INVALID,
            event_id:   EventId::INVALID,
            time:       0.0,
            weight:     1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoTrackInitializer {
    pub pos: Real3,
    pub dir: Real3,
}

impl Default for GeoTrackInitializer {
    fn default() -> Self {
        Self { pos: [0.0; 3], dir: [0.0, 0.0, 1.0] }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct ParticleTrackInitializer {
    pub particle_id: ParticleId,
    pub energy:      Real,
}

/// Everything needed to write a track into an empty slot.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct TrackInitializer {
    pub sim:      SimTrackInitializer,
    pub geo:      GeoTrackInitializer,
    pub particle: ParticleTrackInitializer,
}
