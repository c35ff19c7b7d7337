//! Particle definitions and per-slot particle state.

use mc_core::{CoreError, CoreResult, ParticleId, Real, SPEED_OF_LIGHT};

use crate::store::select;

/// Static properties of one particle species.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleDef {
    pub label:  String,
    pub pdg:    i32,
    /// Charge in units of the elementary charge.
    pub charge: Real,
    /// Rest mass in MeV.
    pub mass:   Real,
}

impl ParticleDef {
    pub fn new(label: impl Into<String>, pdg: i32, charge: Real, mass: Real) -> Self {
        Self { label: label.into(), pdg, charge, mass }
    }
}

/// Read-only particle table indexed by `ParticleId`.
#[derive(Clone, Debug, Default)]
pub struct ParticleParams {
    defs: Vec<ParticleDef>,
}

impl ParticleParams {
    /// Build from definitions; labels must be unique.
    pub fn new(defs: Vec<ParticleDef>) -> CoreResult<Self> {
        for (i, def) in defs.iter().enumerate() {
            if defs[..i].iter().any(|d| d.label == def.label) {
                return Err(CoreError::Validation(format!(
                    "duplicate particle label '{}'",
                    def.label
                )));
            }
            if def.mass < 0.0 {
                return Err(CoreError::Validation(format!(
                    "particle '{}' has negative mass",
                    def.label
                )));
            }
        }
        Ok(Self { defs })
    }

    /// Photon, electron, and positron: enough for most tests and demos.
    pub fn standard_em() -> Self {
        Self {
            defs: vec![
                ParticleDef::new("gamma", 22, 0.0, 0.0),
                ParticleDef::new("e-", 11, -1.0, 0.510_998_95),
                ParticleDef::new("e+", -11, 1.0, 0.510_998_95),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// `true` if `id` refers to a defined particle.
    #[inline]
    pub fn contains(&self, id: ParticleId) -> bool {
        id.is_valid() && id.index() < self.defs.len()
    }

    pub fn get(&self, id: ParticleId) -> Option<&ParticleDef> {
        self.defs.get(id.index())
    }

    /// Look up a particle by label; `ParticleId::INVALID` if absent.
    pub fn find(&self, label: &str) -> ParticleId {
        self.defs
            .iter()
            .position(|d| d.label == label)
            .and_then(|i| ParticleId::try_from(i).ok())
            .unwrap_or(ParticleId::INVALID)
    }

    /// Iterator over all defined particle ids.
    pub fn ids(&self) -> impl Iterator<Item = ParticleId> + '_ {
        (0..self.defs.len() as u32).map(ParticleId)
    }

    #[inline]
    pub fn is_charged(&self, id: ParticleId) -> bool {
        self.get(id).is_some_and(|d| d.charge != 0.0)
    }

    /// Speed in cm/ns for a given kinetic energy.
    pub fn speed(&self, id: ParticleId, energy: Real) -> Real {
        match self.get(id) {
            Some(d) if d.mass > 0.0 => {
                let gamma = 1.0 + energy / d.mass;
                SPEED_OF_LIGHT * (1.0 - 1.0 / (gamma * gamma)).max(0.0).sqrt()
            }
            _ => SPEED_OF_LIGHT,
        }
    }
}

// ── ParticleStateData ─────────────────────────────────────────────────────────

/// Per-slot particle species and kinetic energy (MeV).
#[derive(Clone, Debug, Default)]
pub struct ParticleStateData {
    pub particle_id: Vec<ParticleId>,
    pub energy:      Vec<Real>,
}

impl ParticleStateData {
    pub fn resize(&mut self, size: usize) {
        self.particle_id = vec![ParticleId::INVALID; size];
        self.energy      = vec![0.0; size];
    }

    pub fn views_mut(&mut self) -> impl Iterator<Item = ParticleView<'_>> {
        self.particle_id
            .iter_mut()
            .zip(self.energy.iter_mut())
            .map(|(particle_id, energy)| ParticleView { particle_id, energy })
    }

    pub fn select_mut<I>(&mut self, slots: I) -> impl Iterator<Item = ParticleView<'_>>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut particle_id = self.particle_id.iter_mut();
        let mut energy = self.energy.iter_mut();
        select(slots, move |skip| {
            Some(ParticleView { particle_id: particle_id.nth(skip)?, energy: energy.nth(skip)? })
        })
    }
}

/// Exclusive borrow of one slot's particle columns.
#[derive(Debug)]
pub struct ParticleView<'a> {
    pub particle_id: &'a mut ParticleId,
    pub energy:      &'a mut Real,
}
