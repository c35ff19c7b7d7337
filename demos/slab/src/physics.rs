//! Toy electromagnetic physics for the slab demo.
//!
//! Rates are order-of-magnitude numbers for water, not evaluated data.
//! The point is to exercise secondaries, absorption, and energy loss.

use std::sync::Arc;

use mc_action::{ActionIdIter, Applicability, Interaction, Model, Process, XsGrid};
use mc_core::{ActionId, CoreResult, ParticleId, Real, Real3};
use mc_track::{Secondary, TrackView};

pub const GAMMA:    ParticleId = ParticleId(0);
pub const ELECTRON: ParticleId = ParticleId(1);

const ELECTRON_MASS: Real = 0.510_998_95; // MeV
const MIN_ENERGY:    Real = 1e-2;         // MeV
const MAX_ENERGY:    Real = 100.0;        // MeV
const GRID_POINTS:   usize = 64;

/// Log-spaced energies spanning `[MIN_ENERGY, MAX_ENERGY]`.
fn log_grid() -> Vec<Real> {
    let (lo, hi) = (MIN_ENERGY.ln(), MAX_ENERGY.ln());
    let delta = (hi - lo) / (GRID_POINTS - 1) as Real;
    (0..GRID_POINTS).map(|i| (lo + delta * i as Real).exp()).collect()
}

fn tabulate(f: impl Fn(Real) -> Real) -> CoreResult<XsGrid> {
    let energy = log_grid();
    let xs = energy.iter().map(|&e| f(e)).collect();
    XsGrid::new(energy, xs)
}

fn normalize(v: Real3) -> Option<Real3> {
    let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    (norm > 0.0 && norm.is_finite()).then(|| [v[0] / norm, v[1] / norm, v[2] / norm])
}

/// Rotate unit vector `dir` by polar angle `acos(cost)` and azimuth `phi`.
fn rotate(dir: Real3, cost: Real, phi: Real) -> Real3 {
    let sint = (1.0 - cost * cost).max(0.0).sqrt();
    let (sinp, cosp) = phi.sin_cos();
    let [ux, uy, uz] = dir;
    let perp = (ux * ux + uy * uy).sqrt();
    if perp < 1e-12 {
        let sign = uz.signum();
        return [sint * cosp, sint * sinp, sign * cost];
    }
    [
        ux * cost + sint * (ux * uz * cosp - uy * sinp) / perp,
        uy * cost + sint * (uy * uz * cosp + ux * sinp) / perp,
        uz * cost - sint * perp * cosp,
    ]
}

// ── Compton scattering ────────────────────────────────────────────────────────

/// Incoherent photon scattering.  The outgoing energy fraction is sampled
/// uniformly over its kinematic range; the electron takes the remainder
/// along the momentum difference.
pub struct Compton {
    xs: XsGrid,
}

impl Compton {
    /// Rate at 1 MeV, 1/cm.
    const XS_AT_MEV: Real = 0.0707;

    pub fn new() -> CoreResult<Self> {
        let xs = tabulate(|e| {
            let k = e / ELECTRON_MASS;
            let k1 = 1.0 / ELECTRON_MASS;
            Self::XS_AT_MEV * (1.0 + 2.0 * k1) / (1.0 + 2.0 * k)
        })?;
        Ok(Self { xs })
    }
}

impl Process for Compton {
    fn label(&self) -> &str {
        "compton"
    }

    fn build_models(&self, ids: &mut ActionIdIter) -> Vec<Arc<dyn Model>> {
        ids.next()
            .map(|id| Arc::new(ComptonModel { id, xs: self.xs.clone() }) as Arc<dyn Model>)
            .into_iter()
            .collect()
    }
}

struct ComptonModel {
    id: ActionId,
    xs: XsGrid,
}

impl Model for ComptonModel {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        "scat-compton"
    }

    fn description(&self) -> &str {
        "toy incoherent photon scattering"
    }

    fn applicability(&self) -> Vec<Applicability> {
        vec![Applicability::new(GAMMA, MIN_ENERGY, MAX_ENERGY)]
    }

    fn micro_xs(&self, _applic: &Applicability) -> XsGrid {
        self.xs.clone()
    }

    fn interact(&self, track: &mut TrackView<'_>) -> Interaction {
        let energy = track.energy();
        let dir = *track.geo.dir;
        let k = energy / ELECTRON_MASS;

        let eps_min = 1.0 / (1.0 + 2.0 * k);
        let eps = track.rng.gen_range(eps_min..=1.0);
        let cost = (1.0 - (1.0 / eps - 1.0) / k).clamp(-1.0, 1.0);
        let phi = track.rng.gen_range(0.0..std::f64::consts::TAU);
        let scattered = rotate(dir, cost, phi);

        let out = eps * energy;
        let electron_energy = energy - out;
        let recoil = [
            energy * dir[0] - out * scattered[0],
            energy * dir[1] - out * scattered[1],
            energy * dir[2] - out * scattered[2],
        ];
        if electron_energy > 0.0 {
            if let Some(edir) = normalize(recoil) {
                track.push_secondary(Secondary {
                    particle_id: ELECTRON,
                    energy:      electron_energy,
                    dir:         edir,
                });
            }
        }

        Interaction::Scattered { energy: out, dir: scattered }
    }
}

// ── Photoelectric absorption ──────────────────────────────────────────────────

/// Photon absorption with a single photoelectron carrying all the energy.
pub struct Photoelectric {
    xs: XsGrid,
}

impl Photoelectric {
    /// `XS_SCALE / E³`, capped at `XS_CAP` (1/cm).
    const XS_SCALE: Real = 2.0e-5;
    const XS_CAP:   Real = 20.0;

    pub fn new() -> CoreResult<Self> {
        let xs = tabulate(|e| (Self::XS_SCALE / (e * e * e)).min(Self::XS_CAP))?;
        Ok(Self { xs })
    }
}

impl Process for Photoelectric {
    fn label(&self) -> &str {
        "photoelectric"
    }

    fn build_models(&self, ids: &mut ActionIdIter) -> Vec<Arc<dyn Model>> {
        ids.next()
            .map(|id| Arc::new(PhotoelectricModel { id, xs: self.xs.clone() }) as Arc<dyn Model>)
            .into_iter()
            .collect()
    }
}

struct PhotoelectricModel {
    id: ActionId,
    xs: XsGrid,
}

impl Model for PhotoelectricModel {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        "photoel-absorb"
    }

    fn description(&self) -> &str {
        "toy photoelectric absorption"
    }

    fn applicability(&self) -> Vec<Applicability> {
        vec![Applicability::new(GAMMA, MIN_ENERGY, MAX_ENERGY)]
    }

    fn micro_xs(&self, _applic: &Applicability) -> XsGrid {
        self.xs.clone()
    }

    fn interact(&self, track: &mut TrackView<'_>) -> Interaction {
        let energy = track.energy();
        let dir = track.rng.isotropic();
        track.push_secondary(Secondary { particle_id: ELECTRON, energy, dir });
        Interaction::Absorbed
    }
}

// ── Ionization ────────────────────────────────────────────────────────────────

/// Discrete electron energy loss: every interaction removes a fixed
/// fraction of the kinetic energy and keeps the direction.
pub struct Ionization {
    pub xs:            Real,
    pub loss_fraction: Real,
}

impl Default for Ionization {
    fn default() -> Self {
        Self { xs: 5.0, loss_fraction: 0.2 }
    }
}

impl Process for Ionization {
    fn label(&self) -> &str {
        "ionization"
    }

    fn build_models(&self, ids: &mut ActionIdIter) -> Vec<Arc<dyn Model>> {
        ids.next()
            .map(|id| {
                Arc::new(IonizationModel {
                    id,
                    xs:            self.xs,
                    loss_fraction: self.loss_fraction,
                }) as Arc<dyn Model>
            })
            .into_iter()
            .collect()
    }
}

struct IonizationModel {
    id:            ActionId,
    xs:            Real,
    loss_fraction: Real,
}

impl Model for IonizationModel {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        "eloss-ioni"
    }

    fn description(&self) -> &str {
        "toy electron ionization"
    }

    fn applicability(&self) -> Vec<Applicability> {
        vec![Applicability::new(ELECTRON, 0.0, MAX_ENERGY)]
    }

    fn micro_xs(&self, applic: &Applicability) -> XsGrid {
        XsGrid::constant(applic.lower, applic.upper, self.xs)
    }

    fn interact(&self, track: &mut TrackView<'_>) -> Interaction {
        let energy = track.energy() * (1.0 - self.loss_fraction);
        Interaction::Scattered { energy, dir: *track.geo.dir }
    }
}
