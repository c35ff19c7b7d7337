//! The physics boundary: processes build models, models become actions.
//!
//! The core never looks inside a model.  It asks for applicability ranges
//! and tabulated interaction rates once at setup, uses them to pick a step
//! length and a model per track in the pre-step, and later hands the chosen
//! model each of its tracks through [`ModelAction`].

use std::sync::Arc;

use mc_core::{ActionId, CoreError, CoreResult, ParticleId, Real, Real3};
use mc_track::TrackView;
use rustc_hash::FxHashMap;

use crate::{Action, ActionIdIter, ActionOrder, ActionResult, CoreParams, CoreState, Host};
use mc_sort::ActionKey;

// ── Applicability ─────────────────────────────────────────────────────────────

/// A particle and the half-open kinetic-energy range `[lower, upper)` (MeV)
/// over which a model applies.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Applicability {
    pub particle: ParticleId,
    pub lower:    Real,
    pub upper:    Real,
}

impl Applicability {
    pub fn new(particle: ParticleId, lower: Real, upper: Real) -> Self {
        Self { particle, lower, upper }
    }

    #[inline]
    pub fn contains(&self, particle: ParticleId, energy: Real) -> bool {
        particle == self.particle && energy >= self.lower && energy < self.upper
    }
}

// ── XsGrid ────────────────────────────────────────────────────────────────────

/// Interaction rate tabulated on an increasing energy grid.
///
/// Values are per unit length (1/cm).  Between points the rate is linearly
/// interpolated; outside the grid it is zero.
#[derive(Clone, PartialEq, Debug)]
pub struct XsGrid {
    energy: Vec<Real>,
    xs:     Vec<Real>,
}

impl XsGrid {
    pub fn new(energy: Vec<Real>, xs: Vec<Real>) -> CoreResult<Self> {
        if energy.len() != xs.len() || energy.is_empty() {
            return Err(CoreError::Validation(format!(
                "cross section grid needs matching non-empty columns (got {} energies, {} values)",
                energy.len(),
                xs.len()
            )));
        }
        if energy.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(CoreError::Validation(
                "cross section energies must be strictly increasing".into(),
            ));
        }
        if xs.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(CoreError::Validation(
                "cross section values must be finite and non-negative".into(),
            ));
        }
        Ok(Self { energy, xs })
    }

    /// The same rate at both ends of `[lower, upper]`.
    pub fn constant(lower: Real, upper: Real, value: Real) -> Self {
        Self { energy: vec![lower, upper], xs: vec![value, value] }
    }

    pub fn lower(&self) -> Real {
        self.energy[0]
    }

    pub fn upper(&self) -> Real {
        self.energy[self.energy.len() - 1]
    }

    pub fn interpolate(&self, energy: Real) -> Real {
        if !(energy >= self.lower() && energy <= self.upper()) {
            return 0.0;
        }
        // First grid point strictly above `energy`.
        let hi = self.energy.partition_point(|&e| e <= energy);
        if hi == self.energy.len() {
            return self.xs[hi - 1];
        }
        let lo = hi - 1;
        let frac = (energy - self.energy[lo]) / (self.energy[hi] - self.energy[lo]);
        self.xs[lo] + frac * (self.xs[hi] - self.xs[lo])
    }
}

// ── Interaction ───────────────────────────────────────────────────────────────

/// Outcome of one model interaction.  Secondaries are pushed straight onto
/// the track's buffer by the model.
#[derive(Clone, PartialEq, Debug)]
pub enum Interaction {
    /// Nothing changed (e.g. a rejected sample).
    Unchanged,
    Scattered { energy: Real, dir: Real3 },
    /// The track deposits everything and stops.
    Absorbed,
    /// The model could not produce a valid final state.
    Failed,
}

// ── Model / Process ───────────────────────────────────────────────────────────

pub trait Model: Send + Sync + 'static {
    fn action_id(&self) -> ActionId;
    fn label(&self) -> &str;
    fn description(&self) -> &str;

    /// Particle/energy ranges this model covers.
    fn applicability(&self) -> Vec<Applicability>;

    /// Interaction rate over one applicability range.
    fn micro_xs(&self, applic: &Applicability) -> XsGrid;

    /// Sample an interaction for one alive track.
    fn interact(&self, track: &mut TrackView<'_>) -> Interaction;
}

pub trait Process: Send + Sync {
    fn label(&self) -> &str;

    /// Build this process's models, numbering them with consecutive ids
    /// from `ids`.
    fn build_models(&self, ids: &mut ActionIdIter) -> Vec<Arc<dyn Model>>;
}

// ── ModelAction ───────────────────────────────────────────────────────────────

/// Runs one model on every alive track that selected it as its post-step
/// action.
pub struct ModelAction {
    model: Arc<dyn Model>,
}

impl ModelAction {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }
}

impl Action for ModelAction {
    fn action_id(&self) -> ActionId {
        self.model.action_id()
    }

    fn label(&self) -> &str {
        self.model.label()
    }

    fn description(&self) -> &str {
        self.model.description()
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Post
    }

    fn step_host(&self, _params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        let model = &*self.model;
        state.launch_action(self.action_id(), ActionKey::PostStep, |_, track| {
            if !track.is_alive() {
                return;
            }
            match model.interact(track) {
                Interaction::Unchanged => {}
                Interaction::Scattered { energy, dir } => {
                    *track.particle.energy = energy;
                    *track.geo.dir = dir;
                }
                Interaction::Absorbed => {
                    *track.particle.energy = 0.0;
                    track.kill();
                }
                Interaction::Failed => track.mark_errored(),
            }
        });
        Ok(())
    }
}

// ── PhysicsParams ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct ModelXs {
    action: ActionId,
    applic: Applicability,
    xs:     XsGrid,
}

/// Per-particle interaction tables assembled from every registered model.
#[derive(Default)]
pub struct PhysicsParams {
    models: Vec<Arc<dyn Model>>,
    tables: FxHashMap<ParticleId, Vec<ModelXs>>,
}

impl PhysicsParams {
    /// Query each model's applicability and rate tables once.
    pub fn new(models: Vec<Arc<dyn Model>>) -> Self {
        let mut tables: FxHashMap<ParticleId, Vec<ModelXs>> = FxHashMap::default();
        for model in &models {
            for applic in model.applicability() {
                let xs = model.micro_xs(&applic);
                tables.entry(applic.particle).or_default().push(ModelXs {
                    action: model.action_id(),
                    applic,
                    xs,
                });
            }
        }
        Self { models, tables }
    }

    pub fn models(&self) -> &[Arc<dyn Model>] {
        &self.models
    }

    pub fn num_models(&self) -> usize {
        self.models.len()
    }

    fn applicable(&self, particle: ParticleId, energy: Real) -> impl Iterator<Item = (ActionId, Real)> + '_ {
        self.tables
            .get(&particle)
            .into_iter()
            .flatten()
            .filter(move |m| m.applic.contains(particle, energy))
            .map(move |m| (m.action, m.xs.interpolate(energy)))
    }

    /// Summed interaction rate of every model applicable at `energy`.
    pub fn total_xs(&self, particle: ParticleId, energy: Real) -> Real {
        self.applicable(particle, energy).map(|(_, xs)| xs).sum()
    }

    /// Pick a model with probability proportional to its rate.  `u` is a
    /// uniform sample in `[0, 1)`.  `INVALID` when nothing applies.
    pub fn sample_model(&self, particle: ParticleId, energy: Real, u: Real) -> ActionId {
        let total = self.total_xs(particle, energy);
        if !(total > 0.0) {
            return ActionId::INVALID;
        }
        let target = u * total;
        let mut acc = 0.0;
        let mut last = ActionId::INVALID;
        for (action, xs) in self.applicable(particle, energy) {
            if xs <= 0.0 {
                continue;
            }
            acc += xs;
            last = action;
            if target < acc {
                return action;
            }
        }
        last
    }
}

impl std::fmt::Debug for PhysicsParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsParams")
            .field("models", &self.models.iter().map(|m| m.label()).collect::<Vec<_>>())
            .field("tables", &self.tables)
            .finish()
    }
}
