//! Along-step transport: move tracks by their selected step length.
//!
//! The propagator is the only part that knows how a track moves between
//! points.  Neutral tracks always use [`LinearPropagator`]; charged tracks
//! use whatever the stepper was built with.

use std::sync::Arc;

use mc_action::{Action, ActionOrder, ActionResult, CoreParams, CoreState, Host};
use mc_core::{ActionId, Real, Real3};
use mc_sort::ActionKey;
use mc_track::{ParticleDef, TrackView};

/// Track curvature in 1/cm for a unit charge with 1 MeV/c momentum in a
/// 1 T field.
pub const CURVATURE_PER_TESLA: Real = 2.997_924_58;

// ── Propagator ────────────────────────────────────────────────────────────────

/// Result of one propagation.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Propagation {
    /// Path length actually travelled (cm).
    pub distance: Real,
    /// The propagator gave up before covering the requested step.
    pub looping:  bool,
}

/// Moves a single track along its path.
pub trait Propagator: Send + Sync + 'static {
    fn label(&self) -> &str;

    /// Advance the track's position and direction by up to `step` cm.
    fn propagate(&self, particle: &ParticleDef, track: &mut TrackView<'_>, step: Real) -> Propagation;
}

/// Straight-line motion; never loops.
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearPropagator;

impl Propagator for LinearPropagator {
    fn label(&self) -> &str {
        "linear"
    }

    fn propagate(&self, _particle: &ParticleDef, track: &mut TrackView<'_>, step: Real) -> Propagation {
        track.geo.move_by(step);
        Propagation { distance: step, looping: false }
    }
}

/// Charged motion in a uniform magnetic field.
///
/// The path is integrated in substeps that turn the direction by at most
/// [`Self::MAX_SUBSTEP_ANGLE`] each, using the Boris rotation so the
/// direction stays a unit vector.  A step that would need more than
/// `max_substeps` substeps is cut short and reported as looping.
#[derive(Copy, Clone, Debug)]
pub struct UniformFieldPropagator {
    /// Field in tesla.
    pub field:        Real3,
    pub max_substeps: u32,
}

impl UniformFieldPropagator {
    /// Radians.
    pub const MAX_SUBSTEP_ANGLE: Real = 0.25;

    pub fn new(field: Real3) -> Self {
        Self { field, max_substeps: 100 }
    }

    pub fn max_substeps(mut self, n: u32) -> Self {
        self.max_substeps = n.max(1);
        self
    }

    fn field_strength(&self) -> Real {
        norm(&self.field)
    }
}

impl Propagator for UniformFieldPropagator {
    fn label(&self) -> &str {
        "uniform-field"
    }

    fn propagate(&self, particle: &ParticleDef, track: &mut TrackView<'_>, step: Real) -> Propagation {
        let energy = track.energy();
        let momentum = (energy * (energy + 2.0 * particle.mass)).sqrt();
        let bmag = self.field_strength();
        if particle.charge == 0.0 || bmag == 0.0 || !(momentum > 0.0) {
            return LinearPropagator.propagate(particle, track, step);
        }

        // Rotation per unit path length, signed by charge.
        let k = particle.charge * CURVATURE_PER_TESLA / momentum;
        let substep = Self::MAX_SUBSTEP_ANGLE / (k.abs() * bmag);
        let needed = (step / substep).ceil();
        let (distance, looping) = if needed > self.max_substeps as Real {
            (substep * self.max_substeps as Real, true)
        } else {
            (step, false)
        };

        let mut remaining = distance;
        while remaining > 0.0 {
            let h = remaining.min(substep);
            boris_rotate(track.geo.dir, &self.field, 0.5 * k * h);
            track.geo.move_by(h);
            remaining -= h;
        }
        Propagation { distance, looping }
    }
}

/// Rotate unit vector `d` about `field` by the Boris scheme with
/// `t = field * half_angle_per_tesla`.
fn boris_rotate(d: &mut Real3, field: &Real3, half_angle_per_tesla: Real) {
    let t = [
        field[0] * half_angle_per_tesla,
        field[1] * half_angle_per_tesla,
        field[2] * half_angle_per_tesla,
    ];
    let t2 = t[0] * t[0] + t[1] * t[1] + t[2] * t[2];
    let s = t.map(|c| 2.0 * c / (1.0 + t2));

    let dt = cross(d, &t);
    let prime = [d[0] + dt[0], d[1] + dt[1], d[2] + dt[2]];
    let ps = cross(&prime, &s);
    for i in 0..3 {
        d[i] += ps[i];
    }
}

fn cross(a: &Real3, b: &Real3) -> Real3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: &Real3) -> Real {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

// ── AlongStepAction ───────────────────────────────────────────────────────────

/// Moves every alive track that selected this action, advances its clock,
/// and applies the particle's looping policy.
///
/// A track that stops short of its step (because the propagator flagged it
/// as looping) does not reach its planned interaction, so its post-step
/// action becomes the propagation limit.  Too many consecutive looping steps
/// send it to the tracking cut.
pub struct AlongStepAction {
    id:         ActionId,
    label:      &'static str,
    propagator: Arc<dyn Propagator>,
}

impl AlongStepAction {
    pub const NEUTRAL_LABEL: &'static str = "along-step-neutral";
    pub const CHARGED_LABEL: &'static str = "along-step-charged";

    pub fn neutral(id: ActionId) -> Self {
        Self { id, label: Self::NEUTRAL_LABEL, propagator: Arc::new(LinearPropagator) }
    }

    pub fn charged(id: ActionId, propagator: Arc<dyn Propagator>) -> Self {
        Self { id, label: Self::CHARGED_LABEL, propagator }
    }

    pub fn propagator(&self) -> &dyn Propagator {
        &*self.propagator
    }
}

impl Action for AlongStepAction {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        self.label
    }

    fn description(&self) -> &str {
        "propagate tracks along their selected step"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Along
    }

    fn step_host(&self, params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        let propagator = &*self.propagator;
        state.launch_action(self.id, ActionKey::AlongStep, |_, track| {
            along_step(params, propagator, track);
        });
        Ok(())
    }
}

fn along_step(params: &CoreParams, propagator: &dyn Propagator, track: &mut TrackView<'_>) {
    if !track.is_alive() {
        return;
    }
    let particle = track.particle_id();
    let Some(def) = params.particles.get(particle) else {
        track.mark_errored();
        return;
    };

    let step = *track.sim.step_length;
    let moved = propagator.propagate(def, track, step);
    *track.sim.step_length = moved.distance;

    let energy = track.energy();
    let speed = params.particles.speed(particle, energy);
    if speed > 0.0 {
        *track.sim.time += moved.distance / speed;
    }

    if moved.distance < step {
        *track.sim.post_step_action = params.scalars.propagation_limit_action;
    }

    if let Some(threshold) = params.sim.looping_for(particle) {
        if let Some(count) = track.sim.num_looping_steps.as_deref_mut() {
            if moved.looping {
                *count += 1;
                if threshold.exceeded(*count, energy) {
                    *track.sim.post_step_action = params.scalars.tracking_cut_action;
                }
            } else {
                *count = 0;
            }
        }
    }
}
