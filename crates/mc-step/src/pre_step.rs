//! The pre-step: promote new tracks and choose what limits this step.

use mc_action::{Action, ActionOrder, ActionResult, CoreParams, CoreState, Host};
use mc_core::{ActionId, Real};
use mc_track::{Navigator, TrackStatus, TrackView};

/// Selects each alive track's step length, along-step action, and post-step
/// action.
///
/// For every active, non-dead track:
///
/// 1. `Initializing` becomes `Alive`; `num_steps` is incremented.
/// 2. The along-step action is picked by charge.
/// 3. Tracks below `CoreConfig::energy_cutoff`, or past
///    `SimParamsData::max_steps`, are sent to the tracking cut with a zero
///    step.
/// 4. Otherwise the physics step is sampled from the total interaction rate
///    and compared to the distance to the next boundary; the shorter one
///    wins and names the post-step action.
///
/// A track for which neither physics nor geometry limits the step can never
/// finish; it is marked errored and handed to the tracking cut.  Every
/// track leaves with a valid action in both columns.
pub struct PreStepAction {
    id: ActionId,
}

impl PreStepAction {
    pub const LABEL: &'static str = "pre-step";

    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for PreStepAction {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        Self::LABEL
    }

    fn description(&self) -> &str {
        "select the step limit and along-step action for each track"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Pre
    }

    fn step_host(&self, params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        let navigator = params.navigator()?;
        let n = state.size();
        state.launch(0..n, |_, track| pre_step(params, navigator, track));
        Ok(())
    }
}

fn pre_step(params: &CoreParams, navigator: &dyn Navigator, track: &mut TrackView<'_>) {
    match track.status() {
        TrackStatus::Initializing => *track.sim.status = TrackStatus::Alive,
        TrackStatus::Alive => {}
        _ => return,
    }
    *track.sim.num_steps += 1;
    *track.sim.step_length = 0.0;

    let scalars = &params.scalars;
    let particle = track.particle_id();
    let energy = track.energy();

    *track.sim.along_step_action = if params.particles.is_charged(particle) {
        scalars.along_step_charged
    } else {
        scalars.along_step_neutral
    };

    let below_cutoff = energy < params.config.energy_cutoff;
    let too_many_steps = params.sim.max_steps.is_some_and(|m| *track.sim.num_steps > m);
    if below_cutoff || too_many_steps {
        *track.sim.post_step_action = scalars.tracking_cut_action;
        return;
    }

    // Physics-limited step
    let xs = params.physics.total_xs(particle, energy);
    let physics_step: Real = track.rng.exponential(xs);

    // Geometry-limited step
    let geo_step = navigator.find_next_step(&*track.geo.pos, &*track.geo.dir);

    let (step, limit) = if geo_step < physics_step {
        (geo_step, scalars.boundary_action)
    } else {
        let u = track.rng.uniform();
        (physics_step, params.physics.sample_model(particle, energy, u))
    };

    if !step.is_finite() {
        track.mark_errored();
        *track.sim.post_step_action = scalars.tracking_cut_action;
        return;
    }

    *track.sim.step_length = step;
    *track.sim.post_step_action = limit;
}
