//! Built-in post-step actions: leaving the world, cut-short propagation, and
//! the tracking cut.

use mc_action::{Action, ActionOrder, ActionResult, CoreParams, CoreState, Host};
use mc_core::ActionId;
use mc_sort::ActionKey;

// ── GeoBoundaryAction ─────────────────────────────────────────────────────────

/// Kills every alive track that is now outside the world.
///
/// Checks all lanes, not only those whose step was geometry limited:
/// a charged track can curve out of the world on a physics-limited step.
pub struct GeoBoundaryAction {
    id: ActionId,
}

impl GeoBoundaryAction {
    pub const LABEL: &'static str = "geo-boundary";

    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for GeoBoundaryAction {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        Self::LABEL
    }

    fn description(&self) -> &str {
        "kill tracks that left the world"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Post
    }

    fn step_host(&self, params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        let navigator = params.navigator()?;
        let n = state.size();
        state.launch(0..n, |_, track| {
            if track.is_alive() && navigator.is_outside(&*track.geo.pos) {
                track.kill();
            }
        });
        Ok(())
    }
}

// ── PropagationLimitAction ────────────────────────────────────────────────────

/// Owns the tracks whose propagation ended before the selected step length.
///
/// Nothing happens to them here: the along-step already moved them as far
/// as it could, and the next pre-step picks a fresh step.  Selecting this
/// action keeps every active track inside some per-action thread range.
pub struct PropagationLimitAction {
    id: ActionId,
}

impl PropagationLimitAction {
    pub const LABEL: &'static str = "propagation-limit";

    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for PropagationLimitAction {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        Self::LABEL
    }

    fn description(&self) -> &str {
        "limit the step by the propagator's substep budget"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Post
    }

    fn step_host(&self, _params: &CoreParams, _state: &mut CoreState<Host>) -> ActionResult<()> {
        Ok(())
    }
}

// ── TrackingCutAction ─────────────────────────────────────────────────────────

/// Stops tracks the pre-step or along-step handed over: below the energy
/// cutoff, over the per-track step limit, or looping too long.  Their
/// kinetic energy is zeroed.  Tracks already errored are also routed here
/// and keep their `Errored` status.
pub struct TrackingCutAction {
    id: ActionId,
}

impl TrackingCutAction {
    pub const LABEL: &'static str = "tracking-cut";

    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for TrackingCutAction {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        Self::LABEL
    }

    fn description(&self) -> &str {
        "kill tracks below the cutoff or past their step limits"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Post
    }

    fn step_host(&self, _params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        state.launch_action(self.id, ActionKey::PostStep, |_, track| {
            if track.is_alive() {
                *track.particle.energy = 0.0;
                track.kill();
            }
        });
        Ok(())
    }
}
