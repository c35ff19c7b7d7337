//! Queue actions: the start and end of every step.
//!
//! ```text
//! start  extend-from-primaries    staged primaries → initializers
//! start  initialize-tracks        initializers → vacant slots
//!   …
//! end    extend-from-secondaries  secondaries → initializers, dead → vacant
//! ```

use mc_action::{Action, ActionOrder, ActionResult, CoreParams, CoreState, Host};
use mc_core::ActionId;
use mc_init::{extend_from_primaries, extend_from_secondaries, initialize_tracks};
use mc_track::TrackStatus;

// ── ExtendFromPrimariesAction ─────────────────────────────────────────────────

pub struct ExtendFromPrimariesAction {
    id: ActionId,
}

impl ExtendFromPrimariesAction {
    pub const LABEL: &'static str = "extend-from-primaries";

    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for ExtendFromPrimariesAction {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        Self::LABEL
    }

    fn description(&self) -> &str {
        "create track initializers from staged primaries"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Start
    }

    fn step_host(&self, _params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        extend_from_primaries(&mut state.init, &mut state.primaries)?;
        Ok(())
    }
}

// ── InitializeTracksAction ────────────────────────────────────────────────────

pub struct InitializeTracksAction {
    id: ActionId,
}

impl InitializeTracksAction {
    pub const LABEL: &'static str = "initialize-tracks";

    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for InitializeTracksAction {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        Self::LABEL
    }

    fn description(&self) -> &str {
        "move queued initializers into vacant track slots"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Start
    }

    fn step_host(&self, params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        initialize_tracks(&params.init, &params.particles, &mut state.init, &mut state.slots)?;
        Ok(())
    }
}

// ── ExtendFromSecondariesAction ───────────────────────────────────────────────

/// Last action of every step.
///
/// Records the step's secondary and errored counts in
/// [`CoreState::counters`] before the dead slots are recycled.
pub struct ExtendFromSecondariesAction {
    id: ActionId,
}

impl ExtendFromSecondariesAction {
    pub const LABEL: &'static str = "extend-from-secondaries";

    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for ExtendFromSecondariesAction {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        Self::LABEL
    }

    fn description(&self) -> &str {
        "queue secondaries and recycle dead track slots"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::End
    }

    fn step_host(&self, _params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        state.counters.num_errored = state.slots.count_status(|s| s == TrackStatus::Errored);
        state.counters.num_secondaries = extend_from_secondaries(&mut state.init, &mut state.slots)?;
        Ok(())
    }
}
