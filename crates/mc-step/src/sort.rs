//! Actions that reorder the thread → slot mapping between buckets.

use mc_action::{Action, ActionOrder, ActionResult, CoreParams, CoreState, Host};
use mc_core::{ActionId, TrackOrder};
use mc_sort::{
    ActionKey, reindex_along_step_action, reindex_particle_type, reindex_shuffle, reindex_status,
    reindex_step_limit_action,
};
use tracing::trace;

/// Where in the step a [`SortTracksAction`] runs.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SortStage {
    /// Before the pre-step: shuffle, status partition, or particle grouping.
    Start,
    /// After the pre-step, keyed on the selected along-step action.
    Along,
    /// After the along-step, keyed on the selected post-step action.
    Post,
}

impl SortStage {
    pub fn label(self) -> &'static str {
        match self {
            SortStage::Start => "sort-tracks-start",
            SortStage::Along => "sort-tracks-along",
            SortStage::Post  => "sort-tracks-post",
        }
    }

    pub fn order(self) -> ActionOrder {
        match self {
            SortStage::Start => ActionOrder::SortStart,
            SortStage::Along => ActionOrder::SortPre,
            SortStage::Post  => ActionOrder::SortPrePost,
        }
    }

    /// Whether `track_order` needs a sort at this stage.
    pub fn applies_to(self, track_order: TrackOrder) -> bool {
        match self {
            SortStage::Start => track_order.sorts_at_start(),
            SortStage::Along => track_order.sorts_along(),
            SortStage::Post  => track_order.sorts_post(),
        }
    }
}

/// Reorders `CoreState::threads` according to the configured track order.
///
/// The action sorts only the mapping, never the slot data, so a lane still
/// owns exactly one slot afterwards.  Action-keyed sorts also refresh the
/// cached per-action thread ranges.
pub struct SortTracksAction {
    id:    ActionId,
    stage: SortStage,
    order: TrackOrder,
}

impl SortTracksAction {
    pub fn new(id: ActionId, stage: SortStage, order: TrackOrder) -> Self {
        Self { id, stage, order }
    }

    pub fn stage(&self) -> SortStage {
        self.stage
    }
}

impl Action for SortTracksAction {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        self.stage.label()
    }

    fn description(&self) -> &str {
        match self.stage {
            SortStage::Start => "reorder tracks at the start of the step",
            SortStage::Along => "sort tracks by along-step action",
            SortStage::Post  => "sort tracks by post-step action",
        }
    }

    fn order(&self) -> ActionOrder {
        self.stage.order()
    }

    fn step_host(&self, params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        let CoreState { threads, slots, offsets, rng, .. } = state;
        match (self.stage, self.order) {
            (SortStage::Start, TrackOrder::Shuffle) => {
                reindex_shuffle(threads, rng);
                offsets.invalidate();
            }
            (SortStage::Start, TrackOrder::PartitionStatus) => {
                reindex_status(threads, &slots.sim.status);
                offsets.invalidate();
            }
            (SortStage::Start, TrackOrder::SortParticleType) => {
                reindex_particle_type(threads, &slots.particle.particle_id);
                offsets.invalidate();
            }
            (SortStage::Along, _) => {
                reindex_along_step_action(threads, &slots.sim);
                offsets.update(
                    ActionKey::AlongStep,
                    threads,
                    ActionKey::AlongStep.column(&slots.sim),
                    params.num_actions(),
                );
            }
            (SortStage::Post, _) => {
                reindex_step_limit_action(threads, &slots.sim);
                offsets.update(
                    ActionKey::PostStep,
                    threads,
                    ActionKey::PostStep.column(&slots.sim),
                    params.num_actions(),
                );
            }
            _ => return Ok(()),
        }
        trace!(stage = self.stage.label(), order = %self.order, "sorted tracks");
        Ok(())
    }
}
