//! Shared, read-only setup data handed to every action.

use mc_core::{ActionId, CoreConfig};
use mc_init::InitParams;
use mc_track::{GeoKind, Navigator, ParticleParams, SimParamsData, WorldRegistry};

use crate::{ActionRegistry, ActionResult, PhysicsParams};

/// Ids of the built-in actions other actions need to refer to.
///
/// Filled in as the stepper registers them; anything left `INVALID` is
/// simply not selected.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CoreScalars {
    pub boundary_action:          ActionId,
    pub propagation_limit_action: ActionId,
    pub tracking_cut_action:      ActionId,
    pub along_step_neutral:       ActionId,
    pub along_step_charged:       ActionId,
}

impl Default for CoreScalars {
    fn default() -> Self {
        Self {
            boundary_action:          ActionId::INVALID,
            propagation_limit_action: ActionId::INVALID,
            tracking_cut_action:      ActionId::INVALID,
            along_step_neutral:       ActionId::INVALID,
            along_step_charged:       ActionId::INVALID,
        }
    }
}

/// Everything an action may read during a step.
///
/// Built once by the stepper; never mutated while stepping.
#[derive(Debug)]
pub struct CoreParams {
    pub config:    CoreConfig,
    pub init:      InitParams,
    pub particles: ParticleParams,
    pub sim:       SimParamsData,
    pub worlds:    WorldRegistry,
    /// Which registered world the tracks move through.
    pub geometry:  GeoKind,
    pub physics:   PhysicsParams,
    pub registry:  ActionRegistry,
    pub scalars:   CoreScalars,
}

impl CoreParams {
    /// The navigator for the configured world.
    pub fn navigator(&self) -> ActionResult<&dyn Navigator> {
        Ok(self.worlds.get(self.geometry)?)
    }

    /// Number of registered actions; the width of per-action tables.
    #[inline]
    pub fn num_actions(&self) -> usize {
        self.registry.num_actions()
    }
}
