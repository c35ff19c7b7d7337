//! Read-only reports produced by the stepper.

use mc_action::{ActionOrder, StepCounters};

/// Outcome of one [`Stepper::run`][crate::Stepper::run].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunSummary {
    pub num_steps:     u64,
    pub num_primaries: usize,
    /// Tracks created during the run, primaries included.
    pub num_generated: u64,
    /// Tracks that ended errored.
    pub num_errored:   u64,
}

/// Per-action bookkeeping.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ActionStats {
    pub label:   String,
    pub order:   ActionOrder,
    /// Number of steps that invoked this action.
    pub calls:   u64,
    /// Accumulated wall-clock time; zero unless `CoreConfig::action_times`.
    pub seconds: f64,
}

/// Everything the stepper has counted since it was built.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StepDiagnostics {
    pub num_steps:        u64,
    pub num_generated:    u64,
    pub num_errored:      u64,
    /// Counters from the most recent step.
    pub last_step:        StepCounters,
    /// Indexed by action id.
    pub actions:          Vec<ActionStats>,
    /// `post_step_counts[action][particle]`, present when the action
    /// diagnostic is registered.
    pub post_step_counts: Option<Vec<Vec<u64>>>,
}

impl StepDiagnostics {
    pub fn action(&self, label: &str) -> Option<&ActionStats> {
        self.actions.iter().find(|a| a.label == label)
    }
}
