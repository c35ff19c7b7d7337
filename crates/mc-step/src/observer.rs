//! Run observer trait for progress reporting and data collection.

use mc_action::StepCounters;

use crate::RunSummary;

/// Callbacks invoked by [`Stepper::run`][crate::Stepper::run] around every
/// step.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example: progress printer
///
/// ```rust,ignore
/// struct Progress { interval: u64 }
///
/// impl StepObserver for Progress {
///     fn on_step_end(&mut self, step: u64, counters: &StepCounters) {
///         if step % self.interval == 0 {
///             println!("step {step}: {} alive", counters.num_alive);
///         }
///     }
/// }
/// ```
pub trait StepObserver {
    /// Called once after the primaries are staged.
    fn on_run_start(&mut self, _num_primaries: usize) {}

    /// Called before any action of step `step` runs.
    fn on_step_start(&mut self, _step: u64) {}

    /// Called after the end-of-step action with the fresh counters.
    fn on_step_end(&mut self, _step: u64, _counters: &StepCounters) {}

    /// Called once when no work is left.
    fn on_run_end(&mut self, _summary: &RunSummary) {}
}

/// A [`StepObserver`] that does nothing.
pub struct NoopObserver;

impl StepObserver for NoopObserver {}
