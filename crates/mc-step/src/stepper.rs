//! The `Stepper` and its step loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mc_action::{Action, CoreParams, CoreState, Host, MemSpace, StepCounters};
use mc_init::{Primary, insert_primaries};
use tracing::{debug, info, warn};

use crate::{
    ActionDiagnostic, ActionStats, RunSummary, StepDiagnostics, StepError, StepObserver,
    StepResult,
};

/// Drives one stream of tracks through the registered actions.
///
/// A step runs every action once, in [`ActionOrder`] bucket order and
/// registration order within a bucket:
///
/// ```text
/// start     extend-from-primaries, initialize-tracks
/// sort      (optional) reorder the thread mapping
/// pre       pre-step: promote, pick step length and actions
/// along     along-step-neutral, along-step-charged
/// post      geo-boundary, tracking-cut, one action per model
/// user      (optional) diagnostics and user actions
/// end       extend-from-secondaries
/// ```
///
/// The loop itself knows no physics.  An action returning `Err` aborts the
/// rest of the step and the error is returned with the action's label.
///
/// Create via [`StepperBuilder`][crate::StepperBuilder].
///
/// [`ActionOrder`]: mc_action::ActionOrder
pub struct Stepper<M: MemSpace = Host> {
    params:     CoreParams,
    state:      CoreState<M>,
    /// Registered actions in execution order.
    actions:    Vec<Arc<dyn Action>>,
    diagnostic: Option<Arc<ActionDiagnostic>>,

    // Indexed by action id.
    calls:   Vec<u64>,
    elapsed: Vec<Duration>,

    num_steps:   u64,
    num_errored: u64,
}

impl<M: MemSpace> Stepper<M> {
    pub(crate) fn new(
        params:     CoreParams,
        state:      CoreState<M>,
        diagnostic: Option<Arc<ActionDiagnostic>>,
    ) -> Self {
        let actions = params.registry.ordered();
        let n = params.num_actions();
        Self {
            params,
            state,
            actions,
            diagnostic,
            calls:       vec![0; n],
            elapsed:     vec![Duration::ZERO; n],
            num_steps:   0,
            num_errored: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn params(&self) -> &CoreParams {
        &self.params
    }

    pub fn state(&self) -> &CoreState<M> {
        &self.state
    }

    /// Direct state access for drivers and tests, e.g. to reset per-event
    /// track counters between runs.
    pub fn state_mut(&mut self) -> &mut CoreState<M> {
        &mut self.state
    }

    /// Actions in the order a step runs them.
    pub fn actions(&self) -> &[Arc<dyn Action>] {
        &self.actions
    }

    /// Steps taken since the stepper was built.
    pub fn num_steps(&self) -> u64 {
        self.num_steps
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Stage a batch of primaries; they enter the queue on the next step.
    ///
    /// # Errors
    ///
    /// See [`mc_init::insert_primaries`].  Nothing is staged on error.
    pub fn insert_primaries(&mut self, primaries: &[Primary]) -> StepResult<()> {
        insert_primaries(
            &self.params.init,
            &self.params.particles,
            &self.state.init,
            &mut self.state.primaries,
            primaries,
        )?;
        self.state.update_counters();
        Ok(())
    }

    /// Run every action once and return the end-of-step counters.
    pub fn step(&mut self) -> StepResult<StepCounters> {
        let step = self.num_steps;
        let timed = self.params.config.action_times;

        self.state.offsets.invalidate();
        self.state.counters.num_secondaries = 0;
        self.state.counters.num_errored = 0;

        for action in &self.actions {
            let start = timed.then(Instant::now);
            M::dispatch(action.as_ref(), &self.params, &mut self.state).map_err(|source| {
                StepError::Dispatch { step, label: action.label().to_owned(), source }
            })?;

            let i = action.action_id().index();
            self.calls[i] += 1;
            if let Some(start) = start {
                self.elapsed[i] += start.elapsed();
            }
        }

        self.state.update_counters();
        self.num_steps += 1;
        let counters = self.state.counters;
        self.num_errored += counters.num_errored as u64;

        debug!(
            step,
            active = counters.num_active,
            alive = counters.num_alive,
            queued = counters.num_initializers,
            secondaries = counters.num_secondaries,
            errored = counters.num_errored,
            "step complete"
        );
        Ok(counters)
    }

    /// Transport `primaries` and everything they produce to completion.
    ///
    /// Steps until no track is active and nothing is queued or pending.
    /// Calls observer hooks around every step.  Use
    /// [`NoopObserver`][crate::NoopObserver] if you don't need callbacks.
    ///
    /// # Errors
    ///
    /// [`StepError::StepLimit`] if work remains after
    /// `CoreConfig::max_steps` steps, plus anything `insert_primaries` or
    /// `step` returns.
    pub fn run<O: StepObserver>(
        &mut self,
        primaries: &[Primary],
        observer:  &mut O,
    ) -> StepResult<RunSummary> {
        let first_step = self.num_steps;
        let errored_before = self.num_errored;
        let generated_before = self.state.init.num_generated;
        let max_steps = self.params.config.max_steps;

        self.insert_primaries(primaries)?;
        observer.on_run_start(primaries.len());
        info!(primaries = primaries.len(), max_steps, "starting run");

        loop {
            if self.num_steps - first_step >= max_steps {
                let c = self.state.counters;
                warn!(
                    max_steps,
                    active = c.num_active,
                    queued = c.num_initializers,
                    "run stopped at the step limit"
                );
                return Err(StepError::StepLimit {
                    max_steps,
                    active: c.num_active,
                    queued: c.num_initializers + c.num_pending,
                });
            }

            let step = self.num_steps;
            observer.on_step_start(step);
            let counters = self.step()?;
            observer.on_step_end(step, &counters);
            if counters.is_done() {
                break;
            }
        }

        let summary = RunSummary {
            num_steps:     self.num_steps - first_step,
            num_primaries: primaries.len(),
            num_generated: self.state.init.num_generated - generated_before,
            num_errored:   self.num_errored - errored_before,
        };
        if summary.num_errored > 0 {
            warn!(errored = summary.num_errored, "tracks were killed by internal failures");
        }
        info!(
            steps = summary.num_steps,
            generated = summary.num_generated,
            errored = summary.num_errored,
            "run complete"
        );
        observer.on_run_end(&summary);
        Ok(summary)
    }

    /// Invocation counts, timings, and post-step tallies so far.
    pub fn diagnostics(&self) -> StepDiagnostics {
        let actions = self
            .params
            .registry
            .iter()
            .map(|action| {
                let i = action.action_id().index();
                ActionStats {
                    label:   action.label().to_owned(),
                    order:   action.order(),
                    calls:   self.calls[i],
                    seconds: self.elapsed[i].as_secs_f64(),
                }
            })
            .collect();

        StepDiagnostics {
            num_steps:        self.num_steps,
            num_generated:    self.state.init.num_generated,
            num_errored:      self.num_errored,
            last_step:        self.state.counters,
            actions,
            post_step_counts: self.diagnostic.as_ref().map(|d| d.counts()),
        }
    }
}
