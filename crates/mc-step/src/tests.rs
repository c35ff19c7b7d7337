//! Unit tests for mc-step.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use mc_action::{
    Action, ActionError, ActionIdIter, ActionOrder, ActionResult, Applicability, CoreParams,
    CoreState, Device, Host, Interaction, Model, Process, StepCounters, XsGrid,
};
use mc_core::{
    ActionId, CoreConfig, EventId, ParticleId, PrimaryId, Real, SPEED_OF_LIGHT, TrackOrder,
    TrackSlotId,
};
use mc_init::{InitError, Primary};
use mc_sort::ActionKey;
use mc_track::{
    BoxWorld, GeoKind, LoopingThreshold, ParticleParams, Secondary, SimParamsData, TrackSlots,
    TrackStatus, TrackView,
};

use crate::*;

const GAMMA: ParticleId = ParticleId(0);
const ELECTRON: ParticleId = ParticleId(1);
const POSITRON: ParticleId = ParticleId(2);

// ── Test physics ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
enum Behavior {
    Absorb,
    Unchanged,
    /// Emit `count` electrons of `energy`, then absorb.
    EmitAndAbsorb { count: usize, energy: Real },
    /// Lose 30% of the energy to an electron and scatter isotropically.
    Scatter,
    /// Fail above the given energy, absorb below it.
    FailAbove(Real),
}

struct TestModel {
    id:       ActionId,
    label:    &'static str,
    particle: ParticleId,
    xs:       Real,
    behavior: Behavior,
}

impl Model for TestModel {
    fn action_id(&self) -> ActionId {
        self.id
    }
    fn label(&self) -> &str {
        self.label
    }
    fn description(&self) -> &str {
        "constant-rate test model"
    }
    fn applicability(&self) -> Vec<Applicability> {
        vec![Applicability::new(self.particle, 0.0, 1e6)]
    }
    fn micro_xs(&self, applic: &Applicability) -> XsGrid {
        XsGrid::constant(applic.lower, applic.upper, self.xs)
    }
    fn interact(&self, track: &mut TrackView<'_>) -> Interaction {
        match self.behavior {
            Behavior::Absorb => Interaction::Absorbed,
            Behavior::Unchanged => Interaction::Unchanged,
            Behavior::EmitAndAbsorb { count, energy } => {
                for _ in 0..count {
                    track.push_secondary(Secondary {
                        particle_id: ELECTRON,
                        energy,
                        dir: [0.0, 0.0, 1.0],
                    });
                }
                Interaction::Absorbed
            }
            Behavior::Scatter => {
                let energy = track.energy();
                let emitted = track.rng.isotropic();
                track.push_secondary(Secondary {
                    particle_id: ELECTRON,
                    energy:      0.3 * energy,
                    dir:         emitted,
                });
                let dir = track.rng.isotropic();
                Interaction::Scattered { energy: 0.7 * energy, dir }
            }
            Behavior::FailAbove(limit) => {
                if track.energy() > limit {
                    Interaction::Failed
                } else {
                    Interaction::Absorbed
                }
            }
        }
    }
}

/// A process with exactly one model.
struct OneModel {
    label:    &'static str,
    particle: ParticleId,
    xs:       Real,
    behavior: Behavior,
}

impl OneModel {
    fn gamma(label: &'static str, xs: Real, behavior: Behavior) -> Self {
        Self { label, particle: GAMMA, xs, behavior }
    }
}

impl Process for OneModel {
    fn label(&self) -> &str {
        self.label
    }
    fn build_models(&self, ids: &mut ActionIdIter) -> Vec<Arc<dyn Model>> {
        let model = TestModel {
            id:       ids.next().unwrap(),
            label:    self.label,
            particle: self.particle,
            xs:       self.xs,
            behavior: self.behavior,
        };
        vec![Arc::new(model) as Arc<dyn Model>]
    }
}

/// Records the slot status pattern every time it runs.
struct StatusLog {
    id:    ActionId,
    label: &'static str,
    order: ActionOrder,
    log:   Arc<Mutex<Vec<String>>>,
}

impl Action for StatusLog {
    fn action_id(&self) -> ActionId {
        self.id
    }
    fn label(&self) -> &str {
        self.label
    }
    fn description(&self) -> &str {
        "record slot status"
    }
    fn order(&self) -> ActionOrder {
        self.order
    }
    fn step_host(&self, _: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        self.log.lock().unwrap().push(state.slots.status_pattern());
        Ok(())
    }
}

fn status_log(
    builder: StepperBuilder,
    label:   &'static str,
    order:   ActionOrder,
) -> (StepperBuilder, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let shared = Arc::clone(&log);
    let builder = builder.action(move |id| {
        Arc::new(StatusLog { id, label, order, log: shared }) as Arc<dyn Action>
    });
    (builder, log)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn config(slots: usize) -> CoreConfig {
    CoreConfig {
        num_track_slots:      slots,
        initializer_capacity: 256,
        max_events:           4,
        max_steps:            1_000,
        ..CoreConfig::default()
    }
}

fn primaries(particle: ParticleId, energies: &[Real]) -> Vec<Primary> {
    energies
        .iter()
        .enumerate()
        .map(|(i, &energy)| Primary {
            particle_id: particle,
            energy,
            position:    [0.0; 3],
            direction:   [0.0, 0.0, 1.0],
            time:        0.0,
            event_id:    EventId(0),
            primary_id:  PrimaryId(i as u32),
            weight:      1.0,
        })
        .collect()
}

fn gammas(n: usize, energy: Real) -> Vec<Primary> {
    primaries(GAMMA, &vec![energy; n])
}

fn labels(stepper: &Stepper) -> Vec<String> {
    stepper.actions().iter().map(|a| a.label().to_owned()).collect()
}

/// Post-step counts keyed by action label, so runs with different action
/// numbering can be compared.
fn counts_by_label(diag: &StepDiagnostics) -> BTreeMap<String, Vec<u64>> {
    let counts = diag.post_step_counts.clone().unwrap_or_default();
    diag.actions
        .iter()
        .zip(counts)
        .map(|(stats, row)| (stats.label.clone(), row))
        .collect()
}

#[derive(Default)]
struct Recorder {
    started: Option<usize>,
    steps:   Vec<u64>,
    ends:    Vec<StepCounters>,
    summary: Option<RunSummary>,
}

impl StepObserver for Recorder {
    fn on_run_start(&mut self, num_primaries: usize) {
        self.started = Some(num_primaries);
    }
    fn on_step_start(&mut self, step: u64) {
        self.steps.push(step);
    }
    fn on_step_end(&mut self, _step: u64, counters: &StepCounters) {
        self.ends.push(*counters);
    }
    fn on_run_end(&mut self, summary: &RunSummary) {
        self.summary = Some(summary.clone());
    }
}

// ── Build ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod build {
    use super::*;

    #[test]
    fn builtins_in_bucket_order() {
        let stepper = StepperBuilder::new(config(4)).build().unwrap();
        assert_eq!(
            labels(&stepper),
            vec![
                "extend-from-primaries",
                "initialize-tracks",
                "pre-step",
                "along-step-neutral",
                "along-step-charged",
                "geo-boundary",
                "propagation-limit",
                "tracking-cut",
                "extend-from-secondaries",
            ]
        );
    }

    #[test]
    fn scalars_name_the_builtins() {
        let stepper = StepperBuilder::new(config(4)).build().unwrap();
        let params = stepper.params();
        let find = |label| params.registry.find_action(label);
        assert_eq!(params.scalars.boundary_action, find("geo-boundary"));
        assert_eq!(params.scalars.propagation_limit_action, find("propagation-limit"));
        assert_eq!(params.scalars.tracking_cut_action, find("tracking-cut"));
        assert_eq!(params.scalars.along_step_neutral, find("along-step-neutral"));
        assert_eq!(params.scalars.along_step_charged, find("along-step-charged"));
        assert!(params.scalars.boundary_action.is_valid());
    }

    #[test]
    fn sort_actions_follow_track_order() {
        let registered = |order: TrackOrder| {
            let stepper = StepperBuilder::new(CoreConfig { track_order: order, ..config(4) })
                .build()
                .unwrap();
            ["sort-tracks-start", "sort-tracks-along", "sort-tracks-post"]
                .map(|label| stepper.params().registry.find_action(label).is_valid())
        };
        assert_eq!(registered(TrackOrder::Unsorted), [false, false, false]);
        assert_eq!(registered(TrackOrder::PartitionCharge), [false, false, false]);
        assert_eq!(registered(TrackOrder::Shuffle), [true, false, false]);
        assert_eq!(registered(TrackOrder::PartitionStatus), [true, false, false]);
        assert_eq!(registered(TrackOrder::SortParticleType), [true, false, false]);
        assert_eq!(registered(TrackOrder::SortAlongStepAction), [false, true, false]);
        assert_eq!(registered(TrackOrder::SortStepLimitAction), [false, false, true]);
        assert_eq!(registered(TrackOrder::SortBothAction), [false, true, true]);
    }

    #[test]
    fn sort_actions_run_between_buckets() {
        let stepper =
            StepperBuilder::new(CoreConfig { track_order: TrackOrder::SortBothAction, ..config(4) })
                .build()
                .unwrap();
        let labels = labels(&stepper);
        let pos = |l: &str| labels.iter().position(|x| x == l).unwrap();
        assert!(pos("pre-step") < pos("sort-tracks-along"));
        assert!(pos("sort-tracks-along") < pos("along-step-neutral"));
        assert!(pos("along-step-charged") < pos("sort-tracks-post"));
        assert!(pos("sort-tracks-post") < pos("geo-boundary"));
    }

    #[test]
    fn models_and_user_actions_get_consecutive_ids() {
        let builder = StepperBuilder::new(config(4))
            .process(OneModel::gamma("absorb", 1.0, Behavior::Absorb));
        let (builder, _log) = status_log(builder, "log", ActionOrder::UserStart);
        let stepper = builder.build().unwrap();
        let registry = &stepper.params().registry;

        let model = registry.find_action("absorb");
        let user = registry.find_action("log");
        assert_eq!(user.0, model.0 + 1);
        assert_eq!(registry.action(model).unwrap().order(), ActionOrder::Post);
        assert_eq!(stepper.params().physics.num_models(), 1);

        let labels = labels(&stepper);
        let pos = |l: &str| labels.iter().position(|x| x == l).unwrap();
        assert!(pos("initialize-tracks") < pos("log"));
        assert!(pos("log") < pos("pre-step"));
        assert!(pos("tracking-cut") < pos("absorb"));
    }

    #[test]
    fn duplicate_user_label_rejected() {
        let (builder, _log) =
            status_log(StepperBuilder::new(config(4)), "pre-step", ActionOrder::UserPost);
        let err = builder.build().err().unwrap();
        assert!(matches!(err, StepError::Action(ActionError::DuplicateLabel(ref l)) if l == "pre-step"));
    }

    #[test]
    fn invalid_config_rejected() {
        let err = StepperBuilder::new(config(0)).build().err().unwrap();
        assert!(matches!(err, StepError::Core(_)));
    }

    #[test]
    fn no_particles_rejected() {
        let err = StepperBuilder::new(config(4))
            .particles(ParticleParams::default())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, StepError::Config(_)));
    }

    #[test]
    fn missing_world_not_configured() {
        let err = StepperBuilder::new(config(4))
            .geometry(GeoKind::Box)
            .build()
            .err()
            .unwrap();
        assert!(err.is_not_configured());
    }

    #[test]
    fn device_not_configured() {
        let err = StepperBuilder::new(config(4)).build_in::<Device>().err().unwrap();
        assert!(err.is_not_configured());
        assert!(!err.is_not_implemented());
    }

    #[test]
    fn diagnostic_registered_last() {
        let stepper = StepperBuilder::new(CoreConfig { action_diagnostic: true, ..config(4) })
            .build()
            .unwrap();
        let registry = &stepper.params().registry;
        let id = registry.find_action(ActionDiagnostic::LABEL);
        assert_eq!(id.index() + 1, registry.num_actions());
        let labels = labels(&stepper);
        assert_eq!(labels[labels.len() - 2], ActionDiagnostic::LABEL);
        assert_eq!(labels[labels.len() - 1], "extend-from-secondaries");
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use super::*;

    /// Allowed change of one slot's status code between two observations.
    fn legal(prev: char, next: char, within_step: bool) -> bool {
        if within_step {
            // start bucket → post bucket of the same step
            match prev {
                '_' => next == '_',
                'i' | 'a' => matches!(next, 'a' | 'x' | 'E'),
                _ => false,
            }
        } else {
            // post bucket → start bucket of the next step
            match prev {
                'a' => next == 'a',
                '_' | 'x' | 'E' => matches!(next, '_' | 'i'),
                _ => false,
            }
        }
    }

    #[test]
    fn every_slot_follows_the_status_machine() {
        let builder = StepperBuilder::new(config(3))
            .world(GeoKind::Box, BoxWorld::cube(5.0))
            .process(OneModel::gamma("scatter", 0.5, Behavior::Scatter));
        let (builder, starts) = status_log(builder, "log-start", ActionOrder::UserStart);
        let (builder, posts) = status_log(builder, "log-post", ActionOrder::UserPost);
        let mut stepper = builder.build().unwrap();

        let summary = stepper.run(&gammas(6, 1.0), &mut NoopObserver).unwrap();
        assert_eq!(summary.num_errored, 0);
        assert!(summary.num_generated >= 6);

        let starts = starts.lock().unwrap();
        let posts = posts.lock().unwrap();
        assert_eq!(starts.len() as u64, summary.num_steps);
        assert_eq!(posts.len(), starts.len());

        let mut seen_initializing = false;
        for step in 0..starts.len() {
            let s: Vec<char> = starts[step].chars().collect();
            let p: Vec<char> = posts[step].chars().collect();
            for slot in 0..s.len() {
                seen_initializing |= s[slot] == 'i';
                assert!(legal(s[slot], p[slot], true), "step {step} slot {slot}: {s:?} → {p:?}");
                if step + 1 < starts.len() {
                    let next = starts[step + 1].chars().nth(slot).unwrap();
                    assert!(legal(p[slot], next, false), "step {step} slot {slot}");
                }
            }
            assert!(!starts[step].contains('x') && !starts[step].contains('E'));
            assert!(!posts[step].contains('i'));
        }
        assert!(seen_initializing);
    }

    #[test]
    fn first_step_promotes_and_counts() {
        let mut stepper = StepperBuilder::new(config(2))
            .process(OneModel::gamma("unchanged", 0.1, Behavior::Unchanged))
            .build()
            .unwrap();
        stepper.insert_primaries(&gammas(1, 1.0)).unwrap();
        assert_eq!(stepper.state().counters.num_pending, 1);

        let counters = stepper.step().unwrap();
        assert_eq!(counters.num_alive, 1);
        assert_eq!(counters.num_active, 1);
        assert_eq!(counters.num_pending, 0);

        let sim = &stepper.state().slots.sim;
        let slot = sim.status.iter().position(|&s| s == TrackStatus::Alive).unwrap();
        assert_eq!(sim.num_steps[slot], 1);
        assert!(sim.step_length[slot] > 0.0);
        let expected = sim.step_length[slot] / SPEED_OF_LIGHT;
        assert!((sim.time[slot] - expected).abs() < 1e-12);
    }

    #[test]
    fn dead_slots_are_recycled_at_end_of_step() {
        let mut stepper = StepperBuilder::new(config(4))
            .process(OneModel::gamma("absorb", 1.0, Behavior::Absorb))
            .build()
            .unwrap();
        stepper.insert_primaries(&gammas(3, 1.0)).unwrap();
        let counters = stepper.step().unwrap();
        assert_eq!(counters.num_active, 0);
        assert_eq!(counters.num_vacancies, 4);
        assert!(counters.is_done());
        assert_eq!(stepper.state().slots.status_pattern(), "____");
    }
}

// ── Runs ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run {
    use super::*;

    #[test]
    fn escapes_box_without_physics() {
        let mut stepper = StepperBuilder::new(config(4))
            .world(GeoKind::Box, BoxWorld::cube(10.0))
            .build()
            .unwrap();
        let summary = stepper.run(&gammas(3, 1.0), &mut NoopObserver).unwrap();
        assert_eq!(
            summary,
            RunSummary { num_steps: 1, num_primaries: 3, num_generated: 3, num_errored: 0 }
        );
    }

    #[test]
    fn queue_waits_for_vacancies() {
        let mut stepper = StepperBuilder::new(config(2))
            .process(OneModel::gamma("absorb", 1.0, Behavior::Absorb))
            .build()
            .unwrap();
        let mut recorder = Recorder::default();
        let summary = stepper.run(&gammas(5, 1.0), &mut recorder).unwrap();

        assert_eq!(summary.num_steps, 3);
        let queued: Vec<_> = recorder.ends.iter().map(|c| c.num_initializers).collect();
        assert_eq!(queued, vec![3, 1, 0]);
        assert_eq!(recorder.started, Some(5));
        assert_eq!(recorder.steps, vec![0, 1, 2]);
        assert_eq!(recorder.summary, Some(summary));
    }

    #[test]
    fn secondaries_are_transported() {
        let n = 4;
        let mut stepper = StepperBuilder::new(CoreConfig { action_diagnostic: true, ..config(8) })
            .process(OneModel::gamma(
                "emit",
                1.0,
                Behavior::EmitAndAbsorb { count: 2, energy: 1e-4 },
            ))
            .build()
            .unwrap();
        let mut recorder = Recorder::default();
        let summary = stepper.run(&gammas(n, 1.0), &mut recorder).unwrap();

        // Step 1 absorbs the photons, step 2 cuts the sub-threshold electrons.
        assert_eq!(summary.num_steps, 2);
        assert_eq!(summary.num_generated, 3 * n as u64);
        assert_eq!(recorder.ends[0].num_secondaries, 2 * n);
        assert_eq!(recorder.ends[1].num_secondaries, 0);

        let diag = stepper.diagnostics();
        let cut = stepper.params().scalars.tracking_cut_action;
        let emit = stepper.params().registry.find_action("emit");
        let counts = diag.post_step_counts.as_ref().unwrap();
        assert_eq!(counts[emit.index()][GAMMA.index()], n as u64);
        assert_eq!(counts[cut.index()][ELECTRON.index()], 2 * n as u64);
    }

    #[test]
    fn step_limit_aborts_run() {
        let mut stepper = StepperBuilder::new(CoreConfig { max_steps: 5, ..config(4) })
            .process(OneModel::gamma("unchanged", 1.0, Behavior::Unchanged))
            .build()
            .unwrap();
        let err = stepper.run(&gammas(2, 1.0), &mut NoopObserver).unwrap_err();
        assert!(matches!(err, StepError::StepLimit { max_steps: 5, active: 2, queued: 0 }));
        assert_eq!(stepper.num_steps(), 5);
    }

    #[test]
    fn per_track_step_limit_uses_tracking_cut() {
        let mut stepper = StepperBuilder::new(config(4))
            .process(OneModel::gamma("unchanged", 1.0, Behavior::Unchanged))
            .max_steps_per_track(3)
            .build()
            .unwrap();
        let summary = stepper.run(&gammas(2, 1.0), &mut NoopObserver).unwrap();
        assert_eq!(summary.num_steps, 4);
        assert_eq!(summary.num_errored, 0);
    }

    #[test]
    fn below_cutoff_primaries_are_cut_immediately() {
        let mut stepper = StepperBuilder::new(CoreConfig { energy_cutoff: 0.5, ..config(4) })
            .build()
            .unwrap();
        let summary = stepper.run(&gammas(3, 0.1), &mut NoopObserver).unwrap();
        assert_eq!(summary.num_steps, 1);
        assert_eq!(summary.num_errored, 0);
    }

    #[test]
    fn unlimited_steps_are_errored() {
        // Infinite world and no physics: nothing can end the step.
        let mut stepper = StepperBuilder::new(config(4)).build().unwrap();
        let summary = stepper.run(&gammas(3, 1.0), &mut NoopObserver).unwrap();
        assert_eq!(summary.num_steps, 1);
        assert_eq!(summary.num_errored, 3);
    }

    #[test]
    fn failed_track_is_isolated() {
        let mut stepper = StepperBuilder::new(CoreConfig { action_diagnostic: true, ..config(4) })
            .process(OneModel::gamma("fragile", 1.0, Behavior::FailAbove(5.0)))
            .build()
            .unwrap();
        let mut recorder = Recorder::default();
        let summary = stepper
            .run(&primaries(GAMMA, &[1.0, 10.0, 2.0]), &mut recorder)
            .unwrap();

        assert_eq!(summary.num_steps, 1);
        assert_eq!(summary.num_errored, 1);
        assert_eq!(recorder.ends[0].num_errored, 1);
        assert_eq!(recorder.ends[0].num_active, 0);

        let diag = stepper.diagnostics();
        assert_eq!(diag.num_errored, 1);
        let fragile = stepper.params().registry.find_action("fragile");
        assert_eq!(diag.post_step_counts.unwrap()[fragile.index()][GAMMA.index()], 3);
    }

    #[test]
    fn second_pending_batch_not_implemented() {
        let mut stepper = StepperBuilder::new(config(4)).build().unwrap();
        stepper.insert_primaries(&gammas(1, 1.0)).unwrap();
        let err = stepper.insert_primaries(&gammas(1, 1.0)).unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[test]
    fn invalid_primary_rejected() {
        let mut stepper = StepperBuilder::new(config(4)).build().unwrap();
        let err = stepper
            .insert_primaries(&primaries(ParticleId(9), &[1.0]))
            .unwrap_err();
        assert!(matches!(err, StepError::Init(InitError::InvalidPrimary { index: 0, .. })));
        assert_eq!(stepper.state().counters.num_pending, 0);
    }

    #[test]
    fn capacity_overflow_aborts_step() {
        let mut stepper = StepperBuilder::new(CoreConfig { initializer_capacity: 2, ..config(4) })
            .process(OneModel::gamma(
                "emit",
                1.0,
                Behavior::EmitAndAbsorb { count: 3, energy: 1.0 },
            ))
            .build()
            .unwrap();
        stepper.insert_primaries(&gammas(1, 1.0)).unwrap();
        let err = stepper.step().unwrap_err();
        match err {
            StepError::Dispatch { step, ref label, ref source } => {
                assert_eq!(step, 0);
                assert_eq!(label, "extend-from-secondaries");
                assert!(matches!(source, ActionError::Init(InitError::Capacity { requested: 3, .. })));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn results_do_not_depend_on_track_order() {
        let run = |order: TrackOrder| {
            let config = CoreConfig { track_order: order, action_diagnostic: true, ..config(8) };
            let mut stepper = StepperBuilder::new(config)
                .world(GeoKind::Box, BoxWorld::cube(4.0))
                .process(OneModel::gamma("scatter", 0.5, Behavior::Scatter))
                .build()
                .unwrap();
            let summary = stepper.run(&gammas(10, 1.0), &mut NoopObserver).unwrap();
            (summary, counts_by_label(&stepper.diagnostics()))
        };

        let (reference, reference_counts) = run(TrackOrder::Unsorted);
        assert!(reference.num_generated > 10);
        for order in [
            TrackOrder::Shuffle,
            TrackOrder::PartitionStatus,
            TrackOrder::SortParticleType,
            TrackOrder::SortAlongStepAction,
            TrackOrder::SortStepLimitAction,
            TrackOrder::SortBothAction,
        ] {
            let (summary, counts) = run(order);
            assert_eq!(summary, reference, "{order}");
            for (label, row) in &reference_counts {
                assert_eq!(counts.get(label), Some(row), "{order}: {label}");
            }
        }
    }

    #[test]
    fn repeated_runs_accumulate() {
        let mut stepper = StepperBuilder::new(config(4))
            .process(OneModel::gamma("absorb", 1.0, Behavior::Absorb))
            .build()
            .unwrap();
        let first = stepper.run(&gammas(2, 1.0), &mut NoopObserver).unwrap();
        let second = stepper.run(&gammas(3, 1.0), &mut NoopObserver).unwrap();
        assert_eq!(first.num_generated, 2);
        assert_eq!(second.num_generated, 3);
        assert_eq!(stepper.num_steps(), first.num_steps + second.num_steps);
        assert_eq!(stepper.diagnostics().num_generated, 5);
    }
}

// ── Sorting ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod sorting {
    use super::*;

    fn is_permutation(threads: &[TrackSlotId]) -> bool {
        let mut sorted = threads.to_vec();
        sorted.sort_unstable();
        sorted.iter().enumerate().all(|(i, t)| t.index() == i)
    }

    #[test]
    fn mapping_stays_a_permutation() {
        for order in [TrackOrder::Shuffle, TrackOrder::PartitionStatus, TrackOrder::SortBothAction] {
            let mut stepper = StepperBuilder::new(CoreConfig { track_order: order, ..config(6) })
                .world(GeoKind::Box, BoxWorld::cube(4.0))
                .process(OneModel::gamma("scatter", 0.5, Behavior::Scatter))
                .build()
                .unwrap();
            stepper.insert_primaries(&gammas(8, 1.0)).unwrap();
            for _ in 0..200 {
                let counters = stepper.step().unwrap();
                assert!(is_permutation(&stepper.state().threads), "{order}");
                if counters.is_done() {
                    break;
                }
            }
        }
    }

    #[test]
    fn post_sort_leaves_cached_ranges() {
        let mut stepper = StepperBuilder::new(CoreConfig {
            track_order: TrackOrder::SortStepLimitAction,
            ..config(4)
        })
        .process(OneModel::gamma("unchanged", 1.0, Behavior::Unchanged))
        .build()
        .unwrap();
        stepper.insert_primaries(&gammas(3, 1.0)).unwrap();
        stepper.step().unwrap();

        let state = stepper.state();
        assert_eq!(state.offsets.key(), Some(ActionKey::PostStep));
        let model = stepper.params().registry.find_action("unchanged");
        assert_eq!(state.action_threads(model, ActionKey::PostStep), Some(0..3));
        assert_eq!(state.offsets.num_assigned(), 3);
    }

    /// Per call: the cached sort key, the threads covered by the per-action
    /// ranges, and the number of active slots.
    type RangeLog = Arc<Mutex<Vec<(Option<ActionKey>, usize, usize)>>>;

    struct RangeCheck {
        id:    ActionId,
        order: ActionOrder,
        log:   RangeLog,
    }

    impl Action for RangeCheck {
        fn action_id(&self) -> ActionId {
            self.id
        }
        fn label(&self) -> &str {
            "range-check"
        }
        fn description(&self) -> &str {
            "compare action ranges with the active slot count"
        }
        fn order(&self) -> ActionOrder {
            self.order
        }
        fn step_host(&self, _: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
            let active = state.slots.count_status(TrackStatus::is_active);
            let entry = (state.offsets.key(), state.offsets.num_assigned(), active);
            self.log.lock().unwrap().push(entry);
            Ok(())
        }
    }

    fn range_check(builder: StepperBuilder, order: ActionOrder) -> (StepperBuilder, RangeLog) {
        let log = RangeLog::default();
        let shared = Arc::clone(&log);
        let builder = builder.action(move |id| {
            Arc::new(RangeCheck { id, order, log: shared }) as Arc<dyn Action>
        });
        (builder, log)
    }

    #[test]
    fn short_propagation_keeps_every_track_in_a_range() {
        let builder = StepperBuilder::new(CoreConfig {
            track_order: TrackOrder::SortStepLimitAction,
            ..config(2)
        })
        .world(GeoKind::Box, BoxWorld::cube(100.0))
        .charged_propagator(UniformFieldPropagator::new([0.0, 0.0, 1.0]).max_substeps(2));
        let (builder, log) = range_check(builder, ActionOrder::Post);
        let mut stepper = builder.build().unwrap();
        stepper.insert_primaries(&primaries(ELECTRON, &[1.0, 1.0])).unwrap();
        for _ in 0..5 {
            stepper.step().unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 5);
        for &(key, assigned, active) in log.iter() {
            assert_eq!(key, Some(ActionKey::PostStep));
            assert_eq!(active, 2);
            assert_eq!(assigned, active);
        }
        let limit = stepper.params().scalars.propagation_limit_action;
        assert_eq!(stepper.state().action_threads(limit, ActionKey::PostStep), Some(0..2));
    }

    #[test]
    fn errored_tracks_stay_in_a_range() {
        // Infinite world and no physics: the pre-step errors every track.
        let builder = StepperBuilder::new(CoreConfig {
            track_order: TrackOrder::SortBothAction,
            ..config(4)
        });
        let (builder, along) = range_check(builder, ActionOrder::Along);
        let (builder, post) = range_check(builder, ActionOrder::Post);
        let mut stepper = builder.build().unwrap();
        let summary = stepper.run(&gammas(3, 1.0), &mut NoopObserver).unwrap();
        assert_eq!(summary.num_errored, 3);

        assert_eq!(*along.lock().unwrap(), vec![(Some(ActionKey::AlongStep), 3, 3)]);
        assert_eq!(*post.lock().unwrap(), vec![(Some(ActionKey::PostStep), 3, 3)]);
    }

    #[test]
    fn cut_tracks_keep_an_along_step_action() {
        let builder = StepperBuilder::new(CoreConfig {
            track_order: TrackOrder::SortAlongStepAction,
            ..config(4)
        })
        .world(GeoKind::Box, BoxWorld::cube(10.0));
        let (builder, log) = range_check(builder, ActionOrder::Along);
        let mut stepper = builder.build().unwrap();
        stepper.run(&primaries(GAMMA, &[1e-6, 1.0]), &mut NoopObserver).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log[0], (Some(ActionKey::AlongStep), 2, 2));
        assert!(log.iter().all(|&(_, assigned, active)| assigned == active));
    }

    #[test]
    fn partition_status_runs_active_first() {
        let mut stepper = StepperBuilder::new(CoreConfig {
            track_order: TrackOrder::PartitionStatus,
            ..config(6)
        })
        .process(OneModel::gamma("unchanged", 1.0, Behavior::Unchanged))
        .build()
        .unwrap();
        stepper.insert_primaries(&gammas(2, 1.0)).unwrap();
        stepper.step().unwrap();
        stepper.step().unwrap();

        let state = stepper.state();
        let status = &state.slots.sim.status;
        assert!(state.threads[..2].iter().all(|t| status[t.index()].is_active()));
        assert!(mc_sort::is_partitioned_by_status(&state.threads, status));
    }
}

// ── Propagation ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod propagation {
    use super::*;

    fn slots_with(particle: ParticleId, energy: Real, dir: [Real; 3]) -> TrackSlots {
        let mut slots = TrackSlots::new(&SimParamsData::default(), 1).unwrap();
        slots.particle.particle_id[0] = particle;
        slots.particle.energy[0] = energy;
        slots.geo.dir[0] = dir;
        slots
    }

    fn propagate(
        propagator: &dyn Propagator,
        particle:   ParticleId,
        energy:     Real,
        step:       Real,
    ) -> (Propagation, [Real; 3], [Real; 3]) {
        let particles = ParticleParams::standard_em();
        let mut slots = slots_with(particle, energy, [1.0, 0.0, 0.0]);
        let mut view = slots.view_mut(TrackSlotId(0)).unwrap();
        let result = propagator.propagate(particles.get(particle).unwrap(), &mut view, step);
        (result, *view.geo.pos, *view.geo.dir)
    }

    fn norm(v: &[Real; 3]) -> Real {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn linear_moves_straight() {
        let (result, pos, dir) = propagate(&LinearPropagator, GAMMA, 1.0, 2.5);
        assert_eq!(result, Propagation { distance: 2.5, looping: false });
        assert_eq!(pos, [2.5, 0.0, 0.0]);
        assert_eq!(dir, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn field_bends_charged_tracks() {
        let field = UniformFieldPropagator::new([0.0, 0.0, 1.0]);
        let (result, pos, dir) = propagate(&field, ELECTRON, 1.0, 0.5);
        assert_eq!(result, Propagation { distance: 0.5, looping: false });
        assert!((norm(&dir) - 1.0).abs() < 1e-12);
        assert!(dir[1].abs() > 1e-3);
        assert_eq!(pos[2], 0.0);
        // A chord is shorter than the arc.
        assert!(norm(&pos) < 0.5);
    }

    #[test]
    fn opposite_charges_bend_opposite_ways() {
        let field = UniformFieldPropagator::new([0.0, 0.0, 1.0]);
        let (_, _, electron) = propagate(&field, ELECTRON, 1.0, 0.5);
        let (_, _, positron) = propagate(&field, POSITRON, 1.0, 0.5);
        assert!(electron[1] * positron[1] < 0.0);
        assert!((electron[1] + positron[1]).abs() < 1e-12);
    }

    #[test]
    fn neutral_tracks_ignore_the_field() {
        let field = UniformFieldPropagator::new([0.0, 0.0, 1.0]);
        let (result, pos, _) = propagate(&field, GAMMA, 1.0, 3.0);
        assert!(!result.looping);
        assert_eq!(pos, [3.0, 0.0, 0.0]);
    }

    #[test]
    fn long_steps_are_flagged_looping() {
        let field = UniformFieldPropagator::new([0.0, 0.0, 1.0]).max_substeps(4);
        let (result, _, dir) = propagate(&field, ELECTRON, 1.0, 100.0);
        assert!(result.looping);
        assert!(result.distance > 0.0 && result.distance < 100.0);
        assert!((norm(&dir) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn looping_tracks_reach_the_tracking_cut() {
        let threshold = LoopingThreshold {
            max_subthreshold_steps: 3,
            max_steps:              3,
            threshold_energy:       250.0,
        };
        let mut stepper = StepperBuilder::new(CoreConfig { action_diagnostic: true, ..config(2) })
            .process(OneModel {
                label:    "rare",
                particle: ELECTRON,
                xs:       1e-7,
                behavior: Behavior::Unchanged,
            })
            .charged_propagator(UniformFieldPropagator::new([0.0, 0.0, 1.0]))
            .looping(ELECTRON, threshold)
            .build()
            .unwrap();
        let summary = stepper
            .run(&primaries(ELECTRON, &[1.0]), &mut NoopObserver)
            .unwrap();

        // Three tolerated looping steps, killed after the fourth.
        assert_eq!(summary.num_steps, 4);
        assert_eq!(summary.num_errored, 0);
        let diag = stepper.diagnostics();
        let cut = stepper.params().scalars.tracking_cut_action;
        assert_eq!(diag.post_step_counts.unwrap()[cut.index()][ELECTRON.index()], 1);
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod diagnostics {
    use super::*;

    #[test]
    fn every_action_called_once_per_step() {
        let mut stepper = StepperBuilder::new(CoreConfig { action_times: true, ..config(2) })
            .process(OneModel::gamma("absorb", 1.0, Behavior::Absorb))
            .build()
            .unwrap();
        let summary = stepper.run(&gammas(5, 1.0), &mut NoopObserver).unwrap();
        let diag = stepper.diagnostics();
        assert_eq!(diag.num_steps, summary.num_steps);
        assert_eq!(diag.actions.len(), stepper.params().num_actions());
        for stats in &diag.actions {
            assert_eq!(stats.calls, summary.num_steps, "{}", stats.label);
            assert!(stats.seconds >= 0.0);
        }
        assert!(diag.post_step_counts.is_none());
        assert_eq!(diag.action("pre-step").unwrap().order, ActionOrder::Pre);
    }

    #[test]
    fn times_stay_zero_unless_enabled() {
        let mut stepper = StepperBuilder::new(config(2))
            .process(OneModel::gamma("absorb", 1.0, Behavior::Absorb))
            .build()
            .unwrap();
        stepper.run(&gammas(2, 1.0), &mut NoopObserver).unwrap();
        assert!(stepper.diagnostics().actions.iter().all(|a| a.seconds == 0.0));
    }

    #[test]
    fn boundary_hits_are_counted() {
        let mut stepper = StepperBuilder::new(CoreConfig { action_diagnostic: true, ..config(4) })
            .world(GeoKind::Box, BoxWorld::cube(10.0))
            .build()
            .unwrap();
        stepper.run(&gammas(3, 1.0), &mut NoopObserver).unwrap();

        let boundary = stepper.params().scalars.boundary_action;
        let counts = stepper.diagnostics().post_step_counts.unwrap();
        assert_eq!(counts.len(), stepper.params().num_actions());
        assert_eq!(counts[boundary.index()], vec![3, 0, 0]);
        let total: u64 = counts.iter().flatten().sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn last_step_matches_counters() {
        let mut stepper = StepperBuilder::new(config(2))
            .process(OneModel::gamma("absorb", 1.0, Behavior::Absorb))
            .build()
            .unwrap();
        stepper.insert_primaries(&gammas(3, 1.0)).unwrap();
        let counters = stepper.step().unwrap();
        assert_eq!(stepper.diagnostics().last_step, counters);
        assert_eq!(counters.num_initializers, 1);
    }
}
