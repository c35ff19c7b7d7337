//! Fluent builder for constructing a [`Stepper`].

use std::sync::Arc;

use mc_action::{
    Action, ActionIdIter, ActionRegistry, CoreParams, CoreScalars, CoreState, Host, MemSpace,
    ModelAction, PhysicsParams, Process,
};
use mc_core::{ActionId, CoreConfig, ParticleId};
use mc_init::InitParams;
use mc_track::{
    GeoKind, InfiniteWorld, LoopingThreshold, Navigator, ParticleParams, SimParamsData,
    WorldRegistry,
};
use tracing::{debug, info};

use crate::{
    ActionDiagnostic, AlongStepAction, ExtendFromPrimariesAction, ExtendFromSecondariesAction,
    GeoBoundaryAction, InitializeTracksAction, LinearPropagator, PreStepAction,
    PropagationLimitAction, Propagator, SortStage, SortTracksAction, StepError, StepResult,
    Stepper, TrackingCutAction,
};

type ActionFactory = Box<dyn FnOnce(ActionId) -> Arc<dyn Action>>;

/// Fluent builder for [`Stepper`].
///
/// # Inputs (all have defaults)
///
/// | Method                     | Default                         |
/// |----------------------------|---------------------------------|
/// | `.particles(p)`            | `ParticleParams::standard_em()` |
/// | `.world(kind, navigator)`  | `InfiniteWorld`                 |
/// | `.process(p)`              | no physics                      |
/// | `.charged_propagator(p)`   | `LinearPropagator`              |
/// | `.looping(particle, t)`    | looping detection disabled      |
/// | `.max_steps_per_track(n)`  | unlimited                       |
/// | `.action(\|id\| …)`        | no user actions                 |
///
/// # Example
///
/// ```rust,ignore
/// let mut stepper = StepperBuilder::new(config)
///     .world(GeoKind::Box, BoxWorld::cube(10.0))
///     .process(ComptonProcess::default())
///     .charged_propagator(UniformFieldPropagator::new([0.0, 0.0, 1.0]))
///     .build()?;
/// let summary = stepper.run(&primaries, &mut NoopObserver)?;
/// ```
pub struct StepperBuilder {
    config:       CoreConfig,
    particles:    ParticleParams,
    sim:          SimParamsData,
    worlds:       WorldRegistry,
    geometry:     GeoKind,
    processes:    Vec<Box<dyn Process>>,
    propagator:   Arc<dyn Propagator>,
    user_actions: Vec<ActionFactory>,
}

impl StepperBuilder {
    pub fn new(config: CoreConfig) -> Self {
        let mut worlds = WorldRegistry::new();
        worlds.insert(GeoKind::Infinite, Box::new(InfiniteWorld));
        Self {
            config,
            particles:    ParticleParams::standard_em(),
            sim:          SimParamsData::default(),
            worlds,
            geometry:     GeoKind::Infinite,
            processes:    Vec::new(),
            propagator:   Arc::new(LinearPropagator),
            user_actions: Vec::new(),
        }
    }

    pub fn particles(mut self, particles: ParticleParams) -> Self {
        self.particles = particles;
        self
    }

    /// Replace all sim parameters at once.
    pub fn sim_params(mut self, sim: SimParamsData) -> Self {
        self.sim = sim;
        self
    }

    /// Enable looping detection for `particle`.
    pub fn looping(mut self, particle: ParticleId, threshold: LoopingThreshold) -> Self {
        self.sim.looping.insert(particle, threshold);
        self
    }

    /// Send tracks to the tracking cut after `n` steps.
    pub fn max_steps_per_track(mut self, n: u32) -> Self {
        self.sim.max_steps = Some(n);
        self
    }

    /// Load a world and transport through it.
    pub fn world(mut self, kind: GeoKind, navigator: impl Navigator) -> Self {
        self.worlds.insert(kind, Box::new(navigator));
        self.geometry = kind;
        self
    }

    /// Transport through a world that was already loaded.  Building fails
    /// with `NotConfigured` if `kind` is missing.
    pub fn geometry(mut self, kind: GeoKind) -> Self {
        self.geometry = kind;
        self
    }

    /// Add a physics process.  Its models are registered in order.
    pub fn process(mut self, process: impl Process + 'static) -> Self {
        self.processes.push(Box::new(process));
        self
    }

    /// How charged tracks move; neutral tracks always move in straight
    /// lines.
    pub fn charged_propagator(mut self, propagator: impl Propagator) -> Self {
        self.propagator = Arc::new(propagator);
        self
    }

    /// Register a user action.  `make` receives the id the action must
    /// report; the action's `order` decides where in the step it runs.
    pub fn action<F>(mut self, make: F) -> Self
    where
        F: FnOnce(ActionId) -> Arc<dyn Action> + 'static,
    {
        self.user_actions.push(Box::new(make));
        self
    }

    /// Build a host stepper.
    pub fn build(self) -> StepResult<Stepper<Host>> {
        self.build_in::<Host>()
    }

    /// Register every action, assemble the physics tables, and allocate
    /// state in memory space `M`.
    ///
    /// # Errors
    ///
    /// - `StepError::Core` for an invalid config.
    /// - `StepError::Action` for duplicate labels, out-of-sequence model
    ///   ids, a missing world, or an unavailable memory space.
    pub fn build_in<M: MemSpace>(self) -> StepResult<Stepper<M>> {
        self.config.validate()?;
        if self.particles.is_empty() {
            return Err(StepError::Config("at least one particle must be defined".into()));
        }

        let track_order = self.config.track_order;
        let mut registry = ActionRegistry::new();
        let mut scalars = CoreScalars::default();

        // ── Built-in actions ──────────────────────────────────────────────
        register(&mut registry, ExtendFromPrimariesAction::new)?;
        register(&mut registry, InitializeTracksAction::new)?;
        for stage in [SortStage::Start, SortStage::Along, SortStage::Post] {
            if stage.applies_to(track_order) {
                register(&mut registry, |id| SortTracksAction::new(id, stage, track_order))?;
            }
        }
        register(&mut registry, PreStepAction::new)?;

        let propagator = self.propagator;
        scalars.along_step_neutral = register(&mut registry, AlongStepAction::neutral)?;
        scalars.along_step_charged = register(&mut registry, |id| {
            AlongStepAction::charged(id, Arc::clone(&propagator))
        })?;
        scalars.boundary_action = register(&mut registry, GeoBoundaryAction::new)?;
        scalars.propagation_limit_action = register(&mut registry, PropagationLimitAction::new)?;
        scalars.tracking_cut_action = register(&mut registry, TrackingCutAction::new)?;

        // ── Physics ───────────────────────────────────────────────────────
        let mut models = Vec::new();
        for process in &self.processes {
            let mut ids = ActionIdIter::new(registry.next_id());
            let built = process.build_models(&mut ids);
            debug!(process = process.label(), models = built.len(), "built models");
            for model in built {
                registry.insert(Arc::new(ModelAction::new(Arc::clone(&model))))?;
                models.push(model);
            }
        }

        // ── User and end-of-step actions ──────────────────────────────────
        for make in self.user_actions {
            let id = registry.next_id();
            registry.insert(make(id))?;
        }
        register(&mut registry, ExtendFromSecondariesAction::new)?;

        let diagnostic = if self.config.action_diagnostic {
            let id = registry.next_id();
            let diag = Arc::new(ActionDiagnostic::new(id, id.index() + 1, self.particles.len()));
            registry.insert(diag.clone())?;
            Some(diag)
        } else {
            None
        };

        // ── Params and state ──────────────────────────────────────────────
        let params = CoreParams {
            init:      InitParams::from_config(&self.config),
            config:    self.config,
            particles: self.particles,
            sim:       self.sim,
            worlds:    self.worlds,
            geometry:  self.geometry,
            physics:   PhysicsParams::new(models),
            registry,
            scalars,
        };
        let navigator = params.navigator()?;
        let state = CoreState::<M>::new(&params)?;

        info!(
            actions = params.num_actions(),
            models = params.physics.num_models(),
            world = navigator.label(),
            propagator = propagator.label(),
            track_order = %track_order,
            "built stepper"
        );
        Ok(Stepper::new(params, state, diagnostic))
    }
}

fn register<A: Action>(
    registry: &mut ActionRegistry,
    make:     impl FnOnce(ActionId) -> A,
) -> StepResult<ActionId> {
    let id = registry.next_id();
    Ok(registry.insert(Arc::new(make(id)))?)
}
