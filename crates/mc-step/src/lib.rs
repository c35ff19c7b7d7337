//! `mc-step` — built-in actions and the step loop orchestrator.
//!
//! # One step
//!
//! ```text
//! ① start      extend-from-primaries → initialize-tracks
//! ② sort_start (shuffle / partition-status / sort-particle-type)
//! ③ pre        Initializing → Alive; pick step length, along and post actions
//! ④ sort_pre   (sort-along-step-action / sort-both-action)
//! ⑤ along      propagate, advance time, looping policy
//! ⑥ sort_post  (sort-step-limit-action / sort-both-action)
//! ⑦ post       geo-boundary, propagation-limit, tracking-cut, models
//! ⑧ user_post  action-diagnostic, user actions
//! ⑨ end        extend-from-secondaries: queue secondaries, recycle slots
//! ```
//!
//! # Crate layout
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`queue`]       | extend-from-primaries, initialize-tracks, extend-from-secondaries |
//! | [`sort`]        | `SortTracksAction`, `SortStage`                           |
//! | [`pre_step`]    | `PreStepAction`                                           |
//! | [`along_step`]  | `AlongStepAction`, `Propagator`, linear and field propagators |
//! | [`post_step`]   | `GeoBoundaryAction`, `PropagationLimitAction`, `TrackingCutAction` |
//! | [`diagnostic`]  | `ActionDiagnostic`                                        |
//! | [`stepper`]     | `Stepper`                                                 |
//! | [`builder`]     | `StepperBuilder`                                          |
//! | [`observer`]    | `StepObserver`, `NoopObserver`                            |
//! | [`diagnostics`] | `RunSummary`, `ActionStats`, `StepDiagnostics`            |
//! | [`error`]       | `StepError`, `StepResult`                                 |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | Action lanes run on Rayon's thread pool.                 |
//! | `serde`    | `Serialize` for `RunSummary` and `StepDiagnostics`.      |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use mc_core::CoreConfig;
//! use mc_step::{NoopObserver, StepperBuilder};
//! use mc_track::{BoxWorld, GeoKind};
//!
//! let mut stepper = StepperBuilder::new(CoreConfig::default())
//!     .world(GeoKind::Box, BoxWorld::cube(50.0))
//!     .build()?;
//! let summary = stepper.run(&primaries, &mut NoopObserver)?;
//! ```

pub mod along_step;
pub mod builder;
pub mod diagnostic;
pub mod diagnostics;
pub mod error;
pub mod observer;
pub mod post_step;
pub mod pre_step;
pub mod queue;
pub mod sort;
pub mod stepper;

#[cfg(test)]
mod tests;

pub use along_step::{
    AlongStepAction, LinearPropagator, Propagation, Propagator, UniformFieldPropagator,
};
pub use builder::StepperBuilder;
pub use diagnostic::ActionDiagnostic;
pub use diagnostics::{ActionStats, RunSummary, StepDiagnostics};
pub use error::{StepError, StepResult};
pub use observer::{NoopObserver, StepObserver};
pub use post_step::{GeoBoundaryAction, PropagationLimitAction, TrackingCutAction};
pub use pre_step::PreStepAction;
pub use queue::{ExtendFromPrimariesAction, ExtendFromSecondariesAction, InitializeTracksAction};
pub use sort::{SortStage, SortTracksAction};
pub use stepper::Stepper;
