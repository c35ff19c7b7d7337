//! `mc-action` — the action contract and everything an action receives.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                        |
//! |--------------|-----------------------------------------------------------------|
//! | [`action`]   | `Action` trait, `ActionIdIter`                                  |
//! | [`order`]    | `ActionOrder` step buckets                                      |
//! | [`registry`] | `ActionRegistry`                                                |
//! | [`params`]   | `CoreParams`, `CoreScalars`                                     |
//! | [`state`]    | `CoreState<M>`, `StepCounters`, lane launches                   |
//! | [`memspace`] | `MemSpace`, `Host`, `Device`                                    |
//! | [`executor`] | serial and Rayon host executors                                 |
//! | [`physics`]  | `Model`, `Process`, `ModelAction`, `XsGrid`, `PhysicsParams`    |
//! | [`error`]    | `ActionError`, `ActionResult`                                   |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                        |
//! |------------|---------------------------------------------------------------|
//! | `parallel` | Host launches, queue kernels, and sorts use Rayon.            |
//! | `serde`    | Derives `Serialize`/`Deserialize` on `ActionOrder`, counters. |

pub mod action;
pub mod error;
pub mod executor;
pub mod memspace;
pub mod order;
pub mod params;
pub mod physics;
pub mod registry;
pub mod state;


pub use action::{Action, ActionIdIter};
pub use error::{ActionError, ActionResult};
pub use executor::Executor;
pub use memspace::{Device, Host, MemSpace};
pub use order::ActionOrder;
pub use params::{CoreParams, CoreScalars};
pub use physics::{Applicability, Interaction, Model, ModelAction, PhysicsParams, Process, XsGrid};
pub use registry::ActionRegistry;
pub use state::{CoreState, StepCounters};
