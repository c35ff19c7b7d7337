//! `mc-track` — Structure-of-Arrays track-slot storage for the `rust_mc`
//! engine.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                           |
//! |--------------|--------------------------------------------------------------------|
//! | [`sim`]      | `TrackStatus`, `SimStateData`, `SimParamsData`, `LoopingThreshold` |
//! | [`particle`] | `ParticleDef`, `ParticleParams`, `ParticleStateData`               |
//! | [`geo`]      | `GeoStateData`, `Navigator`, `BoxWorld`, `WorldRegistry`           |
//! | [`store`]    | `TrackSlots` (all columns), `TrackView`, `Secondary`               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on status/threshold types.|

pub mod geo;
pub mod particle;
pub mod sim;
pub mod store;


pub use geo::{BoxWorld, GeoKind, GeoStateData, GeoView, InfiniteWorld, Navigator, WorldRegistry};
pub use particle::{ParticleDef, ParticleParams, ParticleStateData, ParticleView};
pub use sim::{LoopingThreshold, SimParamsData, SimStateData, SimView, TrackStatus};
pub use store::{Secondary, TrackSlots, TrackView};
