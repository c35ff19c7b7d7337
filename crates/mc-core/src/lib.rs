//! `mc-core` — foundational types for the `rust_mc` transport engine.
//!
//! This crate is a dependency of every other `mc-*` crate.  It has no `mc-*`
//! dependencies and minimal external ones (`rand`, `thiserror`, optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                       |
//! |------------|----------------------------------------------------------------|
//! | [`ids`]    | `TrackId`, `TrackSlotId`, `ThreadId`, `ActionId`, `EventId`, … |
//! | [`config`] | `CoreConfig`, `TrackOrder`                                     |
//! | [`rng`]    | `TrackRng` (per-track), `SimRng` (host-side)                   |
//! | [`error`]  | `CoreError`, `CoreResult`, `validate!`                         |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids and `CoreConfig`.    |

pub mod config;
pub mod error;
pub mod ids;
pub mod rng;


/// Floating-point type used for all physical quantities.
pub type Real = f64;

/// Cartesian three-vector.
pub type Real3 = [Real; 3];

/// Speed of light in cm/ns.
pub const SPEED_OF_LIGHT: Real = 29.979_245_8;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{CoreConfig, TrackOrder};
pub use error::{CoreError, CoreResult};
pub use ids::{ActionId, EventId, ParticleId, PrimaryId, ThreadId, TrackId, TrackSlotId};
pub use rng::{SimRng, TrackRng};
