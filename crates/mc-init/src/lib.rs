//! `mc-init` — the track initializer queue for the `rust_mc` engine.
//!
//! New tracks never go straight into a slot.  Primaries and secondaries are
//! first turned into [`TrackInitializer`]s on a fixed-capacity stack; at the
//! start of each step [`initialize_tracks`] pops as many as there are vacant
//! slots.  Whatever does not fit waits for a later step.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`initializer`] | `Primary`, `TrackInitializer` and its parts                |
//! | [`state`]       | `InitParams`, `InitializerBuffer`, `TrackInitStateData`, `PrimaryStateData` |
//! | [`extend`]      | the four queue kernels                                     |
//! | [`error`]       | `InitError`, `InitResult`                                  |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                       |
//! |------------|--------------------------------------------------------------|
//! | `parallel` | Primary conversion and slot writes run on Rayon's pool.      |

pub mod error;
pub mod extend;
pub mod initializer;
pub mod state;

#[cfg(test)]
mod tests;

pub use error::{InitError, InitResult};
pub use extend::{extend_from_primaries, extend_from_secondaries, initialize_tracks, insert_primaries};
pub use initializer::{
    GeoTrackInitializer, ParticleTrackInitializer, Primary, SimTrackInitializer, TrackInitializer,
};
pub use state::{InitParams, InitializerBuffer, PrimaryStateData, TrackInitStateData};
