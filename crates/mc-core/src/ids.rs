//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash`.  The inner integer is `pub` so SoA
//! columns can be indexed with `id.0 as usize`, but callers should prefer
//! `.index()`.
//!
//! Every ID reserves its maximum value as an "unset" state.  Code never
//! compares against that value directly; it asks [`is_valid`] instead, which
//! keeps "not present" distinct from "present with id 0".
//!
//! [`is_valid`]: TrackId::is_valid

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// The unset state.  Sorts after every valid ID.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// `true` unless this is the unset state.
            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self.0 != <$inner>::MAX
            }

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// `Some(self)` if valid.
            #[inline(always)]
            pub fn get(self) -> Option<$name> {
                self.is_valid().then_some(self)
            }
        }

        impl Default for $name {
            /// Unset, so freshly allocated columns are visibly empty.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", stringify!($name), self.0)
                } else {
                    write!(f, "{}(-)", stringify!($name))
                }
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Per-event track identifier.  Assigned once at creation, never reused.
    pub struct TrackId(u32);
}

typed_id! {
    /// Index of a storage slot in the SoA track arrays.  Reused after the
    /// occupying track dies.
    pub struct TrackSlotId(u32);
}

typed_id! {
    /// Index into the thread → slot mapping.  Sort utilities reorder the
    /// mapping, never the slot data.
    pub struct ThreadId(u32);
}

typed_id! {
    /// Registered action.  Allocated monotonically by the action registry.
    pub struct ActionId(u32);
}

typed_id! {
    /// Source event a track descends from.
    pub struct EventId(u32);
}

typed_id! {
    /// Particle species in the particle table.
    pub struct ParticleId(u32);
}

typed_id! {
    /// Index of a primary within its source batch.
    pub struct PrimaryId(u32);
}
