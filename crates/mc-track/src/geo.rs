//! Geometry state and the navigation boundary.
//!
//! Navigation proper is an external collaborator.  The core only needs the
//! distance to the next boundary along a ray and an inside/outside test,
//! expressed by the [`Navigator`] trait.
//!
//! Navigators are owned exactly once, by a [`WorldRegistry`] keyed by
//! [`GeoKind`].  Everything else stores the `GeoKind` and resolves it through
//! the registry, which reports a missing world as `NotConfigured` instead of
//! dangling.

use mc_core::{CoreError, CoreResult, Real, Real3};
use rustc_hash::FxHashMap;

use crate::store::select;

// ── Navigator ─────────────────────────────────────────────────────────────────

/// Minimal navigation interface consumed by the stepping core.
pub trait Navigator: Send + Sync + 'static {
    fn label(&self) -> &str;

    /// Distance from `pos` along unit vector `dir` to the next boundary.
    /// `Real::INFINITY` if there is none.
    fn find_next_step(&self, pos: &Real3, dir: &Real3) -> Real;

    /// `true` if `pos` is outside the world (the track has escaped).
    fn is_outside(&self, pos: &Real3) -> bool;
}

/// An unbounded world with no boundaries.
pub struct InfiniteWorld;

impl Navigator for InfiniteWorld {
    fn label(&self) -> &str {
        "infinite"
    }

    fn find_next_step(&self, _pos: &Real3, _dir: &Real3) -> Real {
        Real::INFINITY
    }

    fn is_outside(&self, _pos: &Real3) -> bool {
        false
    }
}

/// An axis-aligned box centered on the origin.
pub struct BoxWorld {
    pub half_width: Real3,
}

impl BoxWorld {
    /// Relative tolerance for deciding a point sits on the surface.
    const BUMP: Real = 1e-9;

    pub fn cube(half_width: Real) -> Self {
        Self { half_width: [half_width; 3] }
    }
}

impl Navigator for BoxWorld {
    fn label(&self) -> &str {
        "box"
    }

    fn find_next_step(&self, pos: &Real3, dir: &Real3) -> Real {
        (0..3)
            .filter(|&i| dir[i] != 0.0)
            .map(|i| {
                let face = self.half_width[i].copysign(dir[i]);
                ((face - pos[i]) / dir[i]).max(0.0)
            })
            .fold(Real::INFINITY, Real::min)
    }

    fn is_outside(&self, pos: &Real3) -> bool {
        (0..3).any(|i| pos[i].abs() >= self.half_width[i] * (1.0 - Self::BUMP))
    }
}

// ── WorldRegistry ─────────────────────────────────────────────────────────────

/// Opaque key for a loaded world.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum GeoKind {
    Infinite,
    Box,
    /// Application-provided navigator, distinguished by a small tag.
    User(u16),
}

/// Sole owner of every loaded navigator.
#[derive(Default)]
pub struct WorldRegistry {
    worlds: FxHashMap<GeoKind, Box<dyn Navigator>>,
}

impl WorldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the world for `kind`, returning the old one.
    pub fn insert(
        &mut self,
        kind:  GeoKind,
        world: Box<dyn Navigator>,
    ) -> Option<Box<dyn Navigator>> {
        self.worlds.insert(kind, world)
    }

    /// Resolve `kind`, failing if it was never loaded or has been removed.
    pub fn get(&self, kind: GeoKind) -> CoreResult<&dyn Navigator> {
        self.worlds
            .get(&kind)
            .map(|w| w.as_ref())
            .ok_or_else(|| CoreError::NotConfigured(format!("no world loaded for {kind:?}")))
    }

    pub fn contains(&self, kind: GeoKind) -> bool {
        self.worlds.contains_key(&kind)
    }

    pub fn remove(&mut self, kind: GeoKind) -> Option<Box<dyn Navigator>> {
        self.worlds.remove(&kind)
    }
}

impl std::fmt::Debug for WorldRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.worlds.iter().map(|(kind, world)| (kind, world.label())))
            .finish()
    }
}

// ── GeoStateData ──────────────────────────────────────────────────────────────

/// Per-slot position (cm) and unit direction.
#[derive(Clone, Debug, Default)]
pub struct GeoStateData {
    pub pos: Vec<Real3>,
    pub dir: Vec<Real3>,
}

impl GeoStateData {
    pub fn resize(&mut self, size: usize) {
        self.pos = vec![[0.0; 3]; size];
        self.dir = vec![[0.0, 0.0, 1.0]; size];
    }

    pub fn views_mut(&mut self) -> impl Iterator<Item = GeoView<'_>> {
        self.pos
            .iter_mut()
            .zip(self.dir.iter_mut())
            .map(|(pos, dir)| GeoView { pos, dir })
    }

    pub fn select_mut<I>(&mut self, slots: I) -> impl Iterator<Item = GeoView<'_>>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut pos = self.pos.iter_mut();
        let mut dir = self.dir.iter_mut();
        select(slots, move |skip| Some(GeoView { pos: pos.nth(skip)?, dir: dir.nth(skip)? }))
    }
}

/// Exclusive borrow of one slot's geometry columns.
#[derive(Debug)]
pub struct GeoView<'a> {
    pub pos: &'a mut Real3,
    pub dir: &'a mut Real3,
}

impl GeoView<'_> {
    /// Move `distance` along the current direction.
    #[inline]
    pub fn move_by(&mut self, distance: Real) {
        for i in 0..3 {
            self.pos[i] += self.dir[i] * distance;
        }
    }
}
