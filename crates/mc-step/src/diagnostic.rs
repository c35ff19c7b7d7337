//! Optional post-step tally: how often each action limited each particle's
//! step.

use std::sync::atomic::{AtomicU64, Ordering};

use mc_action::{Action, ActionOrder, ActionResult, CoreParams, CoreState, Host};
use mc_core::{ActionId, ParticleId};

/// Counts `(post-step action, particle)` pairs over every active track at
/// the end of the post-step bucket.
///
/// Lanes bump shared atomic counters, so the tally is the same serially and
/// on the Rayon pool.
pub struct ActionDiagnostic {
    id:            ActionId,
    num_actions:   usize,
    num_particles: usize,
    counts:        Vec<AtomicU64>,
}

impl ActionDiagnostic {
    pub const LABEL: &'static str = "action-diagnostic";

    /// `num_actions` must cover every registered action, including this one.
    pub fn new(id: ActionId, num_actions: usize, num_particles: usize) -> Self {
        Self {
            id,
            num_actions,
            num_particles,
            counts: (0..num_actions * num_particles).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn index(&self, action: ActionId, particle: ParticleId) -> Option<usize> {
        let a = action.get()?.index();
        let p = particle.get()?.index();
        (a < self.num_actions && p < self.num_particles).then(|| a * self.num_particles + p)
    }

    pub fn count(&self, action: ActionId, particle: ParticleId) -> u64 {
        self.index(action, particle)
            .map_or(0, |i| self.counts[i].load(Ordering::Relaxed))
    }

    /// Snapshot as `counts[action][particle]`.
    pub fn counts(&self) -> Vec<Vec<u64>> {
        if self.num_particles == 0 {
            return vec![Vec::new(); self.num_actions];
        }
        self.counts
            .chunks(self.num_particles)
            .map(|row| row.iter().map(|c| c.load(Ordering::Relaxed)).collect())
            .collect()
    }

    pub fn clear(&self) {
        for c in &self.counts {
            c.store(0, Ordering::Relaxed);
        }
    }
}

impl Action for ActionDiagnostic {
    fn action_id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        Self::LABEL
    }

    fn description(&self) -> &str {
        "count post-step actions per particle type"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::UserPost
    }

    fn step_host(&self, _params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
        let n = state.size();
        state.launch(0..n, |_, track| {
            if !track.status().is_active() {
                return;
            }
            if let Some(i) = self.index(*track.sim.post_step_action, track.particle_id()) {
                self.counts[i].fetch_add(1, Ordering::Relaxed);
            }
        });
        Ok(())
    }
}
