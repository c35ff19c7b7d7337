//! Ordered, label-indexed collection of registered actions.

use std::fmt;
use std::sync::Arc;

use mc_core::ActionId;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{Action, ActionError, ActionResult};

/// Every action known to a stepper, indexed by id and label.
///
/// Ids are dense: the action with id `n` is the `n`-th one inserted.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<dyn Action>>,
    labels:  FxHashMap<String, ActionId>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next inserted action must carry.
    #[inline]
    pub fn next_id(&self) -> ActionId {
        ActionId(self.actions.len() as u32)
    }

    /// Register an action.
    ///
    /// # Errors
    ///
    /// - [`ActionError::IdMismatch`] if `action.action_id()` is not
    ///   [`next_id`][Self::next_id].
    /// - [`ActionError::DuplicateLabel`] if the label is taken.
    pub fn insert(&mut self, action: Arc<dyn Action>) -> ActionResult<ActionId> {
        let expected = self.next_id();
        let id = action.action_id();
        if id != expected {
            return Err(ActionError::IdMismatch {
                label: action.label().to_owned(),
                expected,
                got: id,
            });
        }
        if self.labels.contains_key(action.label()) {
            return Err(ActionError::DuplicateLabel(action.label().to_owned()));
        }

        debug!(%id, label = action.label(), order = %action.order(), "registered action");
        self.labels.insert(action.label().to_owned(), id);
        self.actions.push(action);
        Ok(id)
    }

    #[inline]
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn action(&self, id: ActionId) -> Option<&Arc<dyn Action>> {
        self.actions.get(id.index())
    }

    pub fn id_to_label(&self, id: ActionId) -> Option<&str> {
        self.action(id).map(|a| a.label())
    }

    /// Id of the action with `label`, or `ActionId::INVALID`.
    pub fn find_action(&self, label: &str) -> ActionId {
        self.labels.get(label).copied().unwrap_or(ActionId::INVALID)
    }

    /// Actions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Action>> {
        self.actions.iter()
    }

    /// Actions in execution order: by bucket, then registration order.
    pub fn ordered(&self) -> Vec<Arc<dyn Action>> {
        let mut ordered = self.actions.clone();
        ordered.sort_by_key(|a| a.order());
        ordered
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.actions.iter().map(|a| (a.action_id().0, a.label(), a.order())))
            .finish()
    }
}
