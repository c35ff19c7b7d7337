//! The `Action` trait: the only thing the stepping loop knows about physics.

use mc_core::ActionId;

use crate::{ActionError, ActionOrder, ActionResult, CoreParams, CoreState, Device, Host};

/// One unit of per-step work.
///
/// An action is registered once, keeps its own id, and is immutable
/// afterwards.  Each invocation covers every lane of the state; the action
/// skips slots it does not apply to (usually by status or selected action).
///
/// # Per-lane contract
///
/// Inside a launch a lane may only touch its own [`TrackView`] and read the
/// shared [`CoreParams`].  Recoverable per-track problems are reported by
/// marking the track errored, never by returning `Err`.  `Err` aborts the
/// rest of the step.
///
/// # Example
///
/// ```rust,ignore
/// struct CountAlive { id: ActionId, seen: AtomicUsize }
///
/// impl Action for CountAlive {
///     fn action_id(&self) -> ActionId { self.id }
///     fn label(&self) -> &str { "count-alive" }
///     fn description(&self) -> &str { "count alive tracks after the post-step" }
///     fn order(&self) -> ActionOrder { ActionOrder::UserPost }
///     fn step_host(&self, _: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()> {
///         state.launch(0..state.size(), |_, view| {
///             if view.is_alive() { self.seen.fetch_add(1, Ordering::Relaxed); }
///         });
///         Ok(())
///     }
/// }
/// ```
///
/// [`TrackView`]: mc_track::TrackView
pub trait Action: Send + Sync + 'static {
    fn action_id(&self) -> ActionId;

    /// Unique, human-readable key used for lookup.
    fn label(&self) -> &str;

    fn description(&self) -> &str;

    fn order(&self) -> ActionOrder;

    fn step_host(&self, params: &CoreParams, state: &mut CoreState<Host>) -> ActionResult<()>;

    /// Device-memory step.  No device backend is compiled into this crate,
    /// so the default reports that.
    fn step_device(&self, _params: &CoreParams, _state: &mut CoreState<Device>) -> ActionResult<()> {
        Err(ActionError::NotConfigured(format!(
            "device stepping for action '{}'",
            self.label()
        )))
    }
}

/// Hands out consecutive action ids, starting from the registry's next id.
///
/// Used by processes to number the models they build before those models
/// are registered, in the same order.
#[derive(Clone, Debug)]
pub struct ActionIdIter {
    next: u32,
}

impl ActionIdIter {
    pub fn new(first: ActionId) -> Self {
        Self { next: first.0 }
    }

    /// The id the next call to `next` will return.
    pub fn peek(&self) -> ActionId {
        ActionId(self.next)
    }
}

impl Iterator for ActionIdIter {
    type Item = ActionId;

    fn next(&mut self) -> Option<ActionId> {
        let id = ActionId(self.next);
        if !id.is_valid() {
            return None;
        }
        self.next += 1;
        Some(id)
    }
}
