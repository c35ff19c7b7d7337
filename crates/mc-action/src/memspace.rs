//! Memory-space markers that select a backend for [`CoreState`].

use crate::{Action, ActionError, ActionResult, CoreParams, CoreState};

/// A place where track state can live.
///
/// The stepping loop is written once over `M: MemSpace`; the marker decides
/// which [`Action`] entry point runs and whether the state can be built at
/// all.
pub trait MemSpace: Sized + Send + Sync + 'static {
    const NAME: &'static str;

    /// Fail with [`ActionError::NotConfigured`] when this backend is not
    /// compiled in.
    fn check_available() -> ActionResult<()>;

    fn dispatch(
        action: &dyn Action,
        params: &CoreParams,
        state:  &mut CoreState<Self>,
    ) -> ActionResult<()>;
}

/// Host memory, stepped serially or on the Rayon pool.
#[derive(Copy, Clone, Debug, Default)]
pub struct Host;

/// Accelerator memory.  No device backend is built in, so state
/// construction always fails with `NotConfigured`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Device;

impl MemSpace for Host {
    const NAME: &'static str = "host";

    fn check_available() -> ActionResult<()> {
        Ok(())
    }

    fn dispatch(
        action: &dyn Action,
        params: &CoreParams,
        state:  &mut CoreState<Self>,
    ) -> ActionResult<()> {
        action.step_host(params, state)
    }
}

impl MemSpace for Device {
    const NAME: &'static str = "device";

    fn check_available() -> ActionResult<()> {
        Err(ActionError::NotConfigured(
            "device memory space (no device backend is compiled in)".into(),
        ))
    }

    fn dispatch(
        action: &dyn Action,
        params: &CoreParams,
        state:  &mut CoreState<Self>,
    ) -> ActionResult<()> {
        action.step_device(params, state)
    }
}
