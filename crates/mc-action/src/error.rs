use mc_core::{ActionId, CoreError};
use mc_init::InitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("an action labeled '{0}' is already registered")]
    DuplicateLabel(String),

    #[error("action '{label}' has id {got} but the registry expected {expected}")]
    IdMismatch {
        label:    String,
        expected: ActionId,
        got:      ActionId,
    },

    /// The requested backend or collaborator is not available in this build.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// An action gave up on the whole step (not a per-track failure).
    #[error("action '{label}' failed: {reason}")]
    Failed {
        label:  String,
        reason: String,
    },

    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ActionError {
    pub fn is_not_configured(&self) -> bool {
        matches!(
            self,
            ActionError::NotConfigured(_) | ActionError::Core(CoreError::NotConfigured(_))
        )
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, ActionError::Init(e) if e.is_not_implemented())
    }
}

pub type ActionResult<T> = Result<T, ActionError>;
