use mc_action::ActionError;
use mc_core::CoreError;
use mc_init::InitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("stepper configuration error: {0}")]
    Config(String),

    /// `Stepper::run` hit `CoreConfig::max_steps` with work remaining.
    #[error("run did not finish within {max_steps} steps ({active} active tracks, {queued} queued)")]
    StepLimit {
        max_steps: u64,
        active:    usize,
        queued:    usize,
    },

    /// An action returned an error; the rest of the step was skipped.
    #[error("step {step} aborted in action '{label}'")]
    Dispatch {
        step:   u64,
        label:  String,
        #[source]
        source: ActionError,
    },

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StepError {
    /// A known limitation (e.g. a second pending primary batch).
    pub fn is_not_implemented(&self) -> bool {
        match self {
            StepError::Init(e) => e.is_not_implemented(),
            StepError::Action(e) | StepError::Dispatch { source: e, .. } => e.is_not_implemented(),
            _ => false,
        }
    }

    /// The requested backend or collaborator is missing.
    pub fn is_not_configured(&self) -> bool {
        match self {
            StepError::Core(CoreError::NotConfigured(_)) => true,
            StepError::Action(e) | StepError::Dispatch { source: e, .. } => e.is_not_configured(),
            _ => false,
        }
    }
}

pub type StepResult<T> = Result<T, StepError>;
