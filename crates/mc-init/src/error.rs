use mc_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    /// Fatal: the fixed initializer buffer cannot hold the new tracks.
    #[error(
        "insufficient initializer capacity ({capacity}) with {existing} queued \
         initializers for {requested} new tracks"
    )]
    Capacity {
        capacity:  usize,
        existing:  usize,
        requested: usize,
    },

    /// A known limitation rather than a bug.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("invalid primary at index {index}: {reason}")]
    InvalidPrimary {
        index:  usize,
        reason: String,
    },

    #[error("initializer {0} is missing its track or event id")]
    InvalidInitializer(usize),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl InitError {
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, InitError::NotImplemented(_))
    }
}

pub type InitResult<T> = Result<T, InitError>;
