//! Base error type shared by the `mc-*` crates.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `From`.

use thiserror::Error;

/// Errors raised while validating configuration or setup data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// A backend or collaborator that was asked for is not available.
    #[error("not configured: {0}")]
    NotConfigured(String),
}

/// Shorthand result type.
pub type CoreResult<T> = Result<T, CoreError>;

/// Return `CoreError::Validation` from the enclosing function unless `cond`
/// holds.
#[macro_export]
macro_rules! validate {
    ($cond:expr, $($fmt:tt)+) => {
        if !$cond {
            return Err($crate::CoreError::Validation(format!($($fmt)+)).into());
        }
    };
}
