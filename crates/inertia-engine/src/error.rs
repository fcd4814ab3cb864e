use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the inertia engine and its ports.
///
/// None of these are fatal: the engine degrades to "no acceleration".
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or denied system permission.
    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),

    /// The platform event source could not be subscribed to.
    #[error("Event subscription failed: {0}")]
    Subscribe(String),

    /// A synthetic key event could not be posted.
    #[error("Failed to synthesize key event: {0}")]
    Synthesize(String),

    /// The engine was constructed outside a Tokio runtime.
    #[error("No Tokio runtime available for repeat tasks")]
    NoRuntime,
}
