//! Errors raised while posting synthetic key-downs.
use std::result::Result as StdResult;

use thiserror::Error;

/// Result of a key-down post.
pub type Result<T> = StdResult<T, Error>;

/// Why a key-down could not be posted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// CoreGraphics refused to create the HID-state event source.
    #[error("Failed to create CGEventSource")]
    EventSource,
    /// CoreGraphics refused to build the key-down event.
    #[error("Failed to create CGEvent")]
    EventCreate,
    /// Posting needs Accessibility, and it has not been granted.
    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),
}
