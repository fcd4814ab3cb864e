//! Error handling for the inertiad binary.

use std::{io, path::PathBuf, result};

use thiserror::Error;

/// Convenient result type for inertiad operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while running the daemon.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The settings file is not valid RON.
    #[error("Failed to parse settings {path}: {source}")]
    SettingsParse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parser error.
        source: ron::error::SpannedError,
    },
    /// Settings could not be serialized.
    #[error("Failed to serialize settings: {0}")]
    SettingsWrite(#[from] ron::Error),
    /// No default settings path could be derived from the environment.
    #[error("HOME is not set; pass --config")]
    NoHome,
    /// Refused to overwrite an existing settings file.
    #[error("{0} already exists; pass --force to overwrite")]
    SettingsExist(PathBuf),
    /// The engine could not be constructed.
    #[error("Engine error: {0}")]
    Engine(#[from] inertia_engine::Error),
    /// `start` refused to run.
    #[error("Engine did not start: {0}")]
    NotStarted(String),
    /// This build has no platform backend.
    #[error("No event tap backend on this platform")]
    Unsupported,
}
