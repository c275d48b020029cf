//! Error types for wsync-core

use std::path::PathBuf;

/// Result type for wsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A registry lookup found no entry for a key every caller must have
    /// registered first
    #[error("Registry invariant violated: {message}")]
    RegistryInvariant { message: String },

    /// The build artifact could not be read or decoded; retried on the next event.
    #[error("Build artifact {path} unavailable: {message}")]
    BuildInfoUnavailable { path: PathBuf, message: String },

    /// A manifest or config document has an unusable shape
    #[error("Invalid document at {path}: {message}")]
    InvalidDocument { path: PathBuf, message: String },

    /// A workspace glob from the root manifest could not be compiled
    #[error("Invalid workspace pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// An event handler task panicked or was aborted
    #[error("Event handler failed: {0}")]
    HandlerAborted(String),

    /// Filesystem watch error from notify
    #[error(transparent)]
    Watch(#[from] notify::Error),

    /// Filesystem error from wsync-fs
    #[error(transparent)]
    Fs(#[from] wsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::RegistryInvariant {
            message: message.into(),
        }
    }

    /// Errors the top-level driver must terminate on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RegistryInvariant { .. } | Self::HandlerAborted(_))
    }
}
