use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the registry and its persistence collaborators.
///
/// Filesystem failures met while walking never travel through this type; the
/// scanner logs them and records the offending path on the walk summary.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Underlying I/O failure outside of a walk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The path is already registered as a watched root.
    #[error("Watched root already registered: {}", .0.display())]
    DuplicateRoot(PathBuf),

    /// No watched root is registered under the path.
    #[error("Watched root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The path cannot be registered as a watched root.
    #[error("Invalid watched root {}: {reason}", path.display())]
    InvalidPath {
        /// Offending path as supplied by the caller.
        path: PathBuf,
        /// Human readable rejection reason.
        reason: String,
    },

    /// The persistence layer failed or is unreachable.
    #[error("Database error: {0}")]
    Database(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for DiscoveryError {
    fn from(err: sqlx::Error) -> Self {
        DiscoveryError::Database(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
