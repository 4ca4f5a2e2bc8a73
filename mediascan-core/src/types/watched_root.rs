use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directory registered for recursive media discovery.
///
/// `path` is the identity of the record; the store rejects a second root
/// with the same path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedRoot {
    /// Absolute filesystem path of the root.
    pub path: PathBuf,
    /// When the root was registered.
    pub created_at: DateTime<Utc>,
}

impl WatchedRoot {
    /// Build a root registered now.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            created_at: Utc::now(),
        }
    }
}
