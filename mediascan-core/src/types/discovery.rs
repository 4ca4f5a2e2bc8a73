use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name under which discovery events are announced to analyzers.
pub const FILE_DISCOVERED_EVENT: &str = "media.fileDiscovered";

/// A non-directory entry observed by a walk.
///
/// Ephemeral: handed to listeners and forgotten. Serializes as
/// `{ "path": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    /// Full path of the discovered entry.
    pub path: PathBuf,
}

impl DiscoveryEvent {
    /// Event for `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Event name for dispatch.
    pub fn name(&self) -> &'static str {
        FILE_DISCOVERED_EVENT
    }
}
