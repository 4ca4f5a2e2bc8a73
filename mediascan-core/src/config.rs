use serde::{Deserialize, Serialize};

/// Knobs that tune discovery walks.
///
/// All fields carry defaults so a config file may specify any subset.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Upper bound on in-flight filesystem operations (metadata queries and
    /// directory listings), shared by every walk running in the process.
    pub max_concurrent_operations: usize,
    /// Probe with link-following metadata. A symlink to a directory is then
    /// walked like the directory itself; there is no cycle detection.
    pub follow_symlinks: bool,
    /// Buffered discovery events per listener before the oldest are dropped.
    pub event_channel_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: 64,
            follow_symlinks: true,
            event_channel_capacity: 4_096,
        }
    }
}

impl ScannerConfig {
    /// Concurrency bound clamped to at least one permit.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrent_operations.max(1)
    }
}
