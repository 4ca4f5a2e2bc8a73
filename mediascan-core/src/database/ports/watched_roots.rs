use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::WatchedRoot;

/// Repository port for watched roots.
///
/// Implementations own path uniqueness: `insert` must reject an existing
/// path atomically (a storage constraint or a single critical section),
/// never through a separate lookup the caller performs first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WatchedRootStore: Send + Sync {
    /// Persist a new root. Fails with
    /// [`DiscoveryError::DuplicateRoot`](crate::DiscoveryError::DuplicateRoot)
    /// if the path is already stored.
    async fn insert(&self, root: WatchedRoot) -> Result<()>;

    /// Fetch one root by path.
    async fn find(&self, path: &Path) -> Result<Option<WatchedRoot>>;

    /// Snapshot of every stored root.
    async fn find_all(&self) -> Result<Vec<WatchedRoot>>;

    /// Remove a root; returns whether anything was removed.
    async fn delete(&self, path: &Path) -> Result<bool>;
}
