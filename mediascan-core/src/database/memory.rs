use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ports::watched_roots::WatchedRootStore;
use crate::error::{DiscoveryError, Result};
use crate::types::WatchedRoot;

/// Process-local store. Uniqueness is enforced under the write lock, so
/// concurrent inserts of the same path cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryWatchedRootStore {
    roots: RwLock<HashMap<PathBuf, WatchedRoot>>,
}

impl InMemoryWatchedRootStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatchedRootStore for InMemoryWatchedRootStore {
    async fn insert(&self, root: WatchedRoot) -> Result<()> {
        let mut roots = self.roots.write().await;
        match roots.entry(root.path.clone()) {
            Entry::Occupied(_) => Err(DiscoveryError::DuplicateRoot(root.path)),
            Entry::Vacant(slot) => {
                slot.insert(root);
                Ok(())
            }
        }
    }

    async fn find(&self, path: &Path) -> Result<Option<WatchedRoot>> {
        Ok(self.roots.read().await.get(path).cloned())
    }

    async fn find_all(&self) -> Result<Vec<WatchedRoot>> {
        let mut roots: Vec<WatchedRoot> = self.roots.read().await.values().cloned().collect();
        roots.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(roots)
    }

    async fn delete(&self, path: &Path) -> Result<bool> {
        Ok(self.roots.write().await.remove(path).is_some())
    }
}
