use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::database::WatchedRootStore;
use crate::error::{DiscoveryError, Result};
use crate::scanner::{DirectoryWalker, WalkSummary};
use crate::types::WatchedRoot;

/// The set of watched roots, and the walks their registration triggers.
///
/// Registration is two explicit steps composed here (persist the record,
/// then walk it) so the store stays a plain CRUD collaborator.
pub struct WatchRegistry {
    store: Arc<dyn WatchedRootStore>,
    walker: Arc<DirectoryWalker>,
}

impl fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("walker", &self.walker)
            .finish_non_exhaustive()
    }
}

impl WatchRegistry {
    /// Registry persisting into `store` and walking with `walker`.
    pub fn new(store: Arc<dyn WatchedRootStore>, walker: Arc<DirectoryWalker>) -> Self {
        Self { store, walker }
    }

    /// Walker shared with the rescanner.
    pub fn walker(&self) -> &Arc<DirectoryWalker> {
        &self.walker
    }

    /// Register `path` and walk it.
    ///
    /// Returns only after the initial walk of the new root has completed, so
    /// every file under it has been announced by the time the caller hears
    /// "registered". A duplicate path fails with
    /// [`DiscoveryError::DuplicateRoot`] and triggers no walk. A root that
    /// turns out to be unreadable still registers; the walk logs the
    /// failure and completes.
    pub async fn add_root<P: Into<PathBuf>>(&self, path: P) -> Result<WatchedRoot> {
        let root = WatchedRoot::new(validate_root_path(path.into())?);

        self.store.insert(root.clone()).await?;
        info!(root = %root.path.display(), "watched root registered; starting initial walk");

        let summary = self.walker.walk(&root.path).await;
        if !summary.failed_paths.is_empty() {
            warn!(
                root = %root.path.display(),
                failures = summary.failed_paths.len(),
                "initial walk completed with unreadable entries"
            );
        }
        Ok(root)
    }

    /// Snapshot of every registered root; order carries no meaning.
    pub async fn list_roots(&self) -> Result<Vec<WatchedRoot>> {
        self.store.find_all().await
    }

    /// Unregister `path`. Files already announced under it are not retracted.
    pub async fn remove_root(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        if self.store.delete(&path).await? {
            info!(root = %path.display(), "watched root removed");
            Ok(())
        } else {
            Err(DiscoveryError::RootNotFound(path))
        }
    }

    /// Walk one registered root on demand.
    pub async fn rescan_root(&self, path: &Path) -> Result<WalkSummary> {
        let root = self
            .store
            .find(&normalize(path))
            .await?
            .ok_or_else(|| DiscoveryError::RootNotFound(path.to_path_buf()))?;
        Ok(self.walker.walk(&root.path).await)
    }
}

fn validate_root_path(path: PathBuf) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(DiscoveryError::InvalidPath {
            path,
            reason: "path is empty".to_string(),
        });
    }
    if !path.is_absolute() {
        return Err(DiscoveryError::InvalidPath {
            path,
            reason: "path must be absolute".to_string(),
        });
    }
    Ok(normalize(&path))
}

/// Store key for `path`: rebuilt from its components, so trailing slashes
/// and `.` segments do not produce a second key for the same directory.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScannerConfig;
    use crate::database::InMemoryWatchedRootStore;
    use crate::database::ports::watched_roots::MockWatchedRootStore;
    use crate::events::InProcDiscoveryBus;
    use crate::scanner::InMemoryFs;

    fn registry_over(
        fs: InMemoryFs,
        store: Arc<dyn WatchedRootStore>,
    ) -> (WatchRegistry, Arc<InProcDiscoveryBus>) {
        let bus = Arc::new(InProcDiscoveryBus::new(256));
        let walker = Arc::new(DirectoryWalker::new(
            Arc::new(fs),
            bus.clone(),
            &ScannerConfig::default(),
        ));
        (WatchRegistry::new(store, walker), bus)
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<crate::DiscoveryEvent>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        while let Ok(event) = rx.try_recv() {
            paths.push(event.path);
        }
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn relative_paths_are_rejected_before_touching_the_store() {
        let mut store = MockWatchedRootStore::new();
        store.expect_insert().never();
        let (registry, _bus) = registry_over(InMemoryFs::new(), Arc::new(store));

        let err = registry.add_root("music").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidPath { .. }));

        let err = registry.add_root("").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn store_failure_surfaces_and_skips_the_walk() {
        let mut fs = InMemoryFs::new();
        fs.add_file("/music/song1.mp3", 1);
        let mut store = MockWatchedRootStore::new();
        store
            .expect_insert()
            .times(1)
            .returning(|_| Err(DiscoveryError::Database("connection refused".into())));
        let (registry, bus) = registry_over(fs, Arc::new(store));
        let mut rx = bus.subscribe();

        let err = registry.add_root("/music").await.unwrap_err();

        assert!(matches!(err, DiscoveryError::Database(_)));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn store_key_is_the_normalized_path() {
        let mut store = MockWatchedRootStore::new();
        store
            .expect_insert()
            .withf(|root| root.path.as_os_str() == "/music/albums")
            .times(1)
            .returning(|_| Ok(()));
        let (registry, _bus) = registry_over(InMemoryFs::new(), Arc::new(store));

        let registered = registry.add_root("/music/./albums/").await.unwrap();

        assert_eq!(registered.path.as_os_str(), "/music/albums");
    }

    #[tokio::test]
    async fn trailing_slash_names_the_same_root() {
        let mut fs = InMemoryFs::new();
        fs.add_file("/music/song1.mp3", 1);
        let (registry, bus) = registry_over(fs, Arc::new(InMemoryWatchedRootStore::new()));
        let mut rx = bus.subscribe();

        registry.add_root("/music").await.unwrap();
        assert_eq!(drain(&mut rx), vec![PathBuf::from("/music/song1.mp3")]);

        let err = registry.add_root("/music/").await.unwrap_err();

        assert!(matches!(err, DiscoveryError::DuplicateRoot(ref p) if p.as_os_str() == "/music"));
        assert!(drain(&mut rx).is_empty());
        let roots = registry.list_roots().await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].path.as_os_str(), "/music");
    }

    #[tokio::test]
    async fn remove_and_rescan_accept_the_unnormalized_spelling() {
        let mut fs = InMemoryFs::new();
        fs.add_file("/music/song1.mp3", 1);
        let (registry, _bus) = registry_over(fs, Arc::new(InMemoryWatchedRootStore::new()));
        registry.add_root("/music").await.unwrap();

        let summary = registry.rescan_root(Path::new("/music/")).await.unwrap();
        assert_eq!(summary.files_announced, 1);

        registry.remove_root(Path::new("/music/")).await.unwrap();
        assert!(registry.list_roots().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rescan_root_requires_registration() {
        let mut fs = InMemoryFs::new();
        fs.add_file("/music/song1.mp3", 1);
        let (registry, bus) = registry_over(fs, Arc::new(InMemoryWatchedRootStore::new()));

        let err = registry.rescan_root(Path::new("/music")).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::RootNotFound(_)));

        registry.add_root("/music").await.unwrap();
        let mut rx = bus.subscribe();
        let summary = registry.rescan_root(Path::new("/music")).await.unwrap();

        assert_eq!(summary.files_announced, 1);
        assert_eq!(drain(&mut rx), vec![PathBuf::from("/music/song1.mp3")]);
    }

    #[tokio::test]
    async fn removing_an_unknown_root_is_an_error() {
        let (registry, _bus) =
            registry_over(InMemoryFs::new(), Arc::new(InMemoryWatchedRootStore::new()));

        let err = registry.remove_root(Path::new("/music")).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::RootNotFound(_)));
    }
}
