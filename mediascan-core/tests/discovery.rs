use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediascan_core::{
    DiscoveryError, DiscoveryEvent, WatchedRoot,
    config::ScannerConfig,
    database::{InMemoryWatchedRootStore, WatchedRootStore},
    events::InProcDiscoveryBus,
    lifecycle::Lifecycle,
    registry::WatchRegistry,
    rescan::StartupRescanner,
    scanner::{DirectoryWalker, FileSystem, InMemoryFs, RealFs},
};
use tempfile::TempDir;
use tokio::sync::broadcast::Receiver;

struct Harness {
    bus: Arc<InProcDiscoveryBus>,
    store: Arc<InMemoryWatchedRootStore>,
    registry: Arc<WatchRegistry>,
}

impl Harness {
    fn new(fs: Arc<dyn FileSystem>) -> Self {
        let config = ScannerConfig {
            max_concurrent_operations: 8,
            ..ScannerConfig::default()
        };
        let bus = Arc::new(InProcDiscoveryBus::new(1024));
        let walker = Arc::new(DirectoryWalker::new(fs, bus.clone(), &config));
        let store = Arc::new(InMemoryWatchedRootStore::new());
        let registry = Arc::new(WatchRegistry::new(store.clone(), walker));
        Self {
            bus,
            store,
            registry,
        }
    }

    fn real() -> Self {
        Self::new(Arc::new(RealFs::new()))
    }

    fn walker(&self) -> &DirectoryWalker {
        self.registry.walker()
    }
}

fn drain(rx: &mut Receiver<DiscoveryEvent>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    while let Ok(event) = rx.try_recv() {
        paths.push(event.path);
    }
    paths
}

fn as_set(paths: Vec<PathBuf>) -> HashSet<PathBuf> {
    paths.into_iter().collect()
}

/// Builds a small library and returns the regular files it contains.
fn build_library(root: &Path) -> HashSet<PathBuf> {
    let files = [
        "song1.mp3",
        "albumX/song2.mp3",
        "albumX/disc2/song3.flac",
        "albumY/cover.jpg",
        "albumY/deep/er/still/track.ogg",
    ];
    fs::create_dir_all(root.join("empty")).unwrap();
    files
        .iter()
        .map(|relative| {
            let path = root.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"fake media").unwrap();
            path
        })
        .collect()
}

#[tokio::test]
async fn clean_tree_announces_every_file_exactly_once() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("music");
    let expected = build_library(&root);
    let harness = Harness::real();
    let mut rx = harness.bus.subscribe();

    let summary = harness.walker().walk(&root).await;

    let announced = drain(&mut rx);
    assert_eq!(announced.len(), expected.len());
    assert_eq!(as_set(announced), expected);
    assert_eq!(summary.files_announced, expected.len());
    // music, albumX, albumX/disc2, albumY, albumY/deep, deep/er, er/still, empty
    assert_eq!(summary.directories_listed, 8);
    assert!(summary.failed_paths.is_empty());
}

#[tokio::test]
async fn repeated_walks_announce_the_same_set() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("music");
    build_library(&root);
    let harness = Harness::real();
    let mut rx = harness.bus.subscribe();

    harness.walker().walk(&root).await;
    let first = as_set(drain(&mut rx));
    harness.walker().walk(&root).await;
    let second = as_set(drain(&mut rx));

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn registration_completes_after_its_walk() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("music");
    let expected = build_library(&root);
    let harness = Harness::real();
    let mut rx = harness.bus.subscribe();

    let registered = harness.registry.add_root(&root).await.unwrap();

    assert_eq!(registered.path, root);
    assert_eq!(as_set(drain(&mut rx)), expected);
    assert_eq!(
        harness.registry.list_roots().await.unwrap(),
        vec![registered]
    );
}

#[tokio::test]
async fn duplicate_registration_fails_without_walking() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("music");
    build_library(&root);
    let harness = Harness::real();
    let mut rx = harness.bus.subscribe();

    harness.registry.add_root(&root).await.unwrap();
    let first_walk = drain(&mut rx);

    let err = harness.registry.add_root(&root).await.unwrap_err();

    assert!(matches!(err, DiscoveryError::DuplicateRoot(ref p) if p == &root));
    assert!(!first_walk.is_empty());
    assert!(drain(&mut rx).is_empty());
    assert_eq!(harness.registry.list_roots().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unreadable_root_still_registers() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("not-there");
    let harness = Harness::real();
    let mut rx = harness.bus.subscribe();

    let registered = harness.registry.add_root(&missing).await.unwrap();

    assert_eq!(registered.path, missing);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn startup_replays_every_registered_root() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    let mut expected = build_library(&a);
    expected.extend(build_library(&b));

    let harness = Harness::real();
    harness.store.insert(WatchedRoot::new(&a)).await.unwrap();
    harness.store.insert(WatchedRoot::new(&b)).await.unwrap();
    let mut rx = harness.bus.subscribe();

    let mut lifecycle = Lifecycle::new();
    lifecycle.register(Arc::new(StartupRescanner::new(harness.registry.clone())));
    let failed_hooks = lifecycle.run_startup().await;

    assert_eq!(failed_hooks, 0);
    assert_eq!(as_set(drain(&mut rx)), expected);
}

#[tokio::test]
async fn rescan_summary_reports_each_root() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    let expected = build_library(&a).len() + build_library(&b).len();
    let harness = Harness::real();
    harness.store.insert(WatchedRoot::new(&a)).await.unwrap();
    harness.store.insert(WatchedRoot::new(&b)).await.unwrap();

    let summary = StartupRescanner::new(harness.registry.clone())
        .rescan_all()
        .await;

    assert_eq!(summary.roots, 2);
    assert_eq!(summary.walk.files_announced, expected);
    assert!(!summary.registry_unavailable);
}

#[tokio::test]
async fn locked_directory_is_logged_and_siblings_are_discovered() {
    let mut fs = InMemoryFs::new();
    fs.add_file("/music/song1.mp3", 4);
    fs.add_file("/music/albumX/song2.mp3", 4);
    fs.add_dir("/music/locked");
    fs.add_file("/music/locked/never.mp3", 4);
    fs.deny_listing("/music/locked");
    let harness = Harness::new(Arc::new(fs));
    let mut rx = harness.bus.subscribe();

    harness.registry.add_root("/music").await.unwrap();

    assert_eq!(
        as_set(drain(&mut rx)),
        HashSet::from([
            PathBuf::from("/music/song1.mp3"),
            PathBuf::from("/music/albumX/song2.mp3"),
        ])
    );
    let summary = harness.registry.rescan_root(Path::new("/music")).await.unwrap();
    assert_eq!(summary.failed_paths, vec![PathBuf::from("/music/locked")]);
}

#[tokio::test]
async fn removed_root_is_not_rescanned() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("music");
    build_library(&root);
    let harness = Harness::real();
    harness.registry.add_root(&root).await.unwrap();

    harness.registry.remove_root(&root).await.unwrap();
    let mut rx = harness.bus.subscribe();
    let summary = StartupRescanner::new(harness.registry.clone())
        .rescan_all()
        .await;

    assert_eq!(summary.roots, 0);
    assert!(drain(&mut rx).is_empty());
}

#[cfg(unix)]
mod symlinks {
    use super::*;
    use std::os::unix::fs::symlink;

    #[tokio::test]
    async fn dangling_link_fails_soft_among_siblings() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("music");
        let expected = build_library(&root);
        symlink(temp.path().join("gone"), root.join("albumX/broken.mp3")).unwrap();
        let harness = Harness::real();
        let mut rx = harness.bus.subscribe();

        let summary = harness.walker().walk(&root).await;

        assert_eq!(as_set(drain(&mut rx)), expected);
        assert_eq!(summary.failed_paths, vec![root.join("albumX/broken.mp3")]);
    }

    #[tokio::test]
    async fn linked_directories_are_followed_by_default() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("bonus.mp3"), b"x").unwrap();
        let root = temp.path().join("music");
        fs::create_dir_all(&root).unwrap();
        symlink(&outside, root.join("linked")).unwrap();
        let harness = Harness::real();
        let mut rx = harness.bus.subscribe();

        harness.walker().walk(&root).await;

        assert_eq!(drain(&mut rx), vec![root.join("linked/bonus.mp3")]);
    }

    #[tokio::test]
    async fn links_are_announced_not_followed_when_disabled() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("bonus.mp3"), b"x").unwrap();
        let root = temp.path().join("music");
        fs::create_dir_all(&root).unwrap();
        symlink(&outside, root.join("linked")).unwrap();
        let harness = Harness::new(Arc::new(RealFs::with_follow_symlinks(false)));
        let mut rx = harness.bus.subscribe();

        harness.walker().walk(&root).await;

        assert_eq!(drain(&mut rx), vec![root.join("linked")]);
    }
}
