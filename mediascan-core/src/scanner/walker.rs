use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{Id as TaskId, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fs::FileSystem;
use super::prober::{ProbeOutcome, probe_path};
use crate::config::ScannerConfig;
use crate::events::DiscoveryEmitter;

/// Diagnostics gathered while a walk ran.
///
/// Callers only learn that a walk *completed*; failures below the root are
/// already logged and merely listed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Discovery events emitted.
    pub files_announced: usize,
    /// Directories whose entries were listed.
    pub directories_listed: usize,
    /// Paths that could not be statted or listed.
    pub failed_paths: Vec<PathBuf>,
    /// Shutdown was requested before the tree was exhausted.
    pub cancelled: bool,
}

impl WalkSummary {
    /// Fold another summary into this one.
    pub fn merge(&mut self, other: WalkSummary) {
        self.files_announced += other.files_announced;
        self.directories_listed += other.directories_listed;
        self.failed_paths.extend(other.failed_paths);
        self.cancelled |= other.cancelled;
    }
}

#[derive(Debug)]
enum WorkItem {
    List(PathBuf),
    Probe(PathBuf),
}

impl WorkItem {
    fn path(&self) -> &Path {
        match self {
            WorkItem::List(path) | WorkItem::Probe(path) => path,
        }
    }
}

#[derive(Debug)]
enum WorkResult {
    Listed {
        children: Vec<PathBuf>,
    },
    /// Listing failed part way; entries read before the failure survive.
    ListFailed {
        dir: PathBuf,
        children: Vec<PathBuf>,
    },
    Probed {
        path: PathBuf,
        outcome: ProbeOutcome,
    },
}

/// Walks directory trees and announces every non-directory entry.
///
/// Each walk keeps its own queue of pending work (list a directory, probe a
/// path) and runs items as tasks. Before a task is spawned it takes a permit
/// from a semaphore shared by every walk on this walker, which bounds the
/// number of filesystem operations in flight process-wide. A walk is complete
/// once its queue is empty and none of its tasks remain.
pub struct DirectoryWalker {
    fs: Arc<dyn FileSystem>,
    emitter: Arc<dyn DiscoveryEmitter>,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    shutdown: CancellationToken,
}

impl fmt::Debug for DirectoryWalker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryWalker")
            .field("max_concurrency", &self.max_concurrency)
            .field("available_permits", &self.permits.available_permits())
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl DirectoryWalker {
    /// Walker over `fs` announcing into `emitter`, bounded by `config`.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        emitter: Arc<dyn DiscoveryEmitter>,
        config: &ScannerConfig,
    ) -> Self {
        let max_concurrency = config.effective_concurrency();
        Self {
            fs,
            emitter,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop starting new work. Running walks drain their in-flight tasks and
    /// complete with [`WalkSummary::cancelled`] set.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled on shutdown, for callers that want to stop alongside.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// List `dir` and probe every entry, recursing into subdirectories.
    ///
    /// Never fails: an unreadable directory or entry anywhere in the tree is
    /// logged and skipped while the rest of the tree is still visited.
    pub async fn walk(&self, dir: &Path) -> WalkSummary {
        let started = Instant::now();
        let summary = self.drive(WorkItem::List(dir.to_path_buf())).await;

        info!(
            root = %dir.display(),
            files = summary.files_announced,
            directories = summary.directories_listed,
            failures = summary.failed_paths.len(),
            cancelled = summary.cancelled,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "walk completed"
        );
        summary
    }

    /// Probe a single path: announce it if it is not a directory, otherwise
    /// walk it. Completes only after any such sub-walk has.
    pub async fn probe(&self, path: &Path) -> WalkSummary {
        self.drive(WorkItem::Probe(path.to_path_buf())).await
    }

    async fn drive(&self, first: WorkItem) -> WalkSummary {
        let mut summary = WalkSummary::default();
        let mut pending = VecDeque::from([first]);
        let mut in_flight: JoinSet<WorkResult> = JoinSet::new();
        let mut task_paths: HashMap<TaskId, PathBuf> = HashMap::new();

        loop {
            while let Some(item) = pending.pop_front() {
                let Some(permit) = self.acquire().await else {
                    debug!(
                        path = %item.path().display(),
                        dropped = pending.len() + 1,
                        "walker shut down; abandoning queued work"
                    );
                    summary.cancelled = true;
                    pending.clear();
                    break;
                };

                let path = item.path().to_path_buf();
                let fs = Arc::clone(&self.fs);
                let emitter = Arc::clone(&self.emitter);
                let handle = in_flight.spawn(async move {
                    let _permit = permit;
                    run_item(item, fs.as_ref(), emitter.as_ref()).await
                });
                task_paths.insert(handle.id(), path);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };

            match joined {
                Ok((id, result)) => {
                    task_paths.remove(&id);
                    let follow_up = summary.record(result);
                    if !follow_up.is_empty() {
                        if self.shutdown.is_cancelled() {
                            summary.cancelled = true;
                        } else {
                            pending.extend(follow_up);
                        }
                    }
                }
                Err(err) => {
                    let path = task_paths.remove(&err.id()).unwrap_or_default();
                    warn!(path = %path.display(), error = %err, "discovery task aborted");
                    summary.failed_paths.push(path);
                }
            }
        }

        summary
    }

    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
        }
    }
}

impl WalkSummary {
    /// Account for a finished item and return the work it spawns.
    fn record(&mut self, result: WorkResult) -> Vec<WorkItem> {
        match result {
            WorkResult::Listed { children } => {
                self.directories_listed += 1;
                children.into_iter().map(WorkItem::Probe).collect()
            }
            WorkResult::ListFailed { dir, children } => {
                self.failed_paths.push(dir);
                children.into_iter().map(WorkItem::Probe).collect()
            }
            WorkResult::Probed { path, outcome } => match outcome {
                ProbeOutcome::Directory => vec![WorkItem::List(path)],
                ProbeOutcome::Announced => {
                    self.files_announced += 1;
                    Vec::new()
                }
                ProbeOutcome::Failed => {
                    self.failed_paths.push(path);
                    Vec::new()
                }
            },
        }
    }
}

async fn run_item(
    item: WorkItem,
    fs: &dyn FileSystem,
    emitter: &dyn DiscoveryEmitter,
) -> WorkResult {
    match item {
        WorkItem::Probe(path) => {
            let outcome = probe_path(fs, emitter, &path).await;
            WorkResult::Probed { path, outcome }
        }
        WorkItem::List(dir) => list_children(fs, dir).await,
    }
}

async fn list_children(fs: &dyn FileSystem, dir: PathBuf) -> WorkResult {
    let mut entries = match fs.read_dir(&dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                path = %dir.display(),
                error = %err,
                "failed to list directory; skipping subtree"
            );
            return WorkResult::ListFailed {
                dir,
                children: Vec::new(),
            };
        }
    };

    let mut children = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(child)) => children.push(child),
            Ok(None) => return WorkResult::Listed { children },
            Err(err) => {
                warn!(
                    path = %dir.display(),
                    error = %err,
                    read = children.len(),
                    "directory listing interrupted; probing entries read so far"
                );
                return WorkResult::ListFailed { dir, children };
            }
        }
    }
}
