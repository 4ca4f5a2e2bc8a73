use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{error, info};

use crate::error::Result;
use crate::lifecycle::StartupHook;
use crate::registry::WatchRegistry;
use crate::scanner::WalkSummary;

/// Outcome of replaying walks over every registered root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescanSummary {
    /// Roots that were walked.
    pub roots: usize,
    /// Combined walk diagnostics.
    pub walk: WalkSummary,
    /// The registry could not be enumerated; nothing was walked.
    pub registry_unavailable: bool,
}

/// Re-walks every registered root when the process starts.
///
/// Walking is side-effect only, so replaying it over an unchanged tree just
/// announces the same files again.
#[derive(Debug, Clone)]
pub struct StartupRescanner {
    registry: Arc<WatchRegistry>,
}

impl StartupRescanner {
    /// Rescanner over `registry`.
    pub fn new(registry: Arc<WatchRegistry>) -> Self {
        Self { registry }
    }

    /// Walk every registered root, each independently and concurrently.
    ///
    /// Failing to enumerate roots is logged and abandons this rescan; it is
    /// not an error for the caller. A root whose walk degrades never keeps
    /// the other roots from being walked.
    pub async fn rescan_all(&self) -> RescanSummary {
        let started = Instant::now();

        let roots = match self.registry.list_roots().await {
            Ok(roots) => roots,
            Err(err) => {
                error!(error = %err, "could not enumerate watched roots; skipping startup rescan");
                return RescanSummary {
                    registry_unavailable: true,
                    ..RescanSummary::default()
                };
            }
        };

        info!(roots = roots.len(), "startup rescan started");
        let walker = self.registry.walker();
        let walks = roots.iter().map(|root| walker.walk(&root.path));

        let mut summary = RescanSummary {
            roots: roots.len(),
            ..RescanSummary::default()
        };
        for walk in join_all(walks).await {
            summary.walk.merge(walk);
        }

        info!(
            roots = summary.roots,
            files = summary.walk.files_announced,
            failures = summary.walk.failed_paths.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "startup rescan completed"
        );
        summary
    }
}

#[async_trait]
impl StartupHook for StartupRescanner {
    fn name(&self) -> &'static str {
        "startup-rescan"
    }

    async fn on_startup(&self) -> Result<()> {
        self.rescan_all().await;
        Ok(())
    }
}
