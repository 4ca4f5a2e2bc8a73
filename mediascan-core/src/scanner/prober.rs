use std::path::Path;

use tracing::{trace, warn};

use super::fs::FileSystem;
use crate::events::DiscoveryEmitter;
use crate::types::DiscoveryEvent;

/// What probing a single path led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The path is a directory; the caller must walk it before the probe
    /// counts as complete.
    Directory,
    /// The path is not a directory and a discovery event was emitted for it.
    Announced,
    /// Metadata could not be read. Already logged; the caller carries on.
    Failed,
}

/// Classify `path` and announce it when it is not a directory.
///
/// Every non-directory entry (regular file, link, device, socket) is
/// announced; filtering by extension is left to the analyzers. A metadata
/// failure is logged and reported as [`ProbeOutcome::Failed`], never as an
/// error, so one unreadable entry cannot abort a walk.
pub async fn probe_path(
    fs: &dyn FileSystem,
    emitter: &dyn DiscoveryEmitter,
    path: &Path,
) -> ProbeOutcome {
    let metadata = match fs.metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read metadata; skipping entry");
            return ProbeOutcome::Failed;
        }
    };

    if metadata.is_dir {
        return ProbeOutcome::Directory;
    }

    trace!(
        path = %path.display(),
        len = metadata.len,
        regular = metadata.is_file,
        symlink = metadata.is_symlink,
        "file discovered"
    );
    emitter.emit(DiscoveryEvent::new(path));
    ProbeOutcome::Announced
}
