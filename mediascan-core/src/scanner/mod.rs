pub mod fs;
pub mod prober;
pub mod walker;

pub use fs::{FileSystem, FsMetadata, InMemoryFs, ReadDirStream, RealFs};
pub use prober::{ProbeOutcome, probe_path};
pub use walker::{DirectoryWalker, WalkSummary};
