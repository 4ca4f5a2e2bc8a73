mod discovery;
mod watched_root;

pub use discovery::{DiscoveryEvent, FILE_DISCOVERED_EVENT};
pub use watched_root::WatchedRoot;
