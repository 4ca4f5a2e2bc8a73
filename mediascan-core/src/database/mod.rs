//! Persistence of watched roots.
//!
//! [`ports`] defines what the registry needs from a store; adapters live
//! beside it and must not leak storage types into the registry.

pub mod infrastructure;
pub mod memory;
pub mod ports;

pub use memory::InMemoryWatchedRootStore;
pub use ports::watched_roots::WatchedRootStore;

#[cfg(feature = "database")]
pub use infrastructure::postgres::PostgresWatchedRootStore;
