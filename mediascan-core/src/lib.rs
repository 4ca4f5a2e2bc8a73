//! # mediascan core
//!
//! Discovery engine for media libraries: a persistent registry of watched
//! root directories, recursive walks over those roots, and a fire-and-forget
//! channel that announces every discovered file to downstream analyzers.
//!
//! ## Overview
//!
//! - **Path probing** ([`scanner::prober`]): classify one path and route it.
//! - **Directory walking** ([`scanner::walker`]): a bounded work-queue walk
//!   that tolerates unreadable entries anywhere in the tree.
//! - **Discovery events** ([`events`]): `media.fileDiscovered` announcements
//!   delivered at most once over an in-process broadcast bus.
//! - **Watch registry** ([`registry`]): registering a root persists it and
//!   completes only after the initial walk of that root has finished.
//! - **Startup rescan** ([`rescan`], [`lifecycle`]): re-walks every
//!   registered root once the process starts.
//!
//! ## Feature Flags
//!
//! - `database` (default): PostgreSQL adapter for the watched-root store.
//! - `pg-tests`: enables the Postgres adapter tests (needs `DATABASE_URL`).
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mediascan_core::{
//!     config::ScannerConfig,
//!     database::InMemoryWatchedRootStore,
//!     events::InProcDiscoveryBus,
//!     registry::WatchRegistry,
//!     scanner::{DirectoryWalker, RealFs},
//! };
//!
//! # async fn run() -> mediascan_core::Result<()> {
//! let config = ScannerConfig::default();
//! let bus = Arc::new(InProcDiscoveryBus::new(config.event_channel_capacity));
//! let walker = Arc::new(DirectoryWalker::new(
//!     Arc::new(RealFs::new()),
//!     bus.clone(),
//!     &config,
//! ));
//! let registry = WatchRegistry::new(Arc::new(InMemoryWatchedRootStore::new()), walker);
//!
//! let mut discoveries = bus.subscribe();
//! let root = registry.add_root("/srv/media/music").await?;
//! while let Ok(event) = discoveries.try_recv() {
//!     println!("{} discovered under {}", event.path.display(), root.path.display());
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Scanner tuning knobs.
pub mod config;

/// Watched-root persistence port and adapters.
pub mod database;

/// Error taxonomy and result alias.
pub mod error;

/// Discovery event dispatch.
pub mod events;

/// Startup extension point.
pub mod lifecycle;

/// Watched-root registration and removal.
pub mod registry;

/// Replays walks over every registered root.
pub mod rescan;

/// Filesystem access, probing and walking.
pub mod scanner;

/// Shared domain types.
pub mod types;

/// Embedded migrations for the Postgres watched-root store.
#[cfg(feature = "database")]
#[cfg_attr(docsrs, doc(cfg(feature = "database")))]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{DiscoveryError, Result};
pub use types::{DiscoveryEvent, WatchedRoot};
