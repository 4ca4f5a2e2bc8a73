use std::fmt;
use std::sync::Arc;

use mediascan_core::{
    database::WatchedRootStore,
    events::InProcDiscoveryBus,
    lifecycle::Lifecycle,
    registry::WatchRegistry,
    rescan::StartupRescanner,
    scanner::{DirectoryWalker, RealFs},
};

use crate::config::Config;

/// Every long-lived service of the daemon, wired once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub bus: Arc<InProcDiscoveryBus>,
    pub walker: Arc<DirectoryWalker>,
    pub registry: Arc<WatchRegistry>,
    pub rescanner: Arc<StartupRescanner>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("bus", &self.bus)
            .field("walker", &self.walker)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    pub fn new(config: &Config, store: Arc<dyn WatchedRootStore>) -> Self {
        let scanner = &config.scanner;
        let bus = Arc::new(InProcDiscoveryBus::new(scanner.event_channel_capacity));
        let fs = Arc::new(RealFs::with_follow_symlinks(scanner.follow_symlinks));
        let walker = Arc::new(DirectoryWalker::new(fs, bus.clone(), scanner));
        let registry = Arc::new(WatchRegistry::new(store, walker.clone()));
        let rescanner = Arc::new(StartupRescanner::new(registry.clone()));

        Self {
            bus,
            walker,
            registry,
            rescanner,
        }
    }

    /// Startup hooks the daemon runs before it reports ready.
    pub fn lifecycle(&self) -> Lifecycle {
        let mut lifecycle = Lifecycle::new();
        lifecycle.register(self.rescanner.clone());
        lifecycle
    }

    /// Stop in-flight walks. Already-announced files stay announced.
    pub fn shutdown(&self) {
        self.walker.shutdown();
    }
}
