use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;

/// Work that must settle before the process counts as initialised.
#[async_trait]
pub trait StartupHook: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Run the hook; returning signals completion to the host.
    async fn on_startup(&self) -> Result<()>;
}

/// Ordered set of startup hooks.
#[derive(Default)]
pub struct Lifecycle {
    hooks: Vec<Arc<dyn StartupHook>>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.hooks.iter().map(|hook| hook.name()).collect();
        f.debug_struct("Lifecycle").field("hooks", &names).finish()
    }
}

impl Lifecycle {
    /// Empty lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; hooks run in registration order.
    pub fn register(&mut self, hook: Arc<dyn StartupHook>) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    /// Run every hook to completion. A failing hook is logged and does not
    /// stop the ones after it. Returns the number of hooks that failed.
    pub async fn run_startup(&self) -> usize {
        let mut failed = 0;
        for hook in &self.hooks {
            match hook.on_startup().await {
                Ok(()) => info!(hook = hook.name(), "startup hook completed"),
                Err(err) => {
                    failed += 1;
                    warn!(hook = hook.name(), error = %err, "startup hook failed");
                }
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscoveryError;
    use std::sync::Mutex;

    struct Named {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl StartupHook for Named {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn on_startup(&self) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                Err(DiscoveryError::Internal("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn hooks_run_in_order_and_failures_do_not_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut lifecycle = Lifecycle::new();
        for (name, fail) in [("first", false), ("second", true), ("third", false)] {
            lifecycle.register(Arc::new(Named {
                name,
                fail,
                log: log.clone(),
            }));
        }

        let failed = lifecycle.run_startup().await;

        assert_eq!(failed, 1);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
