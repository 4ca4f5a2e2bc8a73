use std::fmt;

use tokio::sync::broadcast;
use tracing::trace;

use super::DiscoveryEmitter;
use crate::types::DiscoveryEvent;

/// In-process bus that fans discovery events out to every subscriber.
///
/// Events sent while nobody listens are dropped. A subscriber that falls
/// more than `capacity` events behind loses the oldest ones and observes
/// `RecvError::Lagged` on its next receive.
pub struct InProcDiscoveryBus {
    sender: broadcast::Sender<DiscoveryEvent>,
    capacity: usize,
}

impl fmt::Debug for InProcDiscoveryBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcDiscoveryBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl InProcDiscoveryBus {
    /// Bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Attach a new listener; it sees events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.sender.subscribe()
    }

    /// Number of attached listeners.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl DiscoveryEmitter for InProcDiscoveryBus {
    fn emit(&self, event: DiscoveryEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(path = %event.path.display(), "discovery event dropped: no listeners");
        }
    }
}
