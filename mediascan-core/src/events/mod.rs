//! Fire-and-forget dispatch of discovery events.
//!
//! The walker only sees [`DiscoveryEmitter`]; whether an event ends up in a
//! broadcast channel, a queue, or nowhere at all is the emitter's business.

mod bus;

pub use bus::InProcDiscoveryBus;

use crate::types::DiscoveryEvent;

/// Announces discovered files to downstream listeners.
///
/// `emit` is synchronous so dispatch can never suspend a walk. Delivery is
/// at-most-once: no acknowledgement, no retry.
pub trait DiscoveryEmitter: Send + Sync {
    /// Dispatch `event` without waiting for any listener.
    fn emit(&self, event: DiscoveryEvent);
}
