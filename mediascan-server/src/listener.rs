use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mediascan_core::DiscoveryEvent;

/// Log every discovery until `cancel` fires or the bus closes.
///
/// Stands in for the analyzers that normally subscribe to the bus. On
/// cancellation, events already buffered are still logged. The task yields
/// the number of events it saw.
pub fn spawn_discovery_logger(
    mut rx: broadcast::Receiver<DiscoveryEvent>,
    cancel: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut seen = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    for event in drain_buffered(&mut rx) {
                        seen += 1;
                        log_discovery(&event);
                    }
                    break;
                }
                received = rx.recv() => match received {
                    Ok(event) => {
                        seen += 1;
                        log_discovery(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "discovery listener lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!(seen, "discovery listener stopped");
        seen
    })
}

fn log_discovery(event: &DiscoveryEvent) {
    info!(event = event.name(), path = %event.path.display(), "file discovered");
}

/// Drain whatever is already buffered, without waiting.
pub fn drain_buffered(rx: &mut broadcast::Receiver<DiscoveryEvent>) -> Vec<DiscoveryEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "discovery buffer overflowed; events dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    events
}
