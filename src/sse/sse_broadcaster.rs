use crate::sse::models::{EventSender, PollEvent};
use tokio::sync::broadcast;
use tracing::debug;

pub fn create_event_broadcaster() -> EventSender {
    let (tx, _rx) = broadcast::channel(100);
    tx
}

/// Sends to whoever is listening; having no listeners is not an error.
pub fn publish(tx: &EventSender, event: PollEvent) {
    if let Err(broadcast::error::SendError(event)) = tx.send(event) {
        debug!(poll_id = %event.poll_id(), "no live subscribers for poll event");
    }
}
