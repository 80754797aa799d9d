//! Event-driven waiting helpers

use bulk_import::{DrainSummary, Event};
use std::time::Duration;
use tokio::sync::broadcast;

/// Wait for the next `QueueDrained` event, collecting everything before it
///
/// Panics if the queue does not drain within `timeout`.
pub async fn wait_for_drain(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
) -> (DrainSummary, Vec<Event>) {
    let mut seen = Vec::new();
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::QueueDrained { summary }) => return summary,
                Ok(event) => seen.push(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await;

    match result {
        Ok(summary) => (summary, seen),
        Err(_) => panic!("queue did not drain within {timeout:?}; events so far: {seen:?}"),
    }
}
