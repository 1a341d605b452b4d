use crate::error::PollError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 25;

/// Runs a write transaction, starting it over while SQLite reports the
/// database as busy.
///
/// SQLite transactions begin deferred: one that has already read and then
/// loses the write lock to another connection fails immediately with
/// SQLITE_BUSY (or BUSY_SNAPSHOT in WAL mode), whatever the busy timeout.
/// The only recovery is to roll back and run the whole transaction again,
/// so `attempt` must open its own transaction every time it is called.
pub async fn retry_when_busy<T, F, Fut>(mut attempt: F) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PollError>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(PollError::Busy) if tries < MAX_ATTEMPTS => {
                debug!(tries, "database busy, restarting transaction");
                tokio::time::sleep(backoff(tries)).await;
                tries += 1;
            }
            Err(PollError::Busy) => {
                warn!(tries, "database still busy, giving up");
                return Err(PollError::Busy);
            }
            other => return other,
        }
    }
}

fn backoff(tries: u32) -> Duration {
    Duration::from_millis(5 * u64::from(tries.min(10)))
}
