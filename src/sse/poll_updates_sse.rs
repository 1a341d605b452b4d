use crate::polls::SlotResultResponse;
use crate::scheduling;
use crate::sse::models::PollEvent;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Path},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, warn};
use uuid::Uuid;

async fn results_event(app_state: &AppState, poll_id: Uuid, name: &'static str) -> Event {
    match scheduling::get_results(&app_state.db, poll_id).await {
        Ok(results) => Event::default().event(name).data(
            json!({
                "poll_id": poll_id,
                "results": SlotResultResponse::from_tallies(results),
            })
            .to_string(),
        ),
        Err(e) => {
            error!(%poll_id, "failed to load results for live feed: {}", e);
            Event::default()
                .event("error")
                .data(json!({"error": e.to_string()}).to_string())
        }
    }
}

/// Live results for one poll: an `init` snapshot, then a fresh `results`
/// snapshot whenever someone's availability changes.
pub async fn poll_updates_sse(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.events.subscribe();

    let stream = async_stream::stream! {
        yield Ok(results_event(&app_state, poll_id, "init").await);

        loop {
            match rx.recv().await {
                Ok(event) if event.poll_id() != poll_id => {}
                Ok(PollEvent::AvailabilityChanged(_)) => {
                    yield Ok(results_event(&app_state, poll_id, "results").await);
                }
                Ok(PollEvent::PollClosed(_)) => {
                    yield Ok(Event::default()
                        .event("closed")
                        .data(json!({"poll_id": poll_id}).to_string()));
                    yield Ok(results_event(&app_state, poll_id, "results").await);
                }
                Ok(PollEvent::PollDeleted(_)) => {
                    yield Ok(Event::default()
                        .event("deleted")
                        .data(json!({"poll_id": poll_id}).to_string()));
                    break;
                }
                Ok(PollEvent::PollCreated(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%poll_id, skipped, "live feed lagged, sending fresh snapshot");
                    yield Ok(results_event(&app_state, poll_id, "results").await);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
