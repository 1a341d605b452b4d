use crate::scheduling::lifecycle;
use crate::sse::models::PollEvent;
use crate::startup::AppState;
use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::error;

async fn polls_event(app_state: &AppState, name: &'static str) -> Event {
    match lifecycle::list_polls(&app_state.db).await {
        Ok(polls) => Event::default()
            .event(name)
            .data(json!({"polls": polls}).to_string()),
        Err(e) => {
            error!("failed to load polls for live feed: {}", e);
            Event::default()
                .event("error")
                .data(json!({"error": "Failed to load polls"}).to_string())
        }
    }
}

/// The poll list, re-sent whenever a poll appears, closes, disappears or
/// gains a voter.
pub async fn all_polls_sse(
    Extension(app_state): Extension<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.events.subscribe();

    let stream = async_stream::stream! {
        yield Ok(polls_event(&app_state, "init").await);

        loop {
            match rx.recv().await {
                Ok(PollEvent::PollCreated(created)) => {
                    yield Ok(Event::default()
                        .event("poll_created")
                        .data(json!({"poll_id": created.poll_id, "title": created.title}).to_string()));
                    yield Ok(polls_event(&app_state, "polls").await);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    yield Ok(polls_event(&app_state, "polls").await);
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
