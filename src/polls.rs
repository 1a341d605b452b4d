use crate::auth::voter_from_session;
use crate::error::PollError;
use crate::scheduling::calendar::to_civil;
use crate::scheduling::{self, SlotSelection, SlotTally, ledger, lifecycle, messages};
use crate::sse::{AvailabilityChanged, PollCreated, PollEvent, publish};
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct SubmitVoteRequest {
    #[serde(default)]
    pub selections: Vec<SlotSelection>,
    /// Ballot checkbox values (`YYYY-MM-DD#HH:MM - HH:MM`), as an alternative
    /// to structured selections.
    #[serde(default)]
    pub choices: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub vote_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SlotResultResponse {
    pub slot_id: Uuid,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub label: String,
    pub voters: Vec<String>,
}

impl SlotResultResponse {
    pub fn from_tallies(tallies: Vec<SlotTally>) -> Vec<Self> {
        tallies
            .into_iter()
            .map(|tally| {
                let start = to_civil(tally.slot.start_at);
                let end = to_civil(tally.slot.end_at);
                SlotResultResponse {
                    slot_id: tally.slot.id,
                    label: format!("{} to {}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M")),
                    start,
                    end,
                    voters: tally.voters,
                }
            })
            .collect()
    }
}

/// List every poll with its chairman and turnout
pub async fn list_polls(
    Extension(app_state): Extension<AppState>,
) -> Result<impl IntoResponse, PollError> {
    let polls = lifecycle::list_polls(&app_state.db).await?;
    Ok((StatusCode::OK, Json(polls)))
}

/// Create a new poll; the signed-in voter becomes its creator
pub async fn create_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<lifecycle::PollForm>,
) -> Result<impl IntoResponse, PollError> {
    let voter_id = voter_from_session(&session).await?;

    let poll = lifecycle::create_poll(&app_state.db, voter_id, payload).await?;
    publish(
        &app_state.events,
        PollEvent::PollCreated(PollCreated {
            poll_id: poll.id,
            title: poll.title.clone(),
        }),
    );

    Ok((StatusCode::CREATED, Json(poll)))
}

/// Get a poll with its roster
pub async fn get_poll(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let detail = lifecycle::get_poll(&app_state.db, poll_id).await?;
    Ok((StatusCode::OK, Json(detail)))
}

/// Edit a poll (organizers only); invitees can be added, never removed
pub async fn edit_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(poll_id): Path<Uuid>,
    Json(payload): Json<lifecycle::PollChanges>,
) -> Result<impl IntoResponse, PollError> {
    let voter_id = voter_from_session(&session).await?;
    let poll = lifecycle::edit_poll(&app_state.db, voter_id, poll_id, payload).await?;
    Ok((StatusCode::OK, Json(poll)))
}

/// Delete a poll (creator only)
pub async fn delete_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let voter_id = voter_from_session(&session).await?;
    lifecycle::delete_poll(&app_state.db, voter_id, poll_id).await?;
    publish(&app_state.events, PollEvent::PollDeleted(poll_id));

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Poll deleted"
        })),
    ))
}

/// Close a poll (organizers only)
pub async fn close_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let voter_id = voter_from_session(&session).await?;
    let closure = lifecycle::close_poll(&app_state.db, voter_id, poll_id).await?;
    if closure.newly_closed {
        publish(&app_state.events, PollEvent::PollClosed(poll_id));
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "closed_at": to_civil(closure.closed_at),
        })),
    ))
}

/// The voting form for the signed-in voter
pub async fn get_ballot(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let voter_id = voter_from_session(&session).await?;
    let ballot = lifecycle::ballot(&app_state.db, poll_id, voter_id).await?;
    Ok((StatusCode::OK, Json(ballot)))
}

/// Submit (or replace) the signed-in voter's availability
pub async fn vote_on_poll(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(poll_id): Path<Uuid>,
    Json(payload): Json<SubmitVoteRequest>,
) -> Result<impl IntoResponse, PollError> {
    let voter_id = voter_from_session(&session).await?;

    let mut selections = payload.selections;
    for choice in &payload.choices {
        selections.push(SlotSelection::from_choice_value(choice)?);
    }

    let vote_id = scheduling::submit_vote(&app_state.db, poll_id, voter_id, &selections).await?;
    publish(
        &app_state.events,
        PollEvent::AvailabilityChanged(AvailabilityChanged { poll_id, voter_id }),
    );

    Ok((
        StatusCode::OK,
        Json(VoteResponse {
            vote_id,
            message: "Availability recorded".to_string(),
        }),
    ))
}

/// Who is available for each slot
pub async fn get_results(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let results = scheduling::get_results(&app_state.db, poll_id).await?;
    Ok((StatusCode::OK, Json(SlotResultResponse::from_tallies(results))))
}

/// The signed-in voter's current vote records across polls
pub async fn my_votes(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<impl IntoResponse, PollError> {
    let voter_id = voter_from_session(&session).await?;
    let records = ledger::votes_for_voter(&app_state.db, voter_id).await?;
    Ok((StatusCode::OK, Json(records)))
}

pub async fn list_messages(
    Extension(app_state): Extension<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let messages = messages::list_messages(&app_state.db, poll_id).await?;
    Ok((StatusCode::OK, Json(messages)))
}

pub async fn post_message(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(poll_id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, PollError> {
    let voter_id = voter_from_session(&session).await?;
    let message_id =
        messages::post_message(&app_state.db, poll_id, voter_id, &payload.message).await?;

    Ok((StatusCode::CREATED, Json(json!({ "message_id": message_id }))))
}
