//! Session identity. There are no credentials: signing in as a voter just
//! pins their id to the session, which every handler then passes explicitly
//! into the scheduling core.

use crate::error::PollError;
use crate::scheduling::directory;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

const VOTER_KEY: &str = "voter_id";

#[derive(Debug, Deserialize)]
pub struct RegisterVoterRequest {
    pub name: String,
}

pub async fn voter_from_session(session: &Session) -> Result<Uuid, PollError> {
    session
        .get::<Uuid>(VOTER_KEY)
        .await
        .map_err(|_| PollError::Unauthorized)?
        .ok_or(PollError::Unauthorized)
}

pub async fn register_voter(
    Extension(app_state): Extension<AppState>,
    Json(payload): Json<RegisterVoterRequest>,
) -> Result<impl IntoResponse, PollError> {
    let voter = directory::register_voter(&app_state.db, &payload.name).await?;
    Ok((StatusCode::OK, Json(voter)))
}

pub async fn list_voters(
    Extension(app_state): Extension<AppState>,
) -> Result<impl IntoResponse, PollError> {
    let voters = directory::list_voters(&app_state.db).await?;
    Ok((StatusCode::OK, Json(voters)))
}

pub async fn login(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(voter_id): Path<Uuid>,
) -> Result<impl IntoResponse, PollError> {
    let voter = directory::find_voter(&app_state.db, voter_id).await?;

    session
        .cycle_id()
        .await
        .map_err(|e| PollError::DatabaseError(e.to_string()))?;
    session
        .insert(VOTER_KEY, voter.id)
        .await
        .map_err(|e| PollError::DatabaseError(e.to_string()))?;

    info!(voter_id = %voter.id, name = %voter.name, "signed in");
    Ok((StatusCode::OK, Json(voter)))
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, PollError> {
    session
        .flush()
        .await
        .map_err(|e| PollError::DatabaseError(e.to_string()))?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Signed out"
        })),
    ))
}
