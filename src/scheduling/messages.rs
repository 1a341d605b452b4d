use crate::db;
use crate::db::models::PollMessage;
use crate::error::{FieldError, PollError};
use crate::scheduling::retry::retry_when_busy;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

pub async fn post_message(
    pool: &db::DbPool,
    poll_id: Uuid,
    voter_id: Uuid,
    message: &str,
) -> Result<Uuid, PollError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(PollError::Validation(vec![FieldError::new(
            "message",
            "Message is required",
        )]));
    }

    let message_id = retry_when_busy(|| store_message(pool, poll_id, voter_id, message)).await?;

    info!(%poll_id, %voter_id, %message_id, "message posted");
    Ok(message_id)
}

async fn store_message(
    pool: &db::DbPool,
    poll_id: Uuid,
    voter_id: Uuid,
    message: &str,
) -> Result<Uuid, PollError> {
    let mut tx = pool.begin().await?;
    db::get_poll(&mut tx, poll_id)
        .await?
        .ok_or(PollError::NotFound("Poll"))?;
    db::get_voter(&mut tx, voter_id)
        .await?
        .ok_or(PollError::NotFound("Voter"))?;
    let message_id = db::insert_message(&mut tx, poll_id, voter_id, message, Utc::now()).await?;
    tx.commit().await?;
    Ok(message_id)
}

pub async fn list_messages(pool: &db::DbPool, poll_id: Uuid) -> Result<Vec<PollMessage>, PollError> {
    let mut conn = pool.acquire().await?;
    db::get_poll(&mut conn, poll_id)
        .await?
        .ok_or(PollError::NotFound("Poll"))?;
    Ok(db::list_messages(&mut conn, poll_id).await?)
}
