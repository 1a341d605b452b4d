use crate::db::models::PollMessage;
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::{Error, SqliteConnection};
use uuid::Uuid;

pub async fn insert_message(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
    voter_id: Uuid,
    message: &str,
    created_at: DateTime<Utc>,
) -> Result<Uuid, Error> {
    let message_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO poll_messages (id, poll_id, voter_id, message, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(message_id)
    .bind(poll_id)
    .bind(voter_id)
    .bind(message)
    .bind(created_at)
    .execute(&mut *conn)
    .await?;

    Ok(message_id)
}

pub async fn list_messages(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
) -> Result<Vec<PollMessage>, Error> {
    sqlx::query_as::<_, PollMessage>(
        r#"
        SELECT m.id, m.poll_id, m.voter_id, v.name AS voter_name, m.message, m.created_at
        FROM poll_messages m JOIN voters v ON v.id = m.voter_id
        WHERE m.poll_id = ?
        ORDER BY m.created_at, m.rowid
        "#,
    )
    .bind(poll_id)
    .fetch_all(&mut *conn)
    .await
}
