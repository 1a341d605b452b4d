use crate::db::models::{Poll, PollSummary};
use sqlx::types::chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Error, SqliteConnection};
use uuid::Uuid;

pub async fn insert_poll(conn: &mut SqliteConnection, poll: &Poll) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO polls (id, creator_id, title, description, start_date, end_date, created_at, modified_at, closed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(poll.id)
    .bind(poll.creator_id)
    .bind(&poll.title)
    .bind(poll.description.as_deref())
    .bind(poll.start_date)
    .bind(poll.end_date)
    .bind(poll.created_at)
    .bind(poll.modified_at)
    .bind(poll.closed_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_poll(conn: &mut SqliteConnection, poll_id: Uuid) -> Result<Option<Poll>, Error> {
    sqlx::query_as::<_, Poll>(
        "SELECT id, creator_id, title, description, start_date, end_date, created_at, modified_at, closed_at
         FROM polls WHERE id = ?",
    )
    .bind(poll_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn update_poll_details(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
    title: &str,
    description: Option<&str>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    modified_at: DateTime<Utc>,
) -> Result<(), Error> {
    sqlx::query(
        "UPDATE polls SET title = ?, description = ?, start_date = ?, end_date = ?, modified_at = ?
         WHERE id = ?",
    )
    .bind(title)
    .bind(description)
    .bind(start_date)
    .bind(end_date)
    .bind(modified_at)
    .bind(poll_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Sets `closed_at` only if the poll is still open. Returns whether a row changed.
pub async fn close_poll(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
    closed_at: DateTime<Utc>,
) -> Result<bool, Error> {
    let result = sqlx::query("UPDATE polls SET closed_at = ? WHERE id = ? AND closed_at IS NULL")
        .bind(closed_at)
        .bind(poll_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_poll(conn: &mut SqliteConnection, poll_id: Uuid) -> Result<(), Error> {
    sqlx::query("DELETE FROM polls WHERE id = ?")
        .bind(poll_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn list_poll_summaries(conn: &mut SqliteConnection) -> Result<Vec<PollSummary>, Error> {
    sqlx::query_as::<_, PollSummary>(
        r#"
        SELECT p.id, p.creator_id, p.title, p.description, p.start_date, p.end_date,
               p.created_at, p.modified_at, p.closed_at,
               (SELECT v.name FROM invitations i JOIN voters v ON v.id = i.voter_id
                 WHERE i.poll_id = p.id AND i.role = 'chairman') AS chairman,
               (SELECT COUNT(*) FROM invitations i WHERE i.poll_id = p.id) AS invitee_count,
               (SELECT COUNT(*) FROM invitations i
                 WHERE i.poll_id = p.id AND i.voted_at IS NOT NULL) AS voted_count
        FROM polls p
        ORDER BY p.created_at DESC
        "#,
    )
    .fetch_all(&mut *conn)
    .await
}
