use crate::db::models::TimeSlot;
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::{Error, Row, SqliteConnection};
use uuid::Uuid;

pub async fn find_time_slot_id(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
) -> Result<Option<Uuid>, Error> {
    let row = sqlx::query("SELECT id FROM time_slots WHERE poll_id = ? AND start_at = ? AND end_at = ?")
        .bind(poll_id)
        .bind(start_at)
        .bind(end_at)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| r.get::<Uuid, _>("id")))
}

pub async fn insert_time_slot(conn: &mut SqliteConnection, slot: &TimeSlot) -> Result<(), Error> {
    sqlx::query("INSERT INTO time_slots (id, poll_id, start_at, end_at) VALUES (?, ?, ?, ?)")
        .bind(slot.id)
        .bind(slot.poll_id)
        .bind(slot.start_at)
        .bind(slot.end_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn find_slots_for_poll(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
) -> Result<Vec<TimeSlot>, Error> {
    sqlx::query_as::<_, TimeSlot>(
        "SELECT id, poll_id, start_at, end_at FROM time_slots WHERE poll_id = ? ORDER BY start_at, end_at",
    )
    .bind(poll_id)
    .fetch_all(&mut *conn)
    .await
}
