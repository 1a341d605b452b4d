use crate::db::models::{SlotVote, TimeSlot, VoteRecord};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::{Error, SqliteConnection};
use uuid::Uuid;

pub async fn find_vote_record(
    conn: &mut SqliteConnection,
    invitation_id: Uuid,
) -> Result<Option<VoteRecord>, Error> {
    sqlx::query_as::<_, VoteRecord>(
        "SELECT id, invitation_id, submitted_at FROM vote_records WHERE invitation_id = ?",
    )
    .bind(invitation_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn insert_vote_record(conn: &mut SqliteConnection, record: &VoteRecord) -> Result<(), Error> {
    sqlx::query("INSERT INTO vote_records (id, invitation_id, submitted_at) VALUES (?, ?, ?)")
        .bind(record.id)
        .bind(record.invitation_id)
        .bind(record.submitted_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn touch_vote_record(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    submitted_at: DateTime<Utc>,
) -> Result<(), Error> {
    sqlx::query("UPDATE vote_records SET submitted_at = ? WHERE id = ?")
        .bind(submitted_at)
        .bind(record_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn clear_vote_slots(conn: &mut SqliteConnection, record_id: Uuid) -> Result<(), Error> {
    sqlx::query("DELETE FROM vote_record_slots WHERE vote_record_id = ?")
        .bind(record_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn attach_slot(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    slot_id: Uuid,
    position: i64,
) -> Result<(), Error> {
    sqlx::query("INSERT INTO vote_record_slots (vote_record_id, time_slot_id, position) VALUES (?, ?, ?)")
        .bind(record_id)
        .bind(slot_id)
        .bind(position)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// The slots a record currently holds, in the order they were submitted.
pub async fn find_slots_for_record(
    conn: &mut SqliteConnection,
    record_id: Uuid,
) -> Result<Vec<TimeSlot>, Error> {
    sqlx::query_as::<_, TimeSlot>(
        r#"
        SELECT s.id, s.poll_id, s.start_at, s.end_at
        FROM vote_record_slots vrs JOIN time_slots s ON s.id = vrs.time_slot_id
        WHERE vrs.vote_record_id = ?
        ORDER BY vrs.position
        "#,
    )
    .bind(record_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn find_votes_for_voter(
    conn: &mut SqliteConnection,
    voter_id: Uuid,
) -> Result<Vec<VoteRecord>, Error> {
    sqlx::query_as::<_, VoteRecord>(
        r#"
        SELECT vr.id, vr.invitation_id, vr.submitted_at
        FROM vote_records vr JOIN invitations i ON i.id = vr.invitation_id
        WHERE i.voter_id = ?
        ORDER BY vr.submitted_at
        "#,
    )
    .bind(voter_id)
    .fetch_all(&mut *conn)
    .await
}

/// Every (slot, voter name) pair for a poll, oldest submission first.
pub async fn find_slot_votes_for_poll(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
) -> Result<Vec<SlotVote>, Error> {
    sqlx::query_as::<_, SlotVote>(
        r#"
        SELECT vrs.time_slot_id, v.name AS voter_name
        FROM vote_record_slots vrs
        JOIN vote_records vr ON vr.id = vrs.vote_record_id
        JOIN invitations i ON i.id = vr.invitation_id
        JOIN voters v ON v.id = i.voter_id
        WHERE i.poll_id = ?
        ORDER BY vr.submitted_at, vr.id
        "#,
    )
    .bind(poll_id)
    .fetch_all(&mut *conn)
    .await
}
