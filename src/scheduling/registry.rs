use crate::db;
use crate::db::models::TimeSlot;
use crate::error::{PollError, is_unique_violation};
use chrono::{DateTime, Utc};
use sqlx::{Connection, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

/// Returns the poll's slot for exactly `(start_at, end_at)`, creating it if needed.
///
/// The insert runs in a savepoint so that losing a race against another
/// submission (the UNIQUE constraint fires) leaves the caller's transaction
/// intact; the winner's row is then read back once.
pub async fn resolve_or_create(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
) -> Result<Uuid, PollError> {
    if start_at >= end_at {
        return Err(PollError::InvalidRange(format!(
            "slot starting {start_at} does not end after it starts"
        )));
    }

    if let Some(slot_id) = db::find_time_slot_id(conn, poll_id, start_at, end_at).await? {
        return Ok(slot_id);
    }

    let slot = TimeSlot {
        id: Uuid::new_v4(),
        poll_id,
        start_at,
        end_at,
    };

    let mut savepoint = conn.begin().await?;
    match db::insert_time_slot(&mut savepoint, &slot).await {
        Ok(()) => {
            savepoint.commit().await?;
            debug!(%poll_id, slot_id = %slot.id, "created time slot");
            Ok(slot.id)
        }
        Err(e) if is_unique_violation(&e) => {
            savepoint.rollback().await?;
            debug!(%poll_id, "time slot created concurrently, re-reading");
            db::find_time_slot_id(conn, poll_id, start_at, end_at)
                .await?
                .ok_or_else(|| PollError::DatabaseError("time slot vanished after conflict".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::test_support::{seed_poll, test_pool};
    use crate::scheduling::calendar::TimeRange;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn same_range_resolves_to_same_slot() {
        let pool = test_pool().await;
        let (poll_id, _, _) = seed_poll(&pool).await;
        let (start, end) = TimeRange::Morning
            .resolve(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap())
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let first = resolve_or_create(&mut conn, poll_id, start, end).await.unwrap();
        let second = resolve_or_create(&mut conn, poll_id, start, end).await.unwrap();
        assert_eq!(first, second);

        let slots = db::find_slots_for_poll(&mut conn, poll_id).await.unwrap();
        assert_eq!(slots.len(), 1);
    }

    #[tokio::test]
    async fn insert_conflict_inside_transaction_reads_existing_row() {
        let pool = test_pool().await;
        let (poll_id, _, _) = seed_poll(&pool).await;
        let (start, end) = TimeRange::Afternoon
            .resolve(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
            .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let existing = TimeSlot {
            id: Uuid::new_v4(),
            poll_id,
            start_at: start,
            end_at: end,
        };
        db::insert_time_slot(&mut tx, &existing).await.unwrap();

        // A duplicate insert must fail at the storage layer, not just in code.
        let duplicate = TimeSlot {
            id: Uuid::new_v4(),
            ..existing.clone()
        };
        let mut savepoint = tx.begin().await.unwrap();
        let err = db::insert_time_slot(&mut savepoint, &duplicate).await.unwrap_err();
        assert!(is_unique_violation(&err));
        savepoint.rollback().await.unwrap();

        let resolved = resolve_or_create(&mut tx, poll_id, start, end).await.unwrap();
        assert_eq!(resolved, existing.id);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_empty_range() {
        let pool = test_pool().await;
        let (poll_id, _, _) = seed_poll(&pool).await;
        let (start, _) = TimeRange::Morning
            .resolve(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap())
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let err = resolve_or_create(&mut conn, poll_id, start, start).await.unwrap_err();
        assert!(matches!(err, PollError::InvalidRange(_)));
    }
}
