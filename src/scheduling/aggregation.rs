use crate::db;
use crate::db::models::{SlotVote, TimeSlot};
use crate::error::PollError;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct SlotTally {
    pub slot: TimeSlot,
    pub voters: Vec<String>,
}

/// Folds ledger rows onto slots. Slot order is kept; names keep row order.
/// Rows for slots not in `slots` are ignored.
pub fn tally(slots: Vec<TimeSlot>, votes: Vec<SlotVote>) -> Vec<SlotTally> {
    let mut by_slot: HashMap<Uuid, Vec<String>> = HashMap::new();
    for vote in votes {
        by_slot.entry(vote.time_slot_id).or_default().push(vote.voter_name);
    }

    slots
        .into_iter()
        .map(|slot| SlotTally {
            voters: by_slot.remove(&slot.id).unwrap_or_default(),
            slot,
        })
        .collect()
}

/// Every slot of the poll with the names of the voters currently holding it,
/// earliest submission first. Slots nobody holds any more are still listed.
pub async fn get_results(pool: &db::DbPool, poll_id: Uuid) -> Result<Vec<SlotTally>, PollError> {
    let mut conn = pool.acquire().await?;
    db::get_poll(&mut conn, poll_id)
        .await?
        .ok_or(PollError::NotFound("Poll"))?;

    let slots = db::find_slots_for_poll(&mut conn, poll_id).await?;
    let votes = db::find_slot_votes_for_poll(&mut conn, poll_id).await?;
    Ok(tally(slots, votes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::calendar::TimeRange;
    use crate::scheduling::ledger::{SlotSelection, submit_vote};
    use crate::scheduling::test_support::{date, seed_poll, test_pool, voter};

    fn slot(poll_id: Uuid, range: TimeRange, day: u32) -> TimeSlot {
        let (start_at, end_at) = range.resolve(date(2024, 1, day)).unwrap();
        TimeSlot {
            id: Uuid::new_v4(),
            poll_id,
            start_at,
            end_at,
        }
    }

    #[test]
    fn tally_keeps_empty_slots_and_row_order() {
        let poll_id = Uuid::new_v4();
        let a = slot(poll_id, TimeRange::Morning, 8);
        let b = slot(poll_id, TimeRange::Afternoon, 8);
        let votes = vec![
            SlotVote { time_slot_id: a.id, voter_name: "Mali".into() },
            SlotVote { time_slot_id: a.id, voter_name: "Anan".into() },
            SlotVote { time_slot_id: Uuid::new_v4(), voter_name: "Ghost".into() },
        ];

        let result = tally(vec![a.clone(), b.clone()], votes);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].slot, a);
        assert_eq!(result[0].voters, vec!["Mali", "Anan"]);
        assert_eq!(result[1].slot, b);
        assert!(result[1].voters.is_empty());
    }

    #[tokio::test]
    async fn end_to_end_single_slot() {
        let pool = test_pool().await;
        let (poll_id, _, u2) = seed_poll(&pool).await;

        // 2024-01-09 is the Tuesday of the Mon..Wed poll.
        submit_vote(&pool, poll_id, u2, &[SlotSelection::new("2024-01-09", "morning")])
            .await
            .unwrap();

        let results = get_results(&pool, poll_id).await.unwrap();
        assert_eq!(results.len(), 1);
        let (start, end) = TimeRange::Morning.resolve(date(2024, 1, 9)).unwrap();
        assert_eq!(results[0].slot.start_at, start);
        assert_eq!(results[0].slot.end_at, end);
        assert_eq!(results[0].voters, vec!["U2"]);
    }

    #[tokio::test]
    async fn replaced_votes_leave_orphan_slots_listed() {
        let pool = test_pool().await;
        let (poll_id, u1, u2) = seed_poll(&pool).await;

        submit_vote(&pool, poll_id, u2, &[SlotSelection::new("2024-01-08", "morning")])
            .await
            .unwrap();
        submit_vote(&pool, poll_id, u1, &[SlotSelection::new("2024-01-10", "morning")])
            .await
            .unwrap();
        submit_vote(&pool, poll_id, u2, &[SlotSelection::new("2024-01-10", "morning")])
            .await
            .unwrap();

        let results = get_results(&pool, poll_id).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].voters.is_empty());
        // U2 resubmitted last, so comes after U1.
        assert_eq!(results[1].voters, vec!["U1", "U2"]);
    }

    #[tokio::test]
    async fn results_follow_submission_order() {
        let pool = test_pool().await;
        let (poll_id, u1, u2) = seed_poll(&pool).await;
        let u3 = voter(&pool, "Aaron").await;
        let pick = [SlotSelection::new("2024-01-08", "afternoon")];

        submit_vote(&pool, poll_id, u2, &pick).await.unwrap();
        submit_vote(&pool, poll_id, u3, &pick).await.unwrap();
        submit_vote(&pool, poll_id, u1, &pick).await.unwrap();

        let results = get_results(&pool, poll_id).await.unwrap();
        assert_eq!(results[0].voters, vec!["U2", "Aaron", "U1"]);
    }

    #[tokio::test]
    async fn unknown_poll_is_not_found() {
        let pool = test_pool().await;
        let err = get_results(&pool, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PollError::NotFound("Poll")));
    }
}
