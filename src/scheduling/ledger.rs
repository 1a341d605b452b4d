use crate::db;
use crate::db::models::{Role, VoteRecord};
use crate::error::PollError;
use crate::scheduling::calendar::{self, TimeRange};
use crate::scheduling::registry;
use crate::scheduling::retry::retry_when_busy;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

/// One ticked checkbox as the client sent it: a day and a block label.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotSelection {
    pub date: String,
    pub time_range: String,
}

impl SlotSelection {
    pub fn new(date: impl Into<String>, time_range: impl Into<String>) -> Self {
        SlotSelection {
            date: date.into(),
            time_range: time_range.into(),
        }
    }

    /// Builds a selection from a ballot choice value (`YYYY-MM-DD#label`).
    pub fn from_choice_value(value: &str) -> Result<Self, PollError> {
        let (date, range) = calendar::parse_choice_value(value)?;
        Ok(SlotSelection::new(date.format("%Y-%m-%d").to_string(), range.label()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ResolvedSelection {
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
}

/// Checks every selection against the poll's ballot and turns it into an
/// instant pair. Repeated selections keep their first position.
fn resolve_selections(
    business_days: &[NaiveDate],
    selections: &[SlotSelection],
) -> Result<Vec<ResolvedSelection>, PollError> {
    let allowed: HashSet<NaiveDate> = business_days.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(selections.len());

    for selection in selections {
        let date = calendar::parse_date(&selection.date)?;
        let range = TimeRange::parse(&selection.time_range)?;
        if !allowed.contains(&date) {
            return Err(PollError::InvalidRange(format!(
                "{date} is not a business day of this poll"
            )));
        }
        let (start_at, end_at) = range.resolve(date)?;
        let slot = ResolvedSelection { start_at, end_at };
        if seen.insert(slot) {
            resolved.push(slot);
        }
    }

    Ok(resolved)
}

/// Records `voter_id`'s availability for a poll, replacing whatever they
/// submitted before. Either every change commits or none does.
pub async fn submit_vote(
    pool: &db::DbPool,
    poll_id: Uuid,
    voter_id: Uuid,
    selections: &[SlotSelection],
) -> Result<Uuid, PollError> {
    retry_when_busy(|| record_selections(pool, poll_id, voter_id, selections)).await
}

async fn record_selections(
    pool: &db::DbPool,
    poll_id: Uuid,
    voter_id: Uuid,
    selections: &[SlotSelection],
) -> Result<Uuid, PollError> {
    let mut tx = pool.begin().await?;

    let poll = db::get_poll(&mut tx, poll_id)
        .await?
        .ok_or(PollError::NotFound("Poll"))?;
    if poll.is_closed() {
        return Err(PollError::PollClosed);
    }
    db::get_voter(&mut tx, voter_id)
        .await?
        .ok_or(PollError::NotFound("Voter"))?;

    let days = calendar::business_days(poll.start_date, poll.end_date);
    let resolved = resolve_selections(&days, selections).inspect_err(|e| {
        warn!(%poll_id, %voter_id, "rejected vote: {}", e);
    })?;

    let invitation_id = match db::find_invitation(&mut tx, poll_id, voter_id).await? {
        Some(invitation) => invitation.id,
        None => db::insert_invitation(&mut tx, poll_id, voter_id, Role::Committee).await?,
    };

    let now = Utc::now();
    let record_id = match db::find_vote_record(&mut tx, invitation_id).await? {
        Some(record) => {
            db::clear_vote_slots(&mut tx, record.id).await?;
            db::touch_vote_record(&mut tx, record.id, now).await?;
            record.id
        }
        None => {
            let record = VoteRecord {
                id: Uuid::new_v4(),
                invitation_id,
                submitted_at: now,
            };
            db::insert_vote_record(&mut tx, &record).await?;
            record.id
        }
    };

    for (position, slot) in resolved.iter().enumerate() {
        let slot_id = registry::resolve_or_create(&mut tx, poll_id, slot.start_at, slot.end_at).await?;
        db::attach_slot(&mut tx, record_id, slot_id, position as i64).await?;
    }

    db::mark_voted(&mut tx, invitation_id, now).await?;
    tx.commit().await?;

    info!(%poll_id, %voter_id, slots = resolved.len(), "availability recorded");
    Ok(record_id)
}

/// The voter's current vote records across every poll.
pub async fn votes_for_voter(pool: &db::DbPool, voter_id: Uuid) -> Result<Vec<VoteRecord>, PollError> {
    let mut conn = pool.acquire().await?;
    Ok(db::find_votes_for_voter(&mut conn, voter_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::aggregation::get_results;
    use crate::scheduling::lifecycle::{PollForm, create_poll};
    use crate::scheduling::test_support::{date, file_pool, seed_poll, test_pool, voter};

    async fn current_slots(pool: &db::DbPool, poll_id: Uuid, voter_id: Uuid) -> Vec<Uuid> {
        let mut conn = pool.acquire().await.unwrap();
        let invitation = db::find_invitation(&mut conn, poll_id, voter_id)
            .await
            .unwrap()
            .unwrap();
        let record = db::find_vote_record(&mut conn, invitation.id)
            .await
            .unwrap()
            .unwrap();
        db::find_slots_for_record(&mut conn, record.id)
            .await
            .unwrap()
            .into_iter()
            .map(|slot| slot.id)
            .collect()
    }

    async fn slot_count(pool: &db::DbPool, poll_id: Uuid) -> usize {
        let mut conn = pool.acquire().await.unwrap();
        db::find_slots_for_poll(&mut conn, poll_id).await.unwrap().len()
    }

    #[tokio::test]
    async fn resubmitting_the_same_selection_is_idempotent() {
        let pool = test_pool().await;
        let (poll_id, _, u2) = seed_poll(&pool).await;
        let picks = [
            SlotSelection::new("2024-01-09", "morning"),
            SlotSelection::new("2024-01-10", "13:00 - 16:00"),
        ];

        let first = submit_vote(&pool, poll_id, u2, &picks).await.unwrap();
        let before = current_slots(&pool, poll_id, u2).await;
        let second = submit_vote(&pool, poll_id, u2, &picks).await.unwrap();
        let after = current_slots(&pool, poll_id, u2).await;

        assert_eq!(first, second);
        assert_eq!(before, after);
        assert_eq!(slot_count(&pool, poll_id).await, 2);
    }

    #[tokio::test]
    async fn two_voters_share_one_slot() {
        let pool = test_pool().await;
        let (poll_id, u1, u2) = seed_poll(&pool).await;
        let pick = [SlotSelection::new("2024-01-08", "afternoon")];

        submit_vote(&pool, poll_id, u1, &pick).await.unwrap();
        submit_vote(&pool, poll_id, u2, &pick).await.unwrap();

        assert_eq!(
            current_slots(&pool, poll_id, u1).await,
            current_slots(&pool, poll_id, u2).await
        );
        assert_eq!(slot_count(&pool, poll_id).await, 1);
    }

    #[tokio::test]
    async fn resubmission_replaces_rather_than_appends() {
        let pool = test_pool().await;
        let (poll_id, _, u2) = seed_poll(&pool).await;
        let a = SlotSelection::new("2024-01-08", "morning");
        let b = SlotSelection::new("2024-01-09", "morning");
        let c = SlotSelection::new("2024-01-10", "morning");

        submit_vote(&pool, poll_id, u2, &[a.clone(), b.clone()]).await.unwrap();
        let first = current_slots(&pool, poll_id, u2).await;
        submit_vote(&pool, poll_id, u2, &[b, c]).await.unwrap();
        let second = current_slots(&pool, poll_id, u2).await;

        assert_eq!(second.len(), 2);
        assert!(!second.contains(&first[0]));
        assert_eq!(second[0], first[1]);
        // A's slot stays behind, unreferenced.
        assert_eq!(slot_count(&pool, poll_id).await, 3);
    }

    #[tokio::test]
    async fn duplicates_within_one_submission_collapse() {
        let pool = test_pool().await;
        let (poll_id, _, u2) = seed_poll(&pool).await;
        let picks = [
            SlotSelection::new("2024-01-09", "morning"),
            SlotSelection::new("2024-01-09", "09:00 - 12:00"),
        ];

        submit_vote(&pool, poll_id, u2, &picks).await.unwrap();
        assert_eq!(current_slots(&pool, poll_id, u2).await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_selection_writes_nothing() {
        let pool = test_pool().await;
        let (poll_id, _, u2) = seed_poll(&pool).await;

        let bad_label = [
            SlotSelection::new("2024-01-09", "morning"),
            SlotSelection::new("2024-01-09", "evening"),
        ];
        let err = submit_vote(&pool, poll_id, u2, &bad_label).await.unwrap_err();
        assert!(matches!(err, PollError::InvalidRange(_)));

        // 2024-01-13 is a Saturday, outside the poll anyway.
        let weekend = [SlotSelection::new("2024-01-13", "morning")];
        let err = submit_vote(&pool, poll_id, u2, &weekend).await.unwrap_err();
        assert!(matches!(err, PollError::InvalidRange(_)));

        let garbage = [SlotSelection::new("tuesday", "morning")];
        let err = submit_vote(&pool, poll_id, u2, &garbage).await.unwrap_err();
        assert!(matches!(err, PollError::InvalidRange(_)));

        assert_eq!(slot_count(&pool, poll_id).await, 0);
        let mut conn = pool.acquire().await.unwrap();
        let invitation = db::find_invitation(&mut conn, poll_id, u2).await.unwrap().unwrap();
        assert!(invitation.voted_at.is_none());
    }

    #[tokio::test]
    async fn unknown_poll_or_voter_is_not_found() {
        let pool = test_pool().await;
        let (poll_id, u1, _) = seed_poll(&pool).await;

        let err = submit_vote(&pool, Uuid::new_v4(), u1, &[]).await.unwrap_err();
        assert!(matches!(err, PollError::NotFound("Poll")));
        let err = submit_vote(&pool, poll_id, Uuid::new_v4(), &[]).await.unwrap_err();
        assert!(matches!(err, PollError::NotFound("Voter")));
    }

    #[tokio::test]
    async fn uninvited_voter_is_enrolled_as_committee() {
        let pool = test_pool().await;
        let (poll_id, _, _) = seed_poll(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let outsider = db::get_or_create_voter(&mut conn, "U3").await.unwrap();
        drop(conn);

        submit_vote(&pool, poll_id, outsider.id, &[SlotSelection::new("2024-01-08", "morning")])
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let invitation = db::find_invitation(&mut conn, poll_id, outsider.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invitation.role, Role::Committee);
        assert!(invitation.voted_at.is_some());
        drop(conn);

        let records = votes_for_voter(&pool, outsider.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].invitation_id, invitation.id);
    }

    #[tokio::test]
    async fn choice_value_round_trips_into_a_vote() {
        let pool = test_pool().await;
        let (poll_id, _, u2) = seed_poll(&pool).await;
        let pick = SlotSelection::from_choice_value("2024-01-09#09:00 - 12:00").unwrap();

        submit_vote(&pool, poll_id, u2, &[pick]).await.unwrap();
        assert_eq!(current_slots(&pool, poll_id, u2).await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_all_land_on_one_slot() {
        let db = file_pool().await;
        let pool = &db.pool;

        let chair = voter(pool, "Chair").await;
        let mut committee = Vec::new();
        for n in 0..10 {
            committee.push(voter(pool, &format!("Member {n:02}")).await);
        }
        let form = PollForm {
            title: "Offsite".into(),
            description: None,
            start_date: date(2024, 1, 8),
            end_date: date(2024, 1, 10),
            chairman_id: chair,
            committee_ids: committee.clone(),
        };
        let poll_id = create_poll(pool, chair, form).await.unwrap().id;

        let handles: Vec<_> = committee
            .iter()
            .map(|&voter_id| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let pick = [SlotSelection::new("2024-01-09", "morning")];
                    submit_vote(&pool, poll_id, voter_id, &pick).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let results = get_results(pool, poll_id).await.unwrap();
        assert_eq!(results.len(), 1);
        let mut names = results[0].voters.clone();
        names.sort();
        let expected: Vec<_> = (0..10).map(|n| format!("Member {n:02}")).collect();
        assert_eq!(names, expected);
    }
}
