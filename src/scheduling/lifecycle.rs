use crate::db;
use crate::db::models::{Invitee, Poll, PollSummary, Role, Voter};
use crate::error::{FieldError, PollError, is_unique_violation};
use crate::scheduling::calendar::{self, TimeRange};
use crate::scheduling::notify;
use crate::scheduling::retry::retry_when_busy;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

/// Everything a poll form submits when creating a poll.
#[derive(Debug, Clone, Deserialize)]
pub struct PollForm {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub chairman_id: Uuid,
    #[serde(default)]
    pub committee_ids: Vec<Uuid>,
}

/// Edits replace the descriptive fields and may only grow the roster.
#[derive(Debug, Clone, Deserialize)]
pub struct PollChanges {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub chairman_id: Option<Uuid>,
    #[serde(default)]
    pub invitee_ids: Vec<Uuid>,
}

pub fn validate_details(title: &str, description: Option<&str>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if title.trim().is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    } else if title.chars().count() > 200 {
        errors.push(FieldError::new("title", "Title must be at most 200 characters"));
    }
    if description.is_some_and(|d| d.chars().count() > 5000) {
        errors.push(FieldError::new("description", "Description must be at most 5000 characters"));
    }
    errors
}

fn check_details(
    title: &str,
    description: Option<&str>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<(), PollError> {
    let errors = validate_details(title, description);
    if !errors.is_empty() {
        return Err(PollError::Validation(errors));
    }
    if start_date > end_date {
        return Err(PollError::InvalidDateRange);
    }
    Ok(())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

async fn require_voter(conn: &mut SqliteConnection, voter_id: Uuid) -> Result<Voter, PollError> {
    db::get_voter(conn, voter_id)
        .await?
        .ok_or(PollError::NotFound("Voter"))
}

async fn require_poll(conn: &mut SqliteConnection, poll_id: Uuid) -> Result<Poll, PollError> {
    db::get_poll(conn, poll_id)
        .await?
        .ok_or(PollError::NotFound("Poll"))
}

/// The creator and the chairman both organize a poll.
async fn require_organizer(
    conn: &mut SqliteConnection,
    poll: &Poll,
    actor_id: Uuid,
) -> Result<(), PollError> {
    if poll.creator_id == actor_id {
        return Ok(());
    }
    match db::find_chairman(conn, poll.id).await? {
        Some(chairman) if chairman.voter_id == actor_id => Ok(()),
        _ => Err(PollError::Forbidden),
    }
}

fn chairman_conflict(error: sqlx::Error) -> PollError {
    if is_unique_violation(&error) {
        PollError::DuplicateChairman
    } else {
        error.into()
    }
}

pub async fn create_poll(
    pool: &db::DbPool,
    creator_id: Uuid,
    form: PollForm,
) -> Result<Poll, PollError> {
    check_details(&form.title, form.description.as_deref(), form.start_date, form.end_date)?;

    let (poll, invitees) =
        retry_when_busy(|| insert_poll_with_roster(pool, creator_id, form.clone())).await?;

    info!(poll_id = %poll.id, %creator_id, invitees = invitees.len(), "poll created");
    for (name, role) in &invitees {
        notify::announce_invitation(&poll, name, *role);
    }

    Ok(poll)
}

async fn insert_poll_with_roster(
    pool: &db::DbPool,
    creator_id: Uuid,
    form: PollForm,
) -> Result<(Poll, Vec<(String, Role)>), PollError> {
    let mut tx = pool.begin().await?;
    require_voter(&mut tx, creator_id).await?;
    let chairman = require_voter(&mut tx, form.chairman_id).await?;

    let mut seen = HashSet::from([chairman.id]);
    let mut committee = Vec::new();
    for voter_id in form.committee_ids {
        if seen.insert(voter_id) {
            committee.push(require_voter(&mut tx, voter_id).await?);
        }
    }

    let poll = Poll {
        id: Uuid::new_v4(),
        creator_id,
        title: form.title.trim().to_string(),
        description: clean_description(form.description),
        start_date: form.start_date,
        end_date: form.end_date,
        created_at: Utc::now(),
        modified_at: None,
        closed_at: None,
    };
    db::insert_poll(&mut tx, &poll).await?;

    db::insert_invitation(&mut tx, poll.id, chairman.id, Role::Chairman)
        .await
        .map_err(chairman_conflict)?;
    for voter in &committee {
        db::insert_invitation(&mut tx, poll.id, voter.id, Role::Committee).await?;
    }
    tx.commit().await?;

    let mut invitees = vec![(chairman.name, Role::Chairman)];
    invitees.extend(committee.into_iter().map(|voter| (voter.name, Role::Committee)));
    Ok((poll, invitees))
}

pub async fn edit_poll(
    pool: &db::DbPool,
    actor_id: Uuid,
    poll_id: Uuid,
    changes: PollChanges,
) -> Result<Poll, PollError> {
    check_details(
        &changes.title,
        changes.description.as_deref(),
        changes.start_date,
        changes.end_date,
    )?;

    let (updated, announced) =
        retry_when_busy(|| apply_changes(pool, actor_id, poll_id, changes.clone())).await?;

    info!(%poll_id, %actor_id, new_invitees = announced.len(), "poll edited");
    for (name, role) in &announced {
        notify::announce_invitation(&updated, name, *role);
    }

    Ok(updated)
}

async fn apply_changes(
    pool: &db::DbPool,
    actor_id: Uuid,
    poll_id: Uuid,
    changes: PollChanges,
) -> Result<(Poll, Vec<(String, Role)>), PollError> {
    let mut tx = pool.begin().await?;
    let poll = require_poll(&mut tx, poll_id).await?;
    require_organizer(&mut tx, &poll, actor_id).await?;

    let description = clean_description(changes.description);
    db::update_poll_details(
        &mut tx,
        poll_id,
        changes.title.trim(),
        description.as_deref(),
        changes.start_date,
        changes.end_date,
        Utc::now(),
    )
    .await?;

    let mut announced = Vec::new();
    if let Some(chairman_id) = changes.chairman_id {
        let voter = require_voter(&mut tx, chairman_id).await?;
        match db::find_chairman(&mut tx, poll_id).await? {
            Some(current) if current.voter_id == chairman_id => {}
            Some(_) => return Err(PollError::DuplicateChairman),
            None => {
                match db::find_invitation(&mut tx, poll_id, chairman_id).await? {
                    Some(invitation) => db::set_role(&mut tx, invitation.id, Role::Chairman)
                        .await
                        .map_err(chairman_conflict)?,
                    None => {
                        db::insert_invitation(&mut tx, poll_id, chairman_id, Role::Chairman)
                            .await
                            .map_err(chairman_conflict)?;
                    }
                }
                announced.push((voter.name, Role::Chairman));
            }
        }
    }

    for voter_id in changes.invitee_ids {
        if db::find_invitation(&mut tx, poll_id, voter_id).await?.is_some() {
            continue;
        }
        let voter = require_voter(&mut tx, voter_id).await?;
        db::insert_invitation(&mut tx, poll_id, voter.id, Role::Committee).await?;
        announced.push((voter.name, Role::Committee));
    }

    let updated = require_poll(&mut tx, poll_id).await?;
    tx.commit().await?;
    Ok((updated, announced))
}

/// Outcome of a close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollClosure {
    /// The stored close time, whichever request set it.
    pub closed_at: DateTime<Utc>,
    /// False when the poll was already closed before this request.
    pub newly_closed: bool,
}

/// Closes the poll. Closing twice keeps the first timestamp.
pub async fn close_poll(
    pool: &db::DbPool,
    actor_id: Uuid,
    poll_id: Uuid,
) -> Result<PollClosure, PollError> {
    let closure = retry_when_busy(|| mark_closed(pool, actor_id, poll_id)).await?;
    if closure.newly_closed {
        info!(%poll_id, %actor_id, "poll closed");
    }
    Ok(closure)
}

async fn mark_closed(
    pool: &db::DbPool,
    actor_id: Uuid,
    poll_id: Uuid,
) -> Result<PollClosure, PollError> {
    let mut tx = pool.begin().await?;
    let poll = require_poll(&mut tx, poll_id).await?;
    require_organizer(&mut tx, &poll, actor_id).await?;

    if let Some(closed_at) = poll.closed_at {
        return Ok(PollClosure {
            closed_at,
            newly_closed: false,
        });
    }

    let now = Utc::now();
    let closure = if db::close_poll(&mut tx, poll_id, now).await? {
        PollClosure {
            closed_at: now,
            newly_closed: true,
        }
    } else {
        // Another request closed it between the read and the update.
        let stored = require_poll(&mut tx, poll_id).await?.closed_at;
        PollClosure {
            closed_at: stored
                .ok_or_else(|| PollError::DatabaseError("poll reopened while closing".into()))?,
            newly_closed: false,
        }
    };
    tx.commit().await?;
    Ok(closure)
}

/// Only the creator may delete; slots, invitations, votes and messages go with it.
pub async fn delete_poll(pool: &db::DbPool, actor_id: Uuid, poll_id: Uuid) -> Result<(), PollError> {
    retry_when_busy(|| remove_poll(pool, actor_id, poll_id)).await?;
    info!(%poll_id, %actor_id, "poll deleted");
    Ok(())
}

async fn remove_poll(pool: &db::DbPool, actor_id: Uuid, poll_id: Uuid) -> Result<(), PollError> {
    let mut tx = pool.begin().await?;
    let poll = require_poll(&mut tx, poll_id).await?;
    if poll.creator_id != actor_id {
        return Err(PollError::Forbidden);
    }
    db::delete_poll(&mut tx, poll_id).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn list_polls(pool: &db::DbPool) -> Result<Vec<PollSummary>, PollError> {
    let mut conn = pool.acquire().await?;
    Ok(db::list_poll_summaries(&mut conn).await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct PollDetail {
    pub poll: Poll,
    pub invitees: Vec<Invitee>,
}

pub async fn get_poll(pool: &db::DbPool, poll_id: Uuid) -> Result<PollDetail, PollError> {
    let mut conn = pool.acquire().await?;
    let poll = require_poll(&mut conn, poll_id).await?;
    let invitees = db::list_invitees(&mut conn, poll_id).await?;
    Ok(PollDetail { poll, invitees })
}

#[derive(Debug, Clone, Serialize)]
pub struct BallotOption {
    pub value: String,
    pub time_range: TimeRange,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BallotDay {
    pub date: NaiveDate,
    pub options: Vec<BallotOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ballot {
    pub poll: Poll,
    pub days: Vec<BallotDay>,
}

/// Every business day with both blocks, without any selection state.
pub fn ballot_days(start_date: NaiveDate, end_date: NaiveDate) -> Vec<BallotDay> {
    calendar::business_days(start_date, end_date)
        .into_iter()
        .map(|date| BallotDay {
            date,
            options: TimeRange::ALL
                .into_iter()
                .map(|range| BallotOption {
                    value: calendar::choice_value(date, range),
                    time_range: range,
                    label: range.label(),
                    selected: false,
                })
                .collect(),
        })
        .collect()
}

/// The voting form for `voter_id`, with their current choices ticked.
pub async fn ballot(pool: &db::DbPool, poll_id: Uuid, voter_id: Uuid) -> Result<Ballot, PollError> {
    let mut conn = pool.acquire().await?;
    let poll = require_poll(&mut conn, poll_id).await?;

    let mut chosen = HashSet::new();
    if let Some(invitation) = db::find_invitation(&mut conn, poll_id, voter_id).await? {
        if let Some(record) = db::find_vote_record(&mut conn, invitation.id).await? {
            for slot in db::find_slots_for_record(&mut conn, record.id).await? {
                chosen.insert((slot.start_at, slot.end_at));
            }
        }
    }

    let mut days = ballot_days(poll.start_date, poll.end_date);
    for day in &mut days {
        for option in &mut day.options {
            let (start_at, end_at) = option.time_range.resolve(day.date)?;
            option.selected = chosen.contains(&(start_at, end_at));
        }
    }

    Ok(Ballot { poll, days })
}
