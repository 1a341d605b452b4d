use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Voter {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Poll {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Poll {
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Chairman,
    Committee,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub voter_id: Uuid,
    pub role: Role,
    pub voted_at: Option<DateTime<Utc>>,
}

/// Roster line: an invitation joined with the invitee's name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invitee {
    pub voter_id: Uuid,
    pub name: String,
    pub role: Role,
    pub voted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeSlot {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoteRecord {
    pub id: Uuid,
    pub invitation_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

/// One voter's name attached to one slot, as read back from the ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SlotVote {
    pub time_slot_id: Uuid,
    pub voter_name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PollMessage {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub voter_id: Uuid,
    pub voter_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PollSummary {
    #[sqlx(flatten)]
    pub poll: Poll,
    pub chairman: Option<String>,
    pub invitee_count: i64,
    pub voted_count: i64,
}
