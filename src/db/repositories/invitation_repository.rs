use crate::db::models::{Invitation, Invitee, Role};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::{Error, SqliteConnection};
use uuid::Uuid;

pub async fn insert_invitation(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
    voter_id: Uuid,
    role: Role,
) -> Result<Uuid, Error> {
    let invitation_id = Uuid::new_v4();

    sqlx::query("INSERT INTO invitations (id, poll_id, voter_id, role) VALUES (?, ?, ?, ?)")
        .bind(invitation_id)
        .bind(poll_id)
        .bind(voter_id)
        .bind(role)
        .execute(&mut *conn)
        .await?;

    Ok(invitation_id)
}

pub async fn find_invitation(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
    voter_id: Uuid,
) -> Result<Option<Invitation>, Error> {
    sqlx::query_as::<_, Invitation>(
        "SELECT id, poll_id, voter_id, role, voted_at FROM invitations WHERE poll_id = ? AND voter_id = ?",
    )
    .bind(poll_id)
    .bind(voter_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn find_chairman(
    conn: &mut SqliteConnection,
    poll_id: Uuid,
) -> Result<Option<Invitation>, Error> {
    sqlx::query_as::<_, Invitation>(
        "SELECT id, poll_id, voter_id, role, voted_at FROM invitations WHERE poll_id = ? AND role = 'chairman'",
    )
    .bind(poll_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn set_role(
    conn: &mut SqliteConnection,
    invitation_id: Uuid,
    role: Role,
) -> Result<(), Error> {
    sqlx::query("UPDATE invitations SET role = ? WHERE id = ?")
        .bind(role)
        .bind(invitation_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn mark_voted(
    conn: &mut SqliteConnection,
    invitation_id: Uuid,
    voted_at: DateTime<Utc>,
) -> Result<(), Error> {
    sqlx::query("UPDATE invitations SET voted_at = ? WHERE id = ?")
        .bind(voted_at)
        .bind(invitation_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Chairman first, then committee members by name.
pub async fn list_invitees(conn: &mut SqliteConnection, poll_id: Uuid) -> Result<Vec<Invitee>, Error> {
    sqlx::query_as::<_, Invitee>(
        r#"
        SELECT i.voter_id, v.name, i.role, i.voted_at
        FROM invitations i JOIN voters v ON v.id = i.voter_id
        WHERE i.poll_id = ?
        ORDER BY CASE i.role WHEN 'chairman' THEN 0 ELSE 1 END, v.name
        "#,
    )
    .bind(poll_id)
    .fetch_all(&mut *conn)
    .await
}
