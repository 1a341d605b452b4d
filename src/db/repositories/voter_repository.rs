use crate::db::models::Voter;
use sqlx::{Error, SqliteConnection};
use uuid::Uuid;

pub async fn get_voter(conn: &mut SqliteConnection, voter_id: Uuid) -> Result<Option<Voter>, Error> {
    sqlx::query_as::<_, Voter>("SELECT id, name FROM voters WHERE id = ?")
        .bind(voter_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn get_voter_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Voter>, Error> {
    sqlx::query_as::<_, Voter>("SELECT id, name FROM voters WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
}

/// Inserts the voter unless the name is taken, then reads back whichever row
/// owns the name.
pub async fn get_or_create_voter(conn: &mut SqliteConnection, name: &str) -> Result<Voter, Error> {
    sqlx::query("INSERT INTO voters (id, name) VALUES (?, ?) ON CONFLICT (name) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(name)
        .execute(&mut *conn)
        .await?;

    get_voter_by_name(conn, name)
        .await?
        .ok_or(Error::RowNotFound)
}

pub async fn list_voters(conn: &mut SqliteConnection) -> Result<Vec<Voter>, Error> {
    sqlx::query_as::<_, Voter>("SELECT id, name FROM voters ORDER BY name")
        .fetch_all(&mut *conn)
        .await
}
