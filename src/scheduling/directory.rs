use crate::db;
use crate::db::models::Voter;
use crate::error::{FieldError, PollError};
use tracing::info;
use uuid::Uuid;

/// Returns the voter called `name`, registering them on first appearance.
pub async fn register_voter(pool: &db::DbPool, name: &str) -> Result<Voter, PollError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PollError::Validation(vec![FieldError::new(
            "name",
            "Name is required",
        )]));
    }
    if name.chars().count() > 80 {
        return Err(PollError::Validation(vec![FieldError::new(
            "name",
            "Name must be at most 80 characters",
        )]));
    }

    let mut conn = pool.acquire().await?;
    let voter = db::get_or_create_voter(&mut conn, name).await?;
    info!(voter_id = %voter.id, name = %voter.name, "voter registered");
    Ok(voter)
}

pub async fn find_voter(pool: &db::DbPool, voter_id: Uuid) -> Result<Voter, PollError> {
    let mut conn = pool.acquire().await?;
    db::get_voter(&mut conn, voter_id)
        .await?
        .ok_or(PollError::NotFound("Voter"))
}

pub async fn list_voters(pool: &db::DbPool) -> Result<Vec<Voter>, PollError> {
    let mut conn = pool.acquire().await?;
    Ok(db::list_voters(&mut conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::test_support::test_pool;

    #[tokio::test]
    async fn registering_twice_returns_the_same_voter() {
        let pool = test_pool().await;
        let first = register_voter(&pool, "Somchai").await.unwrap();
        let second = register_voter(&pool, "  Somchai ").await.unwrap();
        assert_eq!(first, second);

        register_voter(&pool, "Anong").await.unwrap();
        let names: Vec<_> = list_voters(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["Anong", "Somchai"]);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let pool = test_pool().await;
        let err = register_voter(&pool, "  ").await.unwrap_err();
        assert!(matches!(err, PollError::Validation(ref f) if f[0].field == "name"));
        let err = find_voter(&pool, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PollError::NotFound("Voter")));
    }
}
