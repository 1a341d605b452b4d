use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

pub type DbPool = Pool<Sqlite>;

pub async fn init_db(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .max_lifetime(Duration::from_secs(30 * 60))
        .idle_timeout(Duration::from_secs(10 * 60))
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database. The connection is never recycled,
/// since dropping it would drop the database with it.
pub async fn init_memory_db() -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .max_lifetime(None)
        .idle_timeout(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS voters (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS polls (
        id BLOB PRIMARY KEY,
        creator_id BLOB NOT NULL REFERENCES voters(id),
        title TEXT NOT NULL,
        description TEXT,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        created_at TEXT NOT NULL,
        modified_at TEXT,
        closed_at TEXT,
        CHECK (start_date <= end_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS invitations (
        id BLOB PRIMARY KEY,
        poll_id BLOB NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
        voter_id BLOB NOT NULL REFERENCES voters(id),
        role TEXT NOT NULL CHECK (role IN ('chairman', 'committee')),
        voted_at TEXT,
        UNIQUE (poll_id, voter_id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_invitations_one_chairman
        ON invitations(poll_id) WHERE role = 'chairman'
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS time_slots (
        id BLOB PRIMARY KEY,
        poll_id BLOB NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
        start_at TEXT NOT NULL,
        end_at TEXT NOT NULL,
        CHECK (start_at < end_at),
        UNIQUE (poll_id, start_at, end_at)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vote_records (
        id BLOB PRIMARY KEY,
        invitation_id BLOB NOT NULL UNIQUE REFERENCES invitations(id) ON DELETE CASCADE,
        submitted_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vote_record_slots (
        vote_record_id BLOB NOT NULL REFERENCES vote_records(id) ON DELETE CASCADE,
        time_slot_id BLOB NOT NULL REFERENCES time_slots(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        PRIMARY KEY (vote_record_id, time_slot_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS poll_messages (
        id BLOB PRIMARY KEY,
        poll_id BLOB NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
        voter_id BLOB NOT NULL REFERENCES voters(id),
        message TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_polls_creator_id ON polls(creator_id)",
    "CREATE INDEX IF NOT EXISTS idx_invitations_voter_id ON invitations(voter_id)",
    "CREATE INDEX IF NOT EXISTS idx_vote_record_slots_slot ON vote_record_slots(time_slot_id)",
    "CREATE INDEX IF NOT EXISTS idx_poll_messages_poll_id ON poll_messages(poll_id)",
];

pub async fn create_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub async fn get_pool_stats(pool: &DbPool) -> Result<String, sqlx::Error> {
    let size = pool.size() as usize;
    let num_idle = pool.num_idle();
    Ok(format!(
        "Pool stats: size={}, idle={}, available={}",
        size,
        num_idle,
        size - num_idle
    ))
}
