//! SQLite storage for voters, polls, invitations, slots and vote records.
//! Query functions take a `SqliteConnection` so they run inside or outside a
//! transaction.

pub mod connection;
pub mod models;
pub mod repositories;

pub use connection::*;
pub use models::*;
pub use repositories::*;
