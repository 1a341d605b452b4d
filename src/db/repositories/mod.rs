pub mod invitation_repository;
pub mod message_repository;
pub mod poll_repository;
pub mod time_slot_repository;
pub mod vote_repository;
pub mod voter_repository;

pub use invitation_repository::*;
pub use message_repository::*;
pub use poll_repository::*;
pub use time_slot_repository::*;
pub use vote_repository::*;
pub use voter_repository::*;
