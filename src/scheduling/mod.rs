//! Availability scheduling: polls, their rosters, the slots voters pick and
//! the per-slot results.

pub mod aggregation;
pub mod calendar;
pub mod directory;
pub mod ledger;
pub mod lifecycle;
pub mod messages;
pub mod notify;
pub mod registry;
pub mod retry;

pub use aggregation::{SlotTally, get_results};
pub use ledger::{SlotSelection, submit_vote};
