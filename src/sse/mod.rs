//! Server-sent event feeds for poll lists and live results.

pub mod models;
pub use models::*;

mod sse_broadcaster;
pub use sse_broadcaster::*;

mod all_polls_sse;
mod poll_updates_sse;

pub use all_polls_sse::all_polls_sse;
pub use poll_updates_sse::poll_updates_sse;
