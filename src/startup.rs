use crate::db::connection::DbPool;
use crate::sse::{EventSender, create_event_broadcaster};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub events: EventSender,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        AppState {
            db,
            events: create_event_broadcaster(),
        }
    }
}
