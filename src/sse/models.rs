use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PollCreated {
    pub poll_id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct AvailabilityChanged {
    pub poll_id: Uuid,
    pub voter_id: Uuid,
}

#[derive(Debug, Clone)]
pub enum PollEvent {
    PollCreated(PollCreated),
    AvailabilityChanged(AvailabilityChanged),
    PollClosed(Uuid),
    PollDeleted(Uuid),
}

impl PollEvent {
    pub fn poll_id(&self) -> Uuid {
        match self {
            PollEvent::PollCreated(created) => created.poll_id,
            PollEvent::AvailabilityChanged(changed) => changed.poll_id,
            PollEvent::PollClosed(poll_id) | PollEvent::PollDeleted(poll_id) => *poll_id,
        }
    }
}

pub type EventSender = tokio::sync::broadcast::Sender<PollEvent>;
