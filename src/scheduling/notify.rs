use crate::db::models::{Poll, Role};
use tracing::info;

/// Stand-in for invitation delivery: nothing is sent, the invitation is only
/// logged so operators can see who would have been contacted.
pub fn announce_invitation(poll: &Poll, invitee: &str, role: Role) {
    info!(
        poll_id = %poll.id,
        title = %poll.title,
        invitee,
        ?role,
        "invitation recorded (delivery not configured)"
    );
}
