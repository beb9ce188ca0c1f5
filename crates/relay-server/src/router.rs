//! Fan-out decisions for stamped relay messages.

use seedshare_protocol::relay::ROLE_SEEDER;
use seedshare_protocol::{Recipient, RelayMessage};

use crate::registry::{ClientEntry, Registry};

/// Ids of the clients a message was enqueued for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    pub delivered: Vec<String>,
}

impl RouteOutcome {
    pub fn count(&self) -> usize {
        self.delivered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty()
    }
}

/// Delivers an already stamped message according to its `recipient`.
///
/// - `"seeder"`: one open client of the sender's room other than the
///   sender. A client that joined with role `seeder` wins; otherwise the
///   first-registered match.
/// - concrete id: that client only, if its connection is open.
/// - none: every other open client of the sender's room.
///
/// Misses are silent. A sender without a room reaches nobody through the
/// room-scoped targets.
pub fn route(registry: &Registry, msg: &RelayMessage) -> RouteOutcome {
    let mut outcome = RouteOutcome::default();
    let Some(sender_id) = msg.sender.as_deref() else {
        tracing::warn!(msg_type = %msg.msg_type, "refusing to route unstamped message");
        return outcome;
    };

    let text = match serde_json::to_string(msg) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("failed to serialize relay message: {e}");
            return outcome;
        }
    };

    let mut deliver = |client: &ClientEntry| {
        if client.sender().send_text(text.clone()).is_ok() {
            outcome.delivered.push(client.id.clone());
        }
    };

    match msg.target() {
        Recipient::Peer(id) => {
            if let Some(client) = registry.get(id).filter(|c| c.is_open()) {
                deliver(client);
            }
        }
        Recipient::Seeder => {
            if let Some(client) = find_seeder(registry, sender_id) {
                deliver(client);
            }
        }
        Recipient::Room => {
            if let Some(room) = registry.room_of(sender_id) {
                registry
                    .in_room(room)
                    .filter(|c| c.id != sender_id && c.is_open())
                    .for_each(&mut deliver);
            }
        }
    }

    outcome
}

/// Finds the seeder for `sender_id`'s room.
pub(crate) fn find_seeder<'a>(registry: &'a Registry, sender_id: &str) -> Option<&'a ClientEntry> {
    let room = registry.room_of(sender_id)?;
    let mut candidates = registry
        .in_room(room)
        .filter(|c| c.id != sender_id && c.is_open());

    let first = candidates.next()?;
    if first.role.as_deref() == Some(ROLE_SEEDER) {
        return Some(first);
    }
    Some(
        candidates
            .find(|c| c.role.as_deref() == Some(ROLE_SEEDER))
            .unwrap_or(first),
    )
}
