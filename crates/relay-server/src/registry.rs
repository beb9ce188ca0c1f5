//! In-memory table of connected relay clients.

use crate::connection::Sender;

/// One connected client.
#[derive(Clone)]
pub struct ClientEntry {
    pub id: String,
    /// Set once, by the first `join`.
    pub room: Option<String>,
    /// Role declared on `join` (e.g. `"seeder"`).
    pub role: Option<String>,
    sender: Sender,
}

impl ClientEntry {
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Returns `true` if the client's outbound channel is still open.
    pub fn is_open(&self) -> bool {
        self.sender.is_connected()
    }

    /// Returns `true` if the client joined `room`.
    pub fn in_room(&self, room: &str) -> bool {
        self.room.as_deref() == Some(room)
    }
}

/// Result of applying a `join` to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// The client already has a room; the earlier assignment stands.
    AlreadyJoined { room: String },
    UnknownClient,
}

/// Connected clients in registration order.
///
/// Order matters: ambiguous lookups (the room's seeder) resolve to the
/// first-registered match.
#[derive(Default)]
pub struct Registry {
    clients: Vec<ClientEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly connected client without a room.
    pub fn insert(&mut self, id: impl Into<String>, sender: Sender) {
        let id = id.into();
        self.clients.retain(|c| c.id != id);
        self.clients.push(ClientEntry {
            id,
            room: None,
            role: None,
            sender,
        });
    }

    /// Removes a client. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.clients.len();
        self.clients.retain(|c| c.id != id);
        self.clients.len() != before
    }

    /// Records the room (and optional role) of a client.
    pub fn join(&mut self, id: &str, room: String, role: Option<String>) -> JoinOutcome {
        let Some(entry) = self.clients.iter_mut().find(|c| c.id == id) else {
            return JoinOutcome::UnknownClient;
        };
        if let Some(existing) = &entry.room {
            return JoinOutcome::AlreadyJoined {
                room: existing.clone(),
            };
        }
        entry.room = Some(room);
        entry.role = role;
        JoinOutcome::Joined
    }

    pub fn get(&self, id: &str) -> Option<&ClientEntry> {
        self.clients.iter().find(|c| c.id == id)
    }

    /// Room of a client, if it has joined one.
    pub fn room_of(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|c| c.room.as_deref())
    }

    /// Clients of `room` in registration order.
    pub fn in_room<'a>(&'a self, room: &'a str) -> impl Iterator<Item = &'a ClientEntry> + 'a {
        self.clients.iter().filter(move |c| c.in_room(room))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientEntry> {
        self.clients.iter()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
