//! Signaling relay service: message lifecycle on top of the registry.

use seedshare_protocol::constants::DEFAULT_ROOM;
use seedshare_protocol::{RelayMessage, RelayMessageType};
use tokio::sync::Mutex;

use crate::connection::Sender;
use crate::registry::{JoinOutcome, Registry};
use crate::router::{self, RouteOutcome};

/// Relay behaviour settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Room assigned when a `join` carries none.
    pub default_room: String,
    /// Push `{type: welcome, id}` to every new connection.
    pub send_welcome: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_room: DEFAULT_ROOM.to_string(),
            send_welcome: true,
        }
    }
}

/// Shared relay state: the registry behind a single lock.
///
/// Registration, room assignment, removal and route lookup all take the
/// same lock, so nothing is ever forwarded to a client that was already
/// removed. Delivery inside the lock is a non-blocking enqueue.
pub struct RelayState {
    config: RelayConfig,
    registry: Mutex<Registry>,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            registry: Mutex::new(Registry::new()),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Registers a new connection and pushes the welcome notice.
    pub async fn register(&self, client_id: &str, sender: Sender) {
        if self.config.send_welcome {
            let _ = sender.send_msg(&RelayMessage::welcome(client_id));
        }
        let mut registry = self.registry.lock().await;
        registry.insert(client_id, sender);
        tracing::info!(client = %client_id, clients = registry.len(), "client connected");
    }

    /// Removes a connection; later routes to its id are no-ops.
    pub async fn unregister(&self, client_id: &str) {
        let mut registry = self.registry.lock().await;
        if registry.remove(client_id) {
            tracing::info!(client = %client_id, clients = registry.len(), "client disconnected");
        }
    }

    /// Number of registered clients.
    pub async fn client_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Room of a registered client.
    pub async fn room_of(&self, client_id: &str) -> Option<String> {
        self.registry
            .lock()
            .await
            .room_of(client_id)
            .map(str::to_string)
    }

    /// Handles one inbound text frame from `client_id`.
    ///
    /// Malformed frames are logged and dropped; the connection stays up.
    pub async fn handle_text(&self, client_id: &str, text: &str) -> RouteOutcome {
        let msg: RelayMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(client = %client_id, "dropping malformed relay message: {e}");
                return RouteOutcome::default();
            }
        };
        self.handle_message(client_id, msg).await
    }

    /// Handles one parsed message from `client_id`.
    pub async fn handle_message(&self, client_id: &str, mut msg: RelayMessage) -> RouteOutcome {
        tracing::debug!(client = %client_id, msg_type = %msg.msg_type, "relay message received");

        match msg.msg_type {
            RelayMessageType::Join => {
                self.join(client_id, &msg).await;
                RouteOutcome::default()
            }
            RelayMessageType::Welcome | RelayMessageType::Unknown => {
                tracing::warn!(client = %client_id, msg_type = %msg.msg_type, "unroutable message type, dropping");
                RouteOutcome::default()
            }
            RelayMessageType::Offer
            | RelayMessageType::Answer
            | RelayMessageType::Candidate
            | RelayMessageType::Error => {
                msg.stamp_sender(client_id);
                let registry = self.registry.lock().await;
                let outcome = router::route(&registry, &msg);
                if outcome.is_empty() {
                    tracing::debug!(
                        client = %client_id,
                        msg_type = %msg.msg_type,
                        recipient = msg.recipient.as_deref().unwrap_or("<room>"),
                        "no recipient, message dropped"
                    );
                } else {
                    tracing::debug!(
                        client = %client_id,
                        msg_type = %msg.msg_type,
                        delivered = outcome.count(),
                        "message routed"
                    );
                }
                outcome
            }
        }
    }

    async fn join(&self, client_id: &str, msg: &RelayMessage) {
        let room = msg.room().unwrap_or(&self.config.default_room).to_string();
        let role = msg.role().map(str::to_string);

        let mut registry = self.registry.lock().await;
        match registry.join(client_id, room.clone(), role.clone()) {
            JoinOutcome::Joined => {
                tracing::info!(client = %client_id, %room, role = role.as_deref().unwrap_or("-"), "client joined room");
            }
            JoinOutcome::AlreadyJoined { room: existing } => {
                tracing::warn!(client = %client_id, %existing, requested = %room, "client already in a room, ignoring join");
            }
            JoinOutcome::UnknownClient => {
                tracing::warn!(client = %client_id, "join from unregistered client");
            }
        }
    }
}
