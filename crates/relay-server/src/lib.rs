//! WebSocket signaling relay for SeedShare.
//!
//! Accepts any number of client connections, assigns each a fresh id,
//! groups them into rooms on `join`, and routes offer/answer/candidate
//! messages to one peer, the room's seeder, or the whole room. The relay
//! never carries file data.

mod connection;
mod registry;
mod relay;
mod router;
mod server;

pub use connection::{SendError, Sender};
pub use registry::{ClientEntry, JoinOutcome, Registry};
pub use relay::{RelayConfig, RelayState};
pub use router::{RouteOutcome, route};
pub use server::{RelayServer, ServerConfig};

/// Per-connection outbound buffer capacity.
///
/// Delivery is a non-blocking enqueue, so a recipient that stops reading
/// only loses its own messages once this fills up.
pub const SEND_BUFFER_SIZE: usize = 256;

/// Errors produced by the relay server.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server already running")]
    AlreadyRunning,
}
