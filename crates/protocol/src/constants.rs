use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default TCP port of the signaling relay.
pub const RELAY_DEFAULT_PORT: u16 = 8080;

/// Room assigned to a client whose `join` carries no room.
pub const DEFAULT_ROOM: &str = "file-share-room";

/// Recipient value that asks the relay to find the seeder of the sender's room.
pub const SEEDER_RECIPIENT: &str = "seeder";

/// How often the relay pings each connection.
pub const RELAY_PING_PERIOD: Duration = Duration::from_secs(20);

/// Read deadline: a connection that sends nothing (not even a pong) for
/// this long is considered dead.
pub const RELAY_PONG_WAIT: Duration = Duration::from_secs(60);

/// Maximum relay frame size in bytes (1 MB). SDP blobs stay far below this.
pub const RELAY_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// How long a client waits for the relay's `welcome` after connecting.
pub const RELAY_WELCOME_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum size of one binary data frame on the direct channel (16 KiB).
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Message sent back when a requested file does not resolve.
pub const ERR_FILE_NOT_FOUND: &str = "File not found";

/// Relay message type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayMessageType {
    /// Relay -> client, carries the assigned id.
    Welcome,
    Join,
    Offer,
    Answer,
    Candidate,
    Error,

    /// Forward compatibility: unknown message types deserialize here.
    #[serde(other)]
    Unknown,
}

impl RelayMessageType {
    /// Returns the wire name of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Join => "join",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RelayMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_serialization() {
        assert_eq!(
            serde_json::to_string(&RelayMessageType::Welcome).unwrap(),
            "\"welcome\""
        );
        assert_eq!(
            serde_json::to_string(&RelayMessageType::Candidate).unwrap(),
            "\"candidate\""
        );
    }

    #[test]
    fn message_type_deserialization() {
        let mt: RelayMessageType = serde_json::from_str("\"offer\"").unwrap();
        assert_eq!(mt, RelayMessageType::Offer);
    }

    #[test]
    fn unknown_message_type() {
        let mt: RelayMessageType = serde_json::from_str("\"renegotiate\"").unwrap();
        assert_eq!(mt, RelayMessageType::Unknown);
    }

    #[test]
    fn display_matches_wire_name() {
        for mt in [
            RelayMessageType::Welcome,
            RelayMessageType::Join,
            RelayMessageType::Offer,
            RelayMessageType::Answer,
            RelayMessageType::Candidate,
            RelayMessageType::Error,
        ] {
            let json = serde_json::to_string(&mt).unwrap();
            assert_eq!(json, format!("\"{mt}\""));
        }
    }

    #[test]
    fn chunk_size_is_16k() {
        assert_eq!(CHUNK_SIZE, 16384);
    }
}
