//! Signaling coordinators for both ends of a SeedShare transfer.
//!
//! The seeder joins a room as `seeder`, answers offers from peers and
//! serves each opened channel with a [`SeederSession`]. A peer offers to
//! the room's seeder, trades candidates, and downloads over the channel
//! with a [`ReceiverSession`]. The transport itself stays behind
//! [`PeerTransport`].
//!
//! [`SeederSession`]: seedshare_transfer::SeederSession
//! [`ReceiverSession`]: seedshare_transfer::ReceiverSession

mod fetch;
mod loopback;
mod seed;
mod transport;

use seedshare_relay_client::ClientError;
use seedshare_transfer::TransferError;

pub use fetch::{DEFAULT_CONNECT_TIMEOUT, FetchOptions, PeerNode};
pub use loopback::{LOOPBACK_CAPACITY, LoopbackConnection, LoopbackTransport};
pub use seed::{SeedNode, SeedOptions};
pub use transport::{IceConfig, PeerConnection, PeerEvents, PeerTransport, TransportEvent};

/// Errors from the signaling coordinators.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("relay: {0}")]
    Relay(#[from] ClientError),

    #[error("transport: {0}")]
    Transport(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("timed out waiting for the direct channel")]
    Timeout,

    #[error("remote side disconnected before the channel opened")]
    Disconnected,
}
