//! Seam to the external peer-to-peer transport.
//!
//! Connection establishment, encryption and NAT traversal live behind
//! these traits. The coordinators only relay descriptions and candidates
//! and wait for the direct channel to open.

use std::future::Future;

use serde_json::Value;
use tokio::sync::mpsc;

use seedshare_protocol::{IceCandidate, IceServer, IceTransportPolicy};
use seedshare_transfer::DirectChannel;

use crate::PeerError;

/// NAT-traversal settings handed to every new connection.
#[derive(Debug, Clone, Default)]
pub struct IceConfig {
    pub servers: Vec<IceServer>,
    pub policy: IceTransportPolicy,
}

/// Something a connection reports on its own.
pub enum TransportEvent<C> {
    /// A local candidate to forward to the remote side.
    LocalCandidate(IceCandidate),
    /// The direct channel is ready for a transfer session.
    ChannelOpen(C),
    /// Connectivity to the remote side was lost.
    Disconnected,
}

impl<C> std::fmt::Debug for TransportEvent<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalCandidate(c) => f.debug_tuple("LocalCandidate").field(c).finish(),
            Self::ChannelOpen(_) => f.write_str("ChannelOpen"),
            Self::Disconnected => f.write_str("Disconnected"),
        }
    }
}

/// Event queue shared by every connection of one coordinator.
pub(crate) type EventQueue<C> = mpsc::UnboundedReceiver<(String, TransportEvent<C>)>;

/// Handle a connection uses to report events, tagged with the remote id.
pub struct PeerEvents<C> {
    remote: String,
    tx: mpsc::UnboundedSender<(String, TransportEvent<C>)>,
}

impl<C> Clone for PeerEvents<C> {
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<C> PeerEvents<C> {
    pub(crate) fn new(
        remote: impl Into<String>,
        tx: mpsc::UnboundedSender<(String, TransportEvent<C>)>,
    ) -> Self {
        Self {
            remote: remote.into(),
            tx,
        }
    }

    /// Relay id (or `"seeder"`) of the remote side.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Reports an event. Returns `false` once the coordinator is gone.
    pub fn emit(&self, event: TransportEvent<C>) -> bool {
        self.tx.send((self.remote.clone(), event)).is_ok()
    }
}

/// Factory for peer connections.
pub trait PeerTransport: Send + Sync + 'static {
    type Channel: DirectChannel + 'static;
    type Connection: PeerConnection;

    /// Creates a connection; it reports candidates, channel open and
    /// disconnects through `events`.
    fn connect(
        &self,
        ice: &IceConfig,
        events: PeerEvents<Self::Channel>,
    ) -> impl Future<Output = Result<Self::Connection, PeerError>> + Send;
}

/// One connection being negotiated with a remote party.
///
/// Session descriptions are opaque JSON carried verbatim by the relay.
pub trait PeerConnection: Send + 'static {
    /// Offerer side: produces the local offer.
    fn create_offer(&mut self) -> impl Future<Output = Result<Value, PeerError>> + Send;

    /// Answerer side: applies the remote offer and produces the answer.
    fn accept_offer(&mut self, offer: Value)
    -> impl Future<Output = Result<Value, PeerError>> + Send;

    /// Offerer side: applies the remote answer.
    fn accept_answer(&mut self, answer: Value)
    -> impl Future<Output = Result<(), PeerError>> + Send;

    /// Applies a remote candidate.
    fn add_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;

    /// Tears the connection down.
    fn close(&mut self);
}
