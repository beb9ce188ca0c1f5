//! In-process transport over [`MemoryChannel`] pairs.
//!
//! Negotiation is real: the offer names a waiting channel, and the channel
//! only opens once each side has applied the remote description and at
//! least one remote candidate, so every signaling message must cross the
//! relay. Useful for local loopback and end-to-end tests.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::Mutex;

use seedshare_protocol::IceCandidate;
use seedshare_transfer::{DirectChannel, MemoryChannel};

use crate::PeerError;
use crate::transport::{IceConfig, PeerConnection, PeerEvents, PeerTransport, TransportEvent};

/// Messages buffered per direction of a loopback channel.
pub const LOOPBACK_CAPACITY: usize = 32;

#[derive(Default)]
struct Switchboard {
    next_session: u64,
    waiting: HashMap<String, MemoryChannel>,
}

/// Transport whose connections meet in a shared in-memory switchboard.
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    switchboard: Arc<Mutex<Switchboard>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers not yet picked up by an answerer.
    pub async fn pending_offers(&self) -> usize {
        self.switchboard.lock().await.waiting.len()
    }
}

impl PeerTransport for LoopbackTransport {
    type Channel = MemoryChannel;
    type Connection = LoopbackConnection;

    async fn connect(
        &self,
        _ice: &IceConfig,
        events: PeerEvents<MemoryChannel>,
    ) -> Result<LoopbackConnection, PeerError> {
        Ok(LoopbackConnection {
            switchboard: Arc::clone(&self.switchboard),
            events,
            session: None,
            channel: None,
            has_remote_description: false,
            has_remote_candidate: false,
        })
    }
}

/// One side of a loopback negotiation.
pub struct LoopbackConnection {
    switchboard: Arc<Mutex<Switchboard>>,
    events: PeerEvents<MemoryChannel>,
    session: Option<String>,
    channel: Option<MemoryChannel>,
    has_remote_description: bool,
    has_remote_candidate: bool,
}

impl LoopbackConnection {
    fn announce_candidate(&self, session: &str) {
        self.events.emit(TransportEvent::LocalCandidate(IceCandidate {
            candidate: format!("candidate:{session} 1 loopback 1 127.0.0.1 0 typ host"),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
        }));
    }

    fn maybe_open(&mut self) {
        if !(self.has_remote_description && self.has_remote_candidate) {
            return;
        }
        if let Some(channel) = self.channel.take() {
            tracing::debug!(remote = %self.events.remote(), "loopback channel open");
            self.events.emit(TransportEvent::ChannelOpen(channel));
        }
    }

    fn session_of(description: &Value) -> Result<String, PeerError> {
        description
            .get("sdp")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PeerError::Transport("description without sdp".into()))
    }
}

impl PeerConnection for LoopbackConnection {
    async fn create_offer(&mut self) -> Result<Value, PeerError> {
        let session = {
            let mut board = self.switchboard.lock().await;
            board.next_session += 1;
            let session = format!("loopback-{}", board.next_session);
            let (near, far) = MemoryChannel::pair(LOOPBACK_CAPACITY);
            board.waiting.insert(session.clone(), far);
            self.channel = Some(near);
            session
        };
        self.announce_candidate(&session);
        self.session = Some(session.clone());
        Ok(json!({"type": "offer", "sdp": session}))
    }

    async fn accept_offer(&mut self, offer: Value) -> Result<Value, PeerError> {
        let session = Self::session_of(&offer)?;
        let channel = self
            .switchboard
            .lock()
            .await
            .waiting
            .remove(&session)
            .ok_or_else(|| PeerError::Transport(format!("unknown offer {session}")))?;
        self.channel = Some(channel);
        self.has_remote_description = true;
        self.announce_candidate(&session);
        self.session = Some(session.clone());
        self.maybe_open();
        Ok(json!({"type": "answer", "sdp": session}))
    }

    async fn accept_answer(&mut self, answer: Value) -> Result<(), PeerError> {
        let session = Self::session_of(&answer)?;
        if self.session.as_deref() != Some(session.as_str()) {
            return Err(PeerError::Transport(format!("answer for {session} does not match")));
        }
        self.has_remote_description = true;
        self.maybe_open();
        Ok(())
    }

    async fn add_candidate(&mut self, candidate: IceCandidate) -> Result<(), PeerError> {
        let matches = self
            .session
            .as_deref()
            .is_some_and(|s| candidate.candidate.starts_with(&format!("candidate:{s} ")));
        if !matches {
            return Err(PeerError::Transport(format!(
                "candidate for another session: {}",
                candidate.candidate
            )));
        }
        self.has_remote_candidate = true;
        self.maybe_open();
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        if let Some(session) = self.session.take() {
            if let Ok(mut board) = self.switchboard.try_lock() {
                board.waiting.remove(&session);
            }
        }
    }
}
