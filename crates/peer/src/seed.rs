//! Seeder side: answers offers and serves every opened channel.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use seedshare_file_ops::{SharedDir, expand_home};
use seedshare_protocol::constants::DEFAULT_ROOM;
use seedshare_protocol::relay::ROLE_SEEDER;
use seedshare_protocol::{RelayMessage, RelayMessageType};
use seedshare_relay_client::RelayClient;
use seedshare_transfer::{SeederConfig, SeederSession, SeederStats, TransferError};

use crate::PeerError;
use crate::transport::{
    EventQueue, IceConfig, PeerConnection, PeerEvents, PeerTransport, TransportEvent,
};

/// Seeder settings.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub room: String,
    /// Shared directory; a leading `~` is expanded.
    pub shared_dir: String,
    pub ice: IceConfig,
    pub session: SeederConfig,
}

impl SeedOptions {
    pub fn new(shared_dir: impl Into<String>) -> Self {
        Self {
            room: DEFAULT_ROOM.to_string(),
            shared_dir: shared_dir.into(),
            ice: IceConfig::default(),
            session: SeederConfig::default(),
        }
    }
}

type SessionResult = (String, Result<SeederStats, TransferError>);

/// Seeder coordinator: one negotiated connection per peer id.
pub struct SeedNode<T: PeerTransport> {
    transport: T,
    options: SeedOptions,
    share: SharedDir,
    peers: HashMap<String, T::Connection>,
    events_tx: mpsc::UnboundedSender<(String, TransportEvent<T::Channel>)>,
    events_rx: EventQueue<T::Channel>,
    sessions: JoinSet<SessionResult>,
}

impl<T: PeerTransport> SeedNode<T> {
    pub fn new(transport: T, options: SeedOptions) -> Self {
        let share = SharedDir::new(expand_home(&options.shared_dir));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            options,
            share,
            peers: HashMap::new(),
            events_tx,
            events_rx,
            sessions: JoinSet::new(),
        }
    }

    pub fn share(&self) -> &SharedDir {
        &self.share
    }

    /// Peers with a live connection.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn has_peer(&self, id: &str) -> bool {
        self.peers.contains_key(id)
    }

    /// Transfer sessions still running.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Joins the room as seeder and serves until `cancel` fires.
    ///
    /// Returns an error only when the relay connection is lost.
    pub async fn run(
        &mut self,
        relay: &RelayClient,
        cancel: CancellationToken,
    ) -> Result<(), PeerError> {
        relay.join(Some(&self.options.room), Some(ROLE_SEEDER)).await?;
        tracing::info!(
            room = %self.options.room,
            share = %self.share.root().display(),
            "seeder joined room"
        );

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),

                msg = relay.recv() => match msg {
                    Ok(msg) => self.handle_relay(relay, msg).await,
                    Err(e) => break Err(e.into()),
                },

                Some((remote, event)) = self.events_rx.recv() => {
                    self.handle_transport(relay, &remote, event).await;
                }

                Some(joined) = self.sessions.join_next(), if !self.sessions.is_empty() => {
                    match joined {
                        Ok((remote, outcome)) => self.session_finished(&remote, outcome),
                        Err(e) => tracing::error!("seeder session task failed: {e}"),
                    }
                }
            }
        };

        for (_, mut conn) in self.peers.drain() {
            conn.close();
        }
        self.sessions.abort_all();
        result
    }

    /// Applies one relay message. Failures are logged; none are fatal.
    pub async fn handle_relay(&mut self, relay: &RelayClient, msg: RelayMessage) {
        let Some(sender) = msg.sender.clone() else {
            tracing::warn!(msg_type = %msg.msg_type, "relay message without sender, dropping");
            return;
        };

        match msg.msg_type {
            RelayMessageType::Offer => {
                if let Err(e) = self.on_offer(relay, &sender, &msg).await {
                    tracing::warn!(peer = %sender, "offer failed: {e}");
                    if let Some(mut conn) = self.peers.remove(&sender) {
                        conn.close();
                    }
                }
            }
            RelayMessageType::Candidate => {
                let Some(conn) = self.peers.get_mut(&sender) else {
                    tracing::debug!(peer = %sender, "candidate from unknown peer, dropping");
                    return;
                };
                let Some(candidate) = msg.ice_candidate() else {
                    tracing::warn!(peer = %sender, "malformed candidate, dropping");
                    return;
                };
                if let Err(e) = conn.add_candidate(candidate).await {
                    tracing::warn!(peer = %sender, "ICE candidate error: {e}");
                }
            }
            RelayMessageType::Error => {
                tracing::warn!(
                    peer = %sender,
                    message = msg.error_message().unwrap_or_default(),
                    "peer reported an error"
                );
            }
            other => {
                tracing::debug!(peer = %sender, msg_type = %other, "ignoring relay message");
            }
        }
    }

    async fn on_offer(
        &mut self,
        relay: &RelayClient,
        sender: &str,
        msg: &RelayMessage,
    ) -> Result<(), PeerError> {
        let offer = msg
            .description()
            .cloned()
            .ok_or_else(|| PeerError::Transport("offer without description".into()))?;

        if let Some(mut stale) = self.peers.remove(sender) {
            tracing::info!(peer = %sender, "renegotiating, dropping previous connection");
            stale.close();
        }

        tracing::info!(peer = %sender, "creating peer connection");
        let events = PeerEvents::new(sender, self.events_tx.clone());
        let mut conn = self.transport.connect(&self.options.ice, events).await?;
        let answer = match conn.accept_offer(offer).await {
            Ok(answer) => answer,
            Err(e) => {
                conn.close();
                return Err(e);
            }
        };
        self.peers.insert(sender.to_string(), conn);
        relay.send_answer(sender, answer).await?;
        Ok(())
    }

    /// Applies one event reported by a peer connection.
    pub async fn handle_transport(
        &mut self,
        relay: &RelayClient,
        remote: &str,
        event: TransportEvent<T::Channel>,
    ) {
        if !self.peers.contains_key(remote) {
            tracing::debug!(peer = %remote, ?event, "event from a dropped connection");
            return;
        }

        match event {
            TransportEvent::LocalCandidate(candidate) => {
                if let Err(e) = relay.send_candidate(remote, &candidate).await {
                    tracing::warn!(peer = %remote, "failed to send candidate: {e}");
                }
            }
            TransportEvent::ChannelOpen(channel) => {
                tracing::info!(peer = %remote, "data channel opened");
                let session = SeederSession::new(
                    channel,
                    self.share.clone(),
                    self.options.session.clone(),
                );
                let remote = remote.to_string();
                self.sessions
                    .spawn(async move { (remote, session.run().await) });
            }
            TransportEvent::Disconnected => {
                tracing::info!(peer = %remote, "peer disconnected");
                if let Some(mut conn) = self.peers.remove(remote) {
                    conn.close();
                }
            }
        }
    }

    fn session_finished(&mut self, remote: &str, outcome: Result<SeederStats, TransferError>) {
        match outcome {
            Ok(stats) => tracing::info!(
                peer = %remote,
                files = stats.files_sent,
                bytes = stats.bytes_sent,
                "seeder session finished"
            ),
            Err(e) => tracing::warn!(peer = %remote, "seeder session failed: {e}"),
        }
        if let Some(mut conn) = self.peers.remove(remote) {
            conn.close();
        }
    }
}
