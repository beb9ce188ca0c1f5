//! Peer side: offers to the room's seeder and downloads one file.

use std::time::Duration;

use tokio::sync::mpsc;

use seedshare_file_ops::{DownloadDir, expand_home};
use seedshare_protocol::constants::{DEFAULT_ROOM, SEEDER_RECIPIENT};
use seedshare_protocol::{IceCandidate, RelayMessageType};
use seedshare_relay_client::RelayClient;
use seedshare_transfer::{DownloadedFile, FileSelection, ReceiverSession};

use crate::PeerError;
use crate::transport::{IceConfig, PeerConnection, PeerEvents, PeerTransport, TransportEvent};

/// Time allowed from the offer to an open direct channel.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Peer settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub room: String,
    /// Download directory; a leading `~` is expanded.
    pub download_dir: String,
    pub selection: FileSelection,
    pub ice: IceConfig,
    pub connect_timeout: Duration,
}

impl FetchOptions {
    pub fn new(download_dir: impl Into<String>) -> Self {
        Self {
            room: DEFAULT_ROOM.to_string(),
            download_dir: download_dir.into(),
            selection: FileSelection::First,
            ice: IceConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Peer coordinator.
pub struct PeerNode<T: PeerTransport> {
    transport: T,
    options: FetchOptions,
}

impl<T: PeerTransport> PeerNode<T> {
    pub fn new(transport: T, options: FetchOptions) -> Self {
        Self { transport, options }
    }

    /// Opens a channel to the seeder and downloads the selected file.
    pub async fn fetch(&self, relay: &RelayClient) -> Result<DownloadedFile, PeerError> {
        let (mut conn, channel) = self.open_channel(relay).await?;
        let downloads = DownloadDir::new(expand_home(&self.options.download_dir));
        let mut session = ReceiverSession::new(channel, downloads);
        let result = session.download(self.options.selection.clone()).await;
        session.close().await;
        conn.close();

        let file = result?;
        tracing::info!(file = %file.name, size = file.size, path = %file.path.display(), "download complete");
        Ok(file)
    }

    /// Joins the room, negotiates with its seeder and returns the open
    /// channel together with the connection that carries it.
    pub async fn open_channel(
        &self,
        relay: &RelayClient,
    ) -> Result<(T::Connection, T::Channel), PeerError> {
        let (tx, mut events) = mpsc::unbounded_channel();
        let mut conn = self
            .transport
            .connect(&self.options.ice, PeerEvents::new(SEEDER_RECIPIENT, tx))
            .await?;

        let negotiated = tokio::time::timeout(
            self.options.connect_timeout,
            self.negotiate(relay, &mut conn, &mut events),
        )
        .await;

        match negotiated {
            Ok(Ok(channel)) => Ok((conn, channel)),
            Ok(Err(e)) => {
                conn.close();
                Err(e)
            }
            Err(_) => {
                tracing::warn!(room = %self.options.room, "no direct channel before timeout");
                conn.close();
                Err(PeerError::Timeout)
            }
        }
    }

    async fn negotiate(
        &self,
        relay: &RelayClient,
        conn: &mut T::Connection,
        events: &mut mpsc::UnboundedReceiver<(String, TransportEvent<T::Channel>)>,
    ) -> Result<T::Channel, PeerError> {
        relay.join(Some(&self.options.room), None).await?;
        let offer = conn.create_offer().await?;
        relay.send_offer(SEEDER_RECIPIENT, offer).await?;
        tracing::info!(room = %self.options.room, "offer sent to seeder");

        // Set by the answer; candidates from anyone else are ignored.
        let mut seeder: Option<String> = None;
        let mut early: Vec<(String, IceCandidate)> = Vec::new();

        loop {
            tokio::select! {
                msg = relay.recv() => {
                    let msg = msg?;
                    let Some(sender) = msg.sender.clone() else { continue };
                    match msg.msg_type {
                        RelayMessageType::Answer if seeder.is_none() => {
                            let answer = msg.description().cloned().ok_or_else(|| {
                                PeerError::Transport("answer without description".into())
                            })?;
                            conn.accept_answer(answer).await?;
                            tracing::info!(seeder = %sender, "answer received");
                            for (_, candidate) in early.drain(..).filter(|(from, _)| *from == sender) {
                                apply_candidate(conn, &sender, candidate).await;
                            }
                            seeder = Some(sender);
                        }
                        RelayMessageType::Candidate => {
                            let Some(candidate) = msg.ice_candidate() else {
                                tracing::warn!(from = %sender, "malformed candidate, dropping");
                                continue;
                            };
                            match seeder.as_deref() {
                                Some(id) if id == sender => apply_candidate(conn, &sender, candidate).await,
                                Some(_) => tracing::debug!(from = %sender, "candidate from another peer, dropping"),
                                None => early.push((sender, candidate)),
                            }
                        }
                        RelayMessageType::Error => {
                            tracing::warn!(
                                from = %sender,
                                message = msg.error_message().unwrap_or_default(),
                                "relay error from room member"
                            );
                        }
                        other => tracing::debug!(from = %sender, msg_type = %other, "ignoring relay message"),
                    }
                }

                Some((_, event)) = events.recv() => match event {
                    TransportEvent::LocalCandidate(candidate) => {
                        let recipient = seeder.as_deref().unwrap_or(SEEDER_RECIPIENT);
                        relay.send_candidate(recipient, &candidate).await?;
                    }
                    TransportEvent::ChannelOpen(channel) => {
                        tracing::info!(seeder = seeder.as_deref().unwrap_or("-"), "data channel opened");
                        return Ok(channel);
                    }
                    TransportEvent::Disconnected => return Err(PeerError::Disconnected),
                },
            }
        }
    }
}

async fn apply_candidate<C: PeerConnection>(conn: &mut C, from: &str, candidate: IceCandidate) {
    if let Err(e) = conn.add_candidate(candidate).await {
        tracing::warn!(from = %from, "ICE candidate error: {e}");
    }
}
