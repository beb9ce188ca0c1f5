//! Relay WebSocket client.

use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

use seedshare_protocol::constants::{RELAY_MAX_MESSAGE_SIZE, RELAY_WELCOME_TIMEOUT};
use seedshare_protocol::{IceCandidate, RelayMessage, RelayMessageType};

/// Upper bound on flushing queued frames during [`RelayClient::close`].
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors from the relay client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed")]
    Closed,

    #[error("timed out waiting for relay")]
    Timeout,

    #[error("relay error: {message}")]
    Relay { message: String },
}

/// Connection to the signaling relay.
///
/// Inbound messages already carry the relay-stamped `sender`.
pub struct RelayClient {
    id: String,
    write_tx: mpsc::Sender<tungstenite::Message>,
    inbox: Mutex<mpsc::Receiver<RelayMessage>>,
    cancel: CancellationToken,
    _read_handle: tokio::task::JoinHandle<()>,
    write_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    _ping_handle: tokio::task::JoinHandle<()>,
}

impl RelayClient {
    /// Connects to `url` and waits for the `welcome` notice.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        Self::connect_with_timeout(url, RELAY_WELCOME_TIMEOUT).await
    }

    pub async fn connect_with_timeout(url: &str, welcome_timeout: Duration) -> Result<Self, ClientError> {
        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(RELAY_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(RELAY_MAX_MESSAGE_SIZE);
        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false).await?;
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(256);
        let (inbox_tx, mut inbox_rx) = mpsc::channel::<RelayMessage>(256);
        let cancel = CancellationToken::new();

        let write_handle = tokio::spawn(crate::pumps::write::write_pump(
            write,
            write_rx,
            cancel.clone(),
        ));
        let read_handle = tokio::spawn(crate::pumps::read::read_pump(
            read,
            inbox_tx,
            write_tx.clone(),
            cancel.clone(),
        ));
        let ping_handle = tokio::spawn(crate::pumps::ping::ping_pump(
            write_tx.clone(),
            cancel.clone(),
        ));

        let id = match tokio::time::timeout(welcome_timeout, wait_welcome(&mut inbox_rx)).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                cancel.cancel();
                return Err(e);
            }
            Err(_) => {
                cancel.cancel();
                return Err(ClientError::Timeout);
            }
        };
        tracing::info!(client = %id, "connected to relay");

        Ok(Self {
            id,
            write_tx,
            inbox: Mutex::new(inbox_rx),
            cancel,
            _read_handle: read_handle,
            write_handle: Mutex::new(Some(write_handle)),
            _ping_handle: ping_handle,
        })
    }

    /// Id the relay assigned to this connection.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Joins `room` (the relay default when `None`), optionally declaring a role.
    pub async fn join(&self, room: Option<&str>, role: Option<&str>) -> Result<(), ClientError> {
        self.send(&RelayMessage::join(room, role)).await
    }

    pub async fn send_offer(&self, recipient: &str, offer: Value) -> Result<(), ClientError> {
        self.send(&RelayMessage::offer(recipient, offer)).await
    }

    pub async fn send_answer(&self, recipient: &str, answer: Value) -> Result<(), ClientError> {
        self.send(&RelayMessage::answer(recipient, answer)).await
    }

    pub async fn send_candidate(
        &self,
        recipient: &str,
        candidate: &IceCandidate,
    ) -> Result<(), ClientError> {
        self.send(&RelayMessage::candidate(recipient, candidate)).await
    }

    /// Sends an advisory `error` to the room.
    pub async fn send_error(&self, message: &str) -> Result<(), ClientError> {
        self.send(&RelayMessage::error(message)).await
    }

    /// Sends any relay message as-is.
    pub async fn send(&self, msg: &RelayMessage) -> Result<(), ClientError> {
        let json = serde_json::to_string(msg)?;
        tracing::debug!(client = %self.id, msg_type = %msg.msg_type, "sending to relay");
        self.write_tx
            .send(tungstenite::Message::Text(json.into()))
            .await
            .map_err(|_| ClientError::Closed)
    }

    /// Next inbound message; [`ClientError::Closed`] once the relay is gone.
    pub async fn recv(&self) -> Result<RelayMessage, ClientError> {
        self.inbox.lock().await.recv().await.ok_or(ClientError::Closed)
    }

    /// Waits for the next message of `msg_type`, skipping others.
    ///
    /// An `error` from a peer ends the wait with [`ClientError::Relay`].
    pub async fn recv_type(
        &self,
        msg_type: RelayMessageType,
        timeout: Duration,
    ) -> Result<RelayMessage, ClientError> {
        let wait = async {
            loop {
                let msg = self.recv().await?;
                if msg.msg_type == msg_type {
                    return Ok(msg);
                }
                if msg.msg_type == RelayMessageType::Error {
                    return Err(ClientError::Relay {
                        message: msg.error_message().unwrap_or_default().to_string(),
                    });
                }
                tracing::debug!(client = %self.id, msg_type = %msg.msg_type, "skipping relay message");
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    /// Closes the connection once every frame queued before it is written.
    pub async fn close(&self) {
        let _ = self.write_tx.send(tungstenite::Message::Close(None)).await;
        self.cancel.cancel();
        let Some(handle) = self.write_handle.lock().await.take() else {
            return;
        };
        if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, handle).await.is_err() {
            tracing::warn!(client = %self.id, "relay writer did not flush before close");
        }
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        self._read_handle.abort();
        if let Some(handle) = self.write_handle.get_mut().take() {
            handle.abort();
        }
        self._ping_handle.abort();
    }
}

async fn wait_welcome(inbox: &mut mpsc::Receiver<RelayMessage>) -> Result<String, ClientError> {
    loop {
        let msg = inbox.recv().await.ok_or(ClientError::Closed)?;
        match msg.msg_type {
            RelayMessageType::Welcome => {
                if let Some(id) = msg.welcome_id() {
                    return Ok(id.to_string());
                }
                tracing::warn!("welcome without id, ignoring");
            }
            RelayMessageType::Error => {
                return Err(ClientError::Relay {
                    message: msg.error_message().unwrap_or_default().to_string(),
                });
            }
            other => tracing::debug!(msg_type = %other, "message before welcome, skipping"),
        }
    }
}
