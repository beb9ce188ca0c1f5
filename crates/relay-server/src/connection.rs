//! Relay client connection: read/write pumps, keepalive, send buffering.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use seedshare_protocol::RelayMessage;
use seedshare_protocol::constants::{RELAY_MAX_MESSAGE_SIZE, RELAY_PING_PERIOD, RELAY_PONG_WAIT};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use crate::SEND_BUFFER_SIZE;
use crate::relay::RelayState;

/// Handle for sending frames to one connected client.
///
/// Cloneable; wraps an `mpsc::Sender`.
#[derive(Clone)]
pub struct Sender {
    tx: mpsc::Sender<WsMessage>,
}

impl Sender {
    pub(crate) fn new(tx: mpsc::Sender<WsMessage>) -> Self {
        Self { tx }
    }

    /// Sends a [`RelayMessage`] as JSON text.
    pub fn send_msg(&self, msg: &RelayMessage) -> Result<(), SendError> {
        let json = serde_json::to_string(msg).map_err(|_| SendError)?;
        self.send_text(json)
    }

    /// Enqueues pre-serialized JSON text without waiting.
    ///
    /// Returns `Err` if the buffer is full or the client is gone.
    pub fn send_text(&self, text: String) -> Result<(), SendError> {
        self.tx.try_send(WsMessage::Text(text.into())).map_err(|_| {
            tracing::warn!("send buffer full or closed, dropping message");
            SendError
        })
    }

    /// Returns `true` if the send channel is still open.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Error returned when the send channel is full or closed.
#[derive(Debug, thiserror::Error)]
#[error("send failed: buffer full or connection closed")]
pub struct SendError;

/// Serves one relay connection until it closes or `cancel` fires.
///
/// Registers the client, pushes the welcome notice, then processes
/// inbound frames strictly in arrival order. The client is removed from
/// the registry before this returns.
pub(crate) async fn serve<S>(
    ws_stream: S,
    client_id: String,
    state: Arc<RelayState>,
    cancel: CancellationToken,
) where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error>
        + Send
        + 'static,
{
    let (tx, rx) = mpsc::channel::<WsMessage>(SEND_BUFFER_SIZE);
    let sender = Sender::new(tx);
    let (ws_sink, ws_stream) = ws_stream.split();

    tokio::spawn(write_pump(ws_sink, rx, cancel.clone()));

    state.register(&client_id, sender.clone()).await;

    read_pump(ws_stream, &client_id, &sender, &state, &cancel).await;

    // When the read pump exits, stop the write pump too.
    cancel.cancel();
    state.unregister(&client_id).await;
}

/// Write pump: drains the send channel and sends WS pings.
async fn write_pump<S>(mut sink: S, mut rx: mpsc::Receiver<WsMessage>, cancel: CancellationToken)
where
    S: futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Send + Unpin,
{
    let mut ping_interval = tokio::time::interval(RELAY_PING_PERIOD);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = rx.recv() => {
                match msg {
                    Some(ws_msg) => {
                        if let Err(e) = sink.send(ws_msg).await {
                            tracing::error!("write pump send error: {e}");
                            break;
                        }
                    }
                    None => break, // Channel closed.
                }
            }

            _ = ping_interval.tick() => {
                if let Err(e) = sink.send(WsMessage::Ping(Vec::new().into())).await {
                    tracing::error!("write pump ping error: {e}");
                    break;
                }
            }
        }
    }

    // Best-effort close frame.
    let _ = sink.close().await;
}

/// Read pump: reads WS frames and hands text frames to the relay.
async fn read_pump<S>(
    mut stream: S,
    client_id: &str,
    sender: &Sender,
    state: &RelayState,
    cancel: &CancellationToken,
) where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + Send
        + Unpin,
{
    let mut read_deadline = tokio::time::interval(RELAY_PONG_WAIT);
    read_deadline.reset();
    let mut seen_traffic = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = read_deadline.tick() => {
                if !seen_traffic {
                    tracing::warn!(client = %client_id, "read deadline exceeded, closing connection");
                    break;
                }
                seen_traffic = false;
            }

            frame = stream.next() => {
                seen_traffic = true;
                match frame {
                    Some(Ok(ws_msg)) => match ws_msg {
                        WsMessage::Text(text) => {
                            if text.len() > RELAY_MAX_MESSAGE_SIZE {
                                tracing::error!(client = %client_id, "message exceeds max size ({} > {})", text.len(), RELAY_MAX_MESSAGE_SIZE);
                                continue;
                            }
                            state.handle_text(client_id, &text).await;
                        }
                        WsMessage::Binary(data) => {
                            tracing::warn!(client = %client_id, len = data.len(), "binary frame on relay connection, dropping");
                        }
                        WsMessage::Pong(_) => {}
                        WsMessage::Ping(data) => {
                            let _ = sender.tx.try_send(WsMessage::Pong(data));
                        }
                        WsMessage::Close(_) => {
                            tracing::debug!(client = %client_id, "received close frame");
                            break;
                        }
                        WsMessage::Frame(_) => {} // Raw frames ignored.
                    },
                    Some(Err(e)) => {
                        tracing::error!(client = %client_id, "read pump error: {e}");
                        break;
                    }
                    None => break, // Stream ended.
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_error_display() {
        let err = SendError;
        assert!(err.to_string().contains("buffer full"));
    }

    #[tokio::test]
    async fn sender_enqueues_json_text() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = Sender::new(tx);
        sender.send_msg(&RelayMessage::welcome("abc")).unwrap();

        match rx.recv().await.unwrap() {
            WsMessage::Text(text) => {
                let v: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(v["type"], "welcome");
                assert_eq!(v["id"], "abc");
            }
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sender_full_buffer_drops() {
        let (tx, _rx) = mpsc::channel(1);
        let sender = Sender::new(tx);
        assert!(sender.send_text("{}".into()).is_ok());
        assert!(sender.send_text("{}".into()).is_err());
        assert!(sender.is_connected());
    }

    #[tokio::test]
    async fn sender_detects_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        let sender = Sender::new(tx);
        drop(rx);
        assert!(!sender.is_connected());
        assert!(sender.send_text("{}".into()).is_err());
    }
}
