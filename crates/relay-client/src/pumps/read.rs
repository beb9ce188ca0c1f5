//! Read pump: parses relay frames and hands them to the client inbox.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

use seedshare_protocol::RelayMessage;
use seedshare_protocol::constants::{RELAY_MAX_MESSAGE_SIZE, RELAY_PONG_WAIT};

/// Reads frames until the relay goes away, the read deadline passes, or
/// `cancel` fires. Dropping `inbox` on exit tells the client the
/// connection is gone.
///
/// Any inbound frame resets the deadline.
pub(crate) async fn read_pump<S>(
    mut read: S,
    inbox: mpsc::Sender<RelayMessage>,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let deadline = tokio::time::sleep(RELAY_PONG_WAIT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut deadline => {
                tracing::warn!("relay silent past read deadline, closing");
                break;
            }

            frame = read.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::warn!("relay read error: {e}");
                        break;
                    }
                    None => {
                        tracing::debug!("relay stream ended");
                        break;
                    }
                };
                deadline.as_mut().reset(tokio::time::Instant::now() + RELAY_PONG_WAIT);

                match msg {
                    tungstenite::Message::Text(text) => {
                        let Some(parsed) = parse_text(&text) else { continue };
                        if inbox.send(parsed).await.is_err() {
                            // Client handle dropped.
                            break;
                        }
                    }
                    tungstenite::Message::Ping(data) => {
                        let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                    }
                    tungstenite::Message::Close(_) => {
                        tracing::debug!("relay sent close frame");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Parses one relay text frame, dropping it with a warning if invalid.
pub(crate) fn parse_text(text: &str) -> Option<RelayMessage> {
    if text.len() > RELAY_MAX_MESSAGE_SIZE {
        tracing::warn!(len = text.len(), "oversized relay frame, dropping");
        return None;
    }
    match serde_json::from_str(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::warn!("malformed relay frame: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use seedshare_protocol::RelayMessageType;

    type Frame = Result<tungstenite::Message, tungstenite::Error>;

    fn text(s: &str) -> Frame {
        Ok(tungstenite::Message::Text(s.into()))
    }

    #[test]
    fn parse_text_accepts_relay_message() {
        let msg = parse_text(r#"{"type":"welcome","id":"abc"}"#).unwrap();
        assert_eq!(msg.msg_type, RelayMessageType::Welcome);
        assert_eq!(msg.welcome_id(), Some("abc"));
    }

    #[test]
    fn parse_text_drops_garbage_and_oversize() {
        assert!(parse_text("not valid json {{{").is_none());
        assert!(parse_text(&"x".repeat(RELAY_MAX_MESSAGE_SIZE + 1)).is_none());
    }

    #[tokio::test]
    async fn read_pump_forwards_and_answers_pings() {
        let frames = stream::iter(vec![
            text("garbage"),
            Ok(tungstenite::Message::Ping(vec![7u8].into())),
            text(r#"{"type":"offer","sender":"a","offer":{}}"#),
        ]);
        let (inbox_tx, mut inbox_rx) = mpsc::channel(16);
        let (write_tx, mut write_rx) = mpsc::channel(16);

        read_pump(frames, inbox_tx, write_tx, CancellationToken::new()).await;

        let msg = inbox_rx.recv().await.unwrap();
        assert_eq!(msg.msg_type, RelayMessageType::Offer);
        assert_eq!(msg.sender.as_deref(), Some("a"));
        // Stream ended, the inbox sender was dropped.
        assert!(inbox_rx.recv().await.is_none());

        match write_rx.recv().await.unwrap() {
            tungstenite::Message::Pong(data) => assert_eq!(&data[..], &[7u8]),
            other => panic!("expected pong, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_pump_stops_on_close_frame() {
        let frames = stream::iter(vec![
            Ok(tungstenite::Message::Close(None)),
            text(r#"{"type":"offer","offer":{}}"#),
        ]);
        let (inbox_tx, mut inbox_rx) = mpsc::channel(16);
        let (write_tx, _write_rx) = mpsc::channel(16);

        read_pump(frames, inbox_tx, write_tx, CancellationToken::new()).await;
        assert!(inbox_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn read_pump_times_out_on_silence() {
        tokio::time::pause();
        let (inbox_tx, mut inbox_rx) = mpsc::channel(16);
        let (write_tx, _write_rx) = mpsc::channel(16);

        read_pump(
            stream::pending::<Frame>(),
            inbox_tx,
            write_tx,
            CancellationToken::new(),
        )
        .await;
        assert!(inbox_rx.recv().await.is_none());
    }
}
