//! Write pump: serialises outbound frames onto the socket.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

/// Drains `write_rx` into the socket until cancelled or the channel closes.
///
/// Frames already queued when `cancel` fires are still written. A queued
/// `Close` frame ends the pump; otherwise one is sent on exit.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            msg = write_rx.recv() => {
                let Some(m) = msg else { break };
                match forward(&mut write, m).await {
                    Forwarded::Sent => {}
                    Forwarded::Closed => return,
                    Forwarded::Failed => break,
                }
            }
            _ = cancel.cancelled() => {
                write_rx.close();
                while let Some(m) = write_rx.recv().await {
                    match forward(&mut write, m).await {
                        Forwarded::Sent => {}
                        Forwarded::Closed => return,
                        Forwarded::Failed => break,
                    }
                }
                break;
            }
        }
    }

    let _ = write.send(tungstenite::Message::Close(None)).await;
}

enum Forwarded {
    Sent,
    Closed,
    Failed,
}

async fn forward<S>(write: &mut S, msg: tungstenite::Message) -> Forwarded
where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let closing = msg.is_close();
    match write.send(msg).await {
        Ok(()) if closing => Forwarded::Closed,
        Ok(()) => Forwarded::Sent,
        Err(e) => {
            tracing::error!("relay write error: {e}");
            Forwarded::Failed
        }
    }
}
