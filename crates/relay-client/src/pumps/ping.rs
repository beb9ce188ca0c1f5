//! Ping pump: periodic keepalive towards the relay.

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

use seedshare_protocol::constants::RELAY_PING_PERIOD;

/// Sends a ping every [`RELAY_PING_PERIOD`] until cancelled.
pub(crate) async fn ping_pump(
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(RELAY_PING_PERIOD);
    interval.tick().await; // First tick fires immediately.

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let ping = tungstenite::Message::Ping(Vec::new().into());
                if write_tx.send(ping).await.is_err() {
                    break;
                }
            }
        }
    }
}
