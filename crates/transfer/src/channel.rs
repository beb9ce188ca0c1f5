//! Direct channel abstraction.
//!
//! The real peer-to-peer transport lives outside this crate; sessions
//! only need ordered, reliable delivery of text and binary messages and
//! an observable close.

use std::future::Future;

use tokio::sync::mpsc;

use crate::TransferError;

/// One message on the direct channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    Text(String),
    Binary(Vec<u8>),
}

/// An open, ordered, reliable message channel between two peers.
pub trait DirectChannel: Send {
    /// Sends one message, waiting for transport capacity.
    ///
    /// Fails with [`TransferError::ChannelClosed`] once either side closed.
    fn send(
        &mut self,
        msg: ChannelMessage,
    ) -> impl Future<Output = Result<(), TransferError>> + Send;

    /// Next inbound message; `None` once the channel is closed.
    fn recv(&mut self) -> impl Future<Output = Option<ChannelMessage>> + Send;

    /// Closes the channel. Further sends fail; the peer sees `None`.
    fn close(&mut self);
}

/// In-process channel half backed by bounded mpsc queues.
///
/// The bound gives the same backpressure a transport buffer would.
pub struct MemoryChannel {
    tx: Option<mpsc::Sender<ChannelMessage>>,
    rx: mpsc::Receiver<ChannelMessage>,
}

impl MemoryChannel {
    /// Creates two connected halves, each direction holding `capacity` messages.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Some(a_tx),
                rx: a_rx,
            },
            Self {
                tx: Some(b_tx),
                rx: b_rx,
            },
        )
    }
}

impl DirectChannel for MemoryChannel {
    async fn send(&mut self, msg: ChannelMessage) -> Result<(), TransferError> {
        let tx = self.tx.as_ref().ok_or(TransferError::ChannelClosed)?;
        tx.send(msg).await.map_err(|_| TransferError::ChannelClosed)
    }

    async fn recv(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }

    fn close(&mut self) {
        self.tx.take();
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_delivers_both_ways_in_order() {
        let (mut a, mut b) = MemoryChannel::pair(4);
        a.send(ChannelMessage::Text("one".into())).await.unwrap();
        a.send(ChannelMessage::Binary(vec![2])).await.unwrap();
        b.send(ChannelMessage::Text("back".into())).await.unwrap();

        assert_eq!(b.recv().await, Some(ChannelMessage::Text("one".into())));
        assert_eq!(b.recv().await, Some(ChannelMessage::Binary(vec![2])));
        assert_eq!(a.recv().await, Some(ChannelMessage::Text("back".into())));
    }

    #[tokio::test]
    async fn close_is_observable_on_both_sides() {
        let (mut a, mut b) = MemoryChannel::pair(4);
        a.close();
        assert!(matches!(
            a.send(ChannelMessage::Text("x".into())).await,
            Err(TransferError::ChannelClosed)
        ));
        assert_eq!(b.recv().await, None);
        assert!(matches!(
            b.send(ChannelMessage::Text("x".into())).await,
            Err(TransferError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn drop_closes_peer() {
        let (a, mut b) = MemoryChannel::pair(1);
        drop(a);
        assert_eq!(b.recv().await, None);
    }

    #[tokio::test]
    async fn send_waits_for_capacity() {
        let (mut a, mut b) = MemoryChannel::pair(1);
        a.send(ChannelMessage::Binary(vec![1])).await.unwrap();

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            a.send(ChannelMessage::Binary(vec![2])),
        )
        .await;
        assert!(blocked.is_err(), "second send should wait for the reader");

        assert_eq!(b.recv().await, Some(ChannelMessage::Binary(vec![1])));
        a.send(ChannelMessage::Binary(vec![3])).await.unwrap();
        assert_eq!(b.recv().await, Some(ChannelMessage::Binary(vec![3])));
    }
}
