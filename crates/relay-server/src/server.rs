//! Relay WebSocket server.
//!
//! Listens on a TCP port, upgrades every connection to WebSocket, and
//! serves any number of clients concurrently.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::accept_async_with_config;
use tokio_util::sync::CancellationToken;

use seedshare_protocol::constants::{RELAY_DEFAULT_PORT, RELAY_MAX_MESSAGE_SIZE};

use crate::RelayError;
use crate::connection;
use crate::relay::{RelayConfig, RelayState};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    pub relay: RelayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: RELAY_DEFAULT_PORT,
            relay: RelayConfig::default(),
        }
    }
}

/// The signaling relay server.
pub struct RelayServer {
    port: u16,
    state: Arc<RelayState>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
    running: AtomicBool,
}

impl RelayServer {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            port: config.port,
            state: Arc::new(RelayState::new(config.relay)),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    /// Returns the local address the server is listening on.
    ///
    /// Only available after [`run`](Self::run) binds the socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the listening port (0 if not yet bound).
    pub async fn port(&self) -> u16 {
        self.local_addr.lock().await.map(|a| a.port()).unwrap_or(0)
    }

    /// Number of currently registered clients.
    pub async fn client_count(&self) -> usize {
        self.state.client_count().await
    }

    pub fn state(&self) -> &Arc<RelayState> {
        &self.state
    }

    /// Stops accepting and closes every open connection.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs the server until [`shutdown`](Self::shutdown).
    pub async fn run(self: &Arc<Self>) -> Result<(), RelayError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RelayError::AlreadyRunning);
        }

        let addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);
        tracing::info!("relay listening on {local_addr}");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("relay shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(self);
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, peer_addr).await {
                                    tracing::warn!(%peer_addr, "connection error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {e}");
                        }
                    }
                }
            }
        }

        *self.local_addr.lock().await = None;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Upgrades one TCP connection and serves it until it closes.
    async fn handle_connection(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), RelayError> {
        let mut ws_config = tokio_tungstenite::tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(RELAY_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(RELAY_MAX_MESSAGE_SIZE);
        let ws_stream = accept_async_with_config(stream, Some(ws_config)).await?;

        let client_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(%peer_addr, client = %client_id, "WebSocket connection established");

        connection::serve(
            ws_stream,
            client_id,
            Arc::clone(&self.state),
            self.cancel.child_token(),
        )
        .await;
        Ok(())
    }
}
