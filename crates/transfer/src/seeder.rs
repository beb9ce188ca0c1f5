//! Seeder side of a transfer session.

use tokio::io::{AsyncRead, AsyncReadExt};

use seedshare_file_ops::{FileOpsError, SharedDir};
use seedshare_protocol::ControlFrame;
use seedshare_protocol::constants::{CHUNK_SIZE, ERR_FILE_NOT_FOUND};

use crate::TransferError;
use crate::channel::{ChannelMessage, DirectChannel};
use crate::codec::Frame;

/// Seeder behaviour settings.
#[derive(Debug, Clone)]
pub struct SeederConfig {
    /// Push a `file-list` as soon as the channel opens, unprompted.
    pub announce_on_open: bool,
    /// Upper bound of each binary data frame.
    pub chunk_size: usize,
}

impl Default for SeederConfig {
    fn default() -> Self {
        Self {
            announce_on_open: false,
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeederStats {
    pub listings_sent: u64,
    pub files_sent: u64,
    pub bytes_sent: u64,
    pub errors_sent: u64,
}

/// Serves listing and file requests on one direct channel.
pub struct SeederSession<C> {
    channel: C,
    share: SharedDir,
    config: SeederConfig,
    stats: SeederStats,
}

impl<C: DirectChannel> SeederSession<C> {
    pub fn new(channel: C, share: SharedDir, config: SeederConfig) -> Self {
        let chunk_size = config.chunk_size.clamp(1, CHUNK_SIZE);
        Self {
            channel,
            share,
            config: SeederConfig {
                chunk_size,
                ..config
            },
            stats: SeederStats::default(),
        }
    }

    /// Serves requests until the channel closes.
    ///
    /// Request failures are answered with `error` frames and never end the
    /// session; a close in the middle of a response abandons it.
    pub async fn run(mut self) -> Result<SeederStats, TransferError> {
        tracing::info!(share = %self.share.root().display(), "seeder session started");

        if self.config.announce_on_open {
            match self.send_listing().await {
                Err(TransferError::ChannelClosed) => return Ok(self.stats),
                other => other?,
            }
        }

        while let Some(msg) = self.channel.recv().await {
            let frame = match Frame::decode(msg) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!("dropping undecodable control frame: {e}");
                    continue;
                }
            };

            match self.handle(frame).await {
                Ok(()) => {}
                Err(TransferError::ChannelClosed) => {
                    tracing::info!("channel closed mid-response");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            files = self.stats.files_sent,
            bytes = self.stats.bytes_sent,
            "seeder session ended"
        );
        Ok(self.stats)
    }

    async fn handle(&mut self, frame: Frame) -> Result<(), TransferError> {
        match frame {
            Frame::Control(ControlFrame::RequestList) => self.send_listing().await,
            Frame::Control(ControlFrame::RequestFile { file_name }) => {
                self.send_file(&file_name).await
            }
            Frame::Control(ControlFrame::Error { message }) => {
                tracing::warn!(%message, "peer reported an error");
                Ok(())
            }
            Frame::Control(other) => {
                tracing::debug!(kind = other.kind(), "ignoring control frame");
                Ok(())
            }
            Frame::Binary(data) => {
                tracing::warn!(len = data.len(), "unexpected binary frame, ignoring");
                Ok(())
            }
        }
    }

    async fn send_listing(&mut self) -> Result<(), TransferError> {
        let files = match self.share.list().await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!("failed to list shared directory: {e}");
                return self.send_error(&e.to_string()).await;
            }
        };
        tracing::debug!(count = files.len(), "sending file list");
        self.send_control(ControlFrame::FileList { files }).await?;
        self.stats.listings_sent += 1;
        Ok(())
    }

    async fn send_file(&mut self, name: &str) -> Result<(), TransferError> {
        let shared = match self.share.open(name).await {
            Ok(f) => f,
            Err(FileOpsError::NotFound(_) | FileOpsError::InvalidName(_)) => {
                tracing::warn!(file = %name, "requested file not found");
                return self.send_error(ERR_FILE_NOT_FOUND).await;
            }
            Err(e) => {
                tracing::error!(file = %name, "failed to open shared file: {e}");
                return self.send_error(&e.to_string()).await;
            }
        };

        let size = shared.size;
        tracing::info!(file = %name, size, "sending file");
        self.send_control(ControlFrame::FileStart {
            name: shared.name.clone(),
            size,
        })
        .await?;

        let mut reader = shared.file.take(size);
        let mut buf = vec![0u8; self.config.chunk_size];
        let mut sent: u64 = 0;
        loop {
            let n = match read_chunk(&mut reader, &mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::error!(file = %name, sent, "read failed mid-transfer: {e}");
                    return self.send_error(&format!("read failed: {e}")).await;
                }
            };
            if n == 0 {
                break;
            }
            self.channel
                .send(ChannelMessage::Binary(buf[..n].to_vec()))
                .await?;
            sent += n as u64;
            self.stats.bytes_sent += n as u64;
        }

        if sent != size {
            tracing::error!(file = %name, sent, size, "file shrank during transfer");
            return self.send_error("file changed during transfer").await;
        }

        self.send_control(ControlFrame::FileEnd).await?;
        self.stats.files_sent += 1;
        tracing::info!(file = %name, size, "file sent");
        Ok(())
    }

    async fn send_error(&mut self, message: &str) -> Result<(), TransferError> {
        self.send_control(ControlFrame::Error {
            message: message.to_string(),
        })
        .await?;
        self.stats.errors_sent += 1;
        Ok(())
    }

    async fn send_control(&mut self, frame: ControlFrame) -> Result<(), TransferError> {
        let msg = Frame::Control(frame).encode()?;
        self.channel.send(msg).await
    }
}

/// Fills `buf` from `reader`, short only at end of input.
async fn read_chunk<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
