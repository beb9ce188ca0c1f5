//! File transfer over an already-open direct channel.
//!
//! The seeder answers listing and file requests from its shared
//! directory; the receiver drives `request-list` → `request-file` →
//! `file-start` / binary chunks / `file-end` and stores the result.

mod channel;
mod codec;
mod progress;
mod receiver;
mod seeder;

pub use channel::{ChannelMessage, DirectChannel, MemoryChannel};
pub use codec::Frame;
pub use progress::TransferProgress;
pub use receiver::{
    DownloadedFile, FileSelection, ReceiverEvent, ReceiverSession, SessionState, TransferState,
};
pub use seeder::{SeederConfig, SeederSession, SeederStats};

use seedshare_file_ops::FileOpsError;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel closed")]
    ChannelClosed,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("no files available")]
    NoFilesAvailable,

    #[error(transparent)]
    FileOps(#[from] FileOpsError),
}
