//! File operations behind the transfer sessions.
//!
//! The seeder side lists and opens files of a flat shared directory; the
//! receiver side streams downloads into `<name>.part` files that are only
//! renamed into place once complete.

mod download;
mod name;
mod share;

use std::path::PathBuf;

pub use download::{DownloadDir, PARTIAL_SUFFIX, PartialFile};
pub use name::validate_file_name;
pub use share::{SharedDir, SharedFile};

/// Errors from file operations.
#[derive(Debug, thiserror::Error)]
pub enum FileOpsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("file not found: {0}")]
    NotFound(String),
}

/// Expands a `~` prefix to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}

/// Returns the user's home directory, `/tmp` if unknown.
fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
