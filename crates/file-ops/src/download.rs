//! Download directory with streaming `.part` files.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::{FileOpsError, validate_file_name};

/// Suffix of in-progress downloads.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Directory that completed downloads land in.
#[derive(Debug, Clone)]
pub struct DownloadDir {
    root: PathBuf,
}

impl DownloadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts a download of `name`, truncating any stale `.part` file.
    pub async fn create_partial(&self, name: &str) -> Result<PartialFile, FileOpsError> {
        validate_file_name(name)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let final_path = self.root.join(name);
        let part_path = self.root.join(format!("{name}{PARTIAL_SUFFIX}"));
        let file = tokio::fs::File::create(&part_path).await?;
        tracing::debug!(path = %part_path.display(), "partial download created");

        Ok(PartialFile {
            final_path,
            part_path,
            file: Some(file),
            written: 0,
        })
    }
}

/// An in-progress download.
///
/// Bytes are appended in arrival order. [`finish`](Self::finish) renames
/// the file into place; [`discard`](Self::discard) or dropping the value
/// removes it, so an incomplete download never persists.
#[derive(Debug)]
pub struct PartialFile {
    final_path: PathBuf,
    part_path: PathBuf,
    file: Option<tokio::fs::File>,
    written: u64,
}

impl PartialFile {
    /// Appends one fragment.
    pub async fn append(&mut self, data: &[u8]) -> Result<(), FileOpsError> {
        let Some(file) = self.file.as_mut() else {
            return Err(FileOpsError::Io(std::io::Error::other(
                "partial file already closed",
            )));
        };
        file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Bytes appended so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    /// Flushes and renames the download to its final name.
    pub async fn finish(mut self) -> Result<PathBuf, FileOpsError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        tokio::fs::rename(&self.part_path, &self.final_path).await?;
        // Renamed: nothing left for Drop to clean up.
        self.part_path = PathBuf::new();
        Ok(std::mem::take(&mut self.final_path))
    }

    /// Removes the partial file.
    pub async fn discard(mut self) {
        self.file.take();
        let path = std::mem::take(&mut self.part_path);
        if let Err(e) = tokio::fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), "failed to remove partial download: {e}");
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.part_path.as_os_str().is_empty() {
            return;
        }
        self.file.take();
        let _ = std::fs::remove_file(&self.part_path);
    }
}
