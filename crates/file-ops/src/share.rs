//! Read-only view of the seeder's shared directory.

use std::path::{Path, PathBuf};

use seedshare_protocol::FileDescriptor;

use crate::{FileOpsError, validate_file_name};

/// A file resolved inside the shared directory, opened for reading.
pub struct SharedFile {
    pub name: String,
    pub size: u64,
    pub file: tokio::fs::File,
}

/// Flat directory of files offered to peers.
#[derive(Debug, Clone)]
pub struct SharedDir {
    root: PathBuf,
}

impl SharedDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists the regular files directly inside the directory, sorted by name.
    ///
    /// Enumerated live on every call; subdirectories, symlinks to
    /// directories and names that are not valid UTF-8 are skipped.
    pub async fn list(&self) -> Result<Vec<FileDescriptor>, FileOpsError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(path = %entry.path().display(), "skipping non UTF-8 name");
                continue;
            };
            // Follows symlinks, like opening the file later does.
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(%name, "skipping unreadable entry: {e}");
                    continue;
                }
            };
            if metadata.is_file() {
                files.push(FileDescriptor::new(name, metadata.len()));
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Resolves `name` to a regular file of the directory.
    ///
    /// Any name that does not denote such a file, including names that
    /// try to escape the directory, is [`FileOpsError::NotFound`].
    pub async fn resolve(&self, name: &str) -> Result<(PathBuf, u64), FileOpsError> {
        let not_found = || FileOpsError::NotFound(name.to_string());

        validate_file_name(name).map_err(|_| not_found())?;
        let path = self.root.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => Ok((path, m.len())),
            Ok(_) => Err(not_found()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves and opens `name` for streaming.
    pub async fn open(&self, name: &str) -> Result<SharedFile, FileOpsError> {
        let (path, size) = self.resolve(name).await?;
        let file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FileOpsError::NotFound(name.to_string())
            } else {
                FileOpsError::Io(e)
            }
        })?;
        Ok(SharedFile {
            name: name.to_string(),
            size,
            file,
        })
    }
}
