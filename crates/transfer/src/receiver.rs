//! Receiver side of a transfer session.
//!
//! `Idle → Listing → AwaitingStart → Receiving → Idle`, driven one frame
//! at a time by [`ReceiverSession::next_event`].

use std::path::PathBuf;

use seedshare_file_ops::{DownloadDir, FileOpsError, PartialFile};
use seedshare_protocol::{ControlFrame, FileDescriptor};

use crate::TransferError;
use crate::channel::DirectChannel;
use crate::codec::Frame;
use crate::progress::TransferProgress;

/// Receiver session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listing,
    AwaitingStart,
    Receiving,
}

/// Which file to request once a listing arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    /// First entry of the listing.
    First,
    /// A specific name, requested even if the listing lacks it.
    Named(String),
}

/// The transfer in progress. At most one exists per session.
#[derive(Debug)]
pub struct TransferState {
    pub name: String,
    pub expected_size: u64,
    pub received_bytes: u64,
    pub chunks: u64,
    partial: PartialFile,
}

impl TransferState {
    pub fn progress(&self) -> TransferProgress {
        TransferProgress::new(self.received_bytes, self.expected_size)
    }
}

/// A completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub chunks: u64,
}

/// Something the caller should know about.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverEvent {
    Listing(Vec<FileDescriptor>),
    Started { name: String, size: u64 },
    Progress { name: String, progress: TransferProgress },
    Completed(DownloadedFile),
    /// The seeder answered with an `error` frame.
    RemoteError(String),
}

/// Drives listing and download over one direct channel.
pub struct ReceiverSession<C> {
    channel: C,
    downloads: DownloadDir,
    state: SessionState,
    selection: FileSelection,
    /// Selection applied to the pending listing, if any.
    auto_request: Option<FileSelection>,
    transfer: Option<TransferState>,
}

impl<C: DirectChannel> ReceiverSession<C> {
    pub fn new(channel: C, downloads: DownloadDir) -> Self {
        Self {
            channel,
            downloads,
            state: SessionState::Idle,
            selection: FileSelection::First,
            auto_request: None,
            transfer: None,
        }
    }

    /// Selection used by [`open`](Self::open).
    pub fn with_selection(mut self, selection: FileSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The transfer in progress, if any.
    pub fn transfer(&self) -> Option<&TransferState> {
        self.transfer.as_ref()
    }

    /// Channel-open hook: asks for the listing and requests a file from it
    /// according to the configured selection.
    pub async fn open(&mut self) -> Result<(), TransferError> {
        self.send_request_list(Some(self.selection.clone())).await
    }

    /// Asks for the listing only.
    pub async fn request_list(&mut self) -> Result<(), TransferError> {
        self.send_request_list(None).await
    }

    /// Requests one file by name.
    pub async fn request_file(&mut self, name: &str) -> Result<(), TransferError> {
        if self.state == SessionState::Receiving {
            return Err(TransferError::Protocol(
                "a transfer is already in progress".into(),
            ));
        }
        self.send_control(ControlFrame::RequestFile {
            file_name: name.to_string(),
        })
        .await?;
        self.auto_request = None;
        self.state = SessionState::AwaitingStart;
        tracing::debug!(file = %name, "file requested");
        Ok(())
    }

    /// Runs a whole cycle: listing, request, download.
    pub async fn download(
        &mut self,
        selection: FileSelection,
    ) -> Result<DownloadedFile, TransferError> {
        let first = selection == FileSelection::First;
        self.send_request_list(Some(selection)).await?;

        loop {
            match self.next_event().await? {
                None => return Err(TransferError::ChannelClosed),
                Some(ReceiverEvent::Listing(files)) if first && files.is_empty() => {
                    return Err(TransferError::NoFilesAvailable);
                }
                Some(ReceiverEvent::Completed(file)) => return Ok(file),
                Some(ReceiverEvent::RemoteError(message)) => {
                    return Err(TransferError::Remote(message));
                }
                Some(_) => {}
            }
        }
    }

    /// Processes inbound frames until one produces an event.
    ///
    /// Returns `Ok(None)` once the channel is closed; a transfer in
    /// progress is discarded. Protocol violations that abort a transfer
    /// come back as [`TransferError::Protocol`], after which the session
    /// is `Idle` and usable again.
    pub async fn next_event(&mut self) -> Result<Option<ReceiverEvent>, TransferError> {
        loop {
            let Some(msg) = self.channel.recv().await else {
                if let Some(t) = self.transfer.take() {
                    tracing::warn!(file = %t.name, received = t.received_bytes, "channel closed mid-transfer, discarding");
                    t.partial.discard().await;
                }
                self.state = SessionState::Idle;
                self.auto_request = None;
                return Ok(None);
            };

            let frame = match Frame::decode(msg) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!("dropping undecodable control frame: {e}");
                    continue;
                }
            };

            if let Some(event) = self.handle(frame).await? {
                return Ok(Some(event));
            }
        }
    }

    /// Closes the channel, discarding any transfer in progress.
    pub async fn close(&mut self) {
        self.channel.close();
        self.abort_transfer().await;
    }

    async fn handle(&mut self, frame: Frame) -> Result<Option<ReceiverEvent>, TransferError> {
        match frame {
            Frame::Binary(data) => self.on_chunk(data).await,
            Frame::Control(ControlFrame::FileList { files }) => self.on_listing(files).await,
            Frame::Control(ControlFrame::FileStart { name, size }) => {
                self.on_file_start(name, size).await
            }
            Frame::Control(ControlFrame::FileEnd) => self.on_file_end().await,
            Frame::Control(ControlFrame::Error { message }) => {
                tracing::warn!(state = ?self.state, %message, "seeder reported an error");
                self.abort_transfer().await;
                Ok(Some(ReceiverEvent::RemoteError(message)))
            }
            Frame::Control(other) => {
                tracing::debug!(kind = other.kind(), "ignoring control frame");
                Ok(None)
            }
        }
    }

    async fn on_listing(
        &mut self,
        files: Vec<FileDescriptor>,
    ) -> Result<Option<ReceiverEvent>, TransferError> {
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        tracing::info!(count = files.len(), files = ?names, "file list received");

        if self.state != SessionState::Listing {
            // Unprompted listing (announce on open): surface only.
            return Ok(Some(ReceiverEvent::Listing(files)));
        }

        let target = match self.auto_request.take() {
            Some(FileSelection::First) => files.first().map(|f| f.name.clone()),
            Some(FileSelection::Named(name)) => Some(name),
            None => None,
        };
        match target {
            Some(name) => self.request_file(&name).await?,
            None => self.state = SessionState::Idle,
        }
        Ok(Some(ReceiverEvent::Listing(files)))
    }

    async fn on_file_start(
        &mut self,
        name: String,
        size: u64,
    ) -> Result<Option<ReceiverEvent>, TransferError> {
        match self.state {
            SessionState::AwaitingStart => {}
            SessionState::Receiving => {
                let current = self.transfer.as_ref().map(|t| t.name.clone()).unwrap_or_default();
                self.abort_transfer().await;
                return Err(TransferError::Protocol(format!(
                    "file-start for {name} while receiving {current}"
                )));
            }
            SessionState::Idle | SessionState::Listing => {
                tracing::warn!(state = ?self.state, file = %name, "unexpected file-start, ignoring");
                return Ok(None);
            }
        }

        let partial = match self.downloads.create_partial(&name).await {
            Ok(p) => p,
            Err(FileOpsError::InvalidName(_)) => {
                self.state = SessionState::Idle;
                return Err(TransferError::Protocol(format!("invalid file name {name:?}")));
            }
            Err(e) => {
                self.state = SessionState::Idle;
                return Err(e.into());
            }
        };

        tracing::info!(file = %name, size, "download started");
        self.transfer = Some(TransferState {
            name: name.clone(),
            expected_size: size,
            received_bytes: 0,
            chunks: 0,
            partial,
        });
        self.state = SessionState::Receiving;
        Ok(Some(ReceiverEvent::Started { name, size }))
    }

    async fn on_chunk(&mut self, data: Vec<u8>) -> Result<Option<ReceiverEvent>, TransferError> {
        let Some(t) = self.transfer.as_mut() else {
            tracing::warn!(state = ?self.state, len = data.len(), "binary frame outside a transfer, ignoring");
            return Ok(None);
        };

        let len = data.len() as u64;
        if t.received_bytes + len > t.expected_size {
            let msg = format!(
                "{} overflowed: {} bytes past the announced {}",
                t.name,
                t.received_bytes + len - t.expected_size,
                t.expected_size
            );
            self.abort_transfer().await;
            return Err(TransferError::Protocol(msg));
        }

        if let Err(e) = t.partial.append(&data).await {
            tracing::error!(file = %t.name, "failed to write chunk: {e}");
            self.abort_transfer().await;
            return Err(e.into());
        }
        t.received_bytes += len;
        t.chunks += 1;

        let progress = t.progress();
        tracing::debug!(file = %t.name, "progress: {:.1}%", progress.percentage());
        Ok(Some(ReceiverEvent::Progress {
            name: t.name.clone(),
            progress,
        }))
    }

    async fn on_file_end(&mut self) -> Result<Option<ReceiverEvent>, TransferError> {
        let Some(t) = self.transfer.take() else {
            tracing::warn!(state = ?self.state, "file-end outside a transfer, ignoring");
            return Ok(None);
        };
        self.state = SessionState::Idle;

        if t.received_bytes != t.expected_size {
            let msg = format!(
                "{} ended after {} of {} bytes",
                t.name, t.received_bytes, t.expected_size
            );
            t.partial.discard().await;
            return Err(TransferError::Protocol(msg));
        }

        let path = t.partial.finish().await?;
        tracing::info!(file = %t.name, path = %path.display(), size = t.received_bytes, "download complete");
        Ok(Some(ReceiverEvent::Completed(DownloadedFile {
            name: t.name,
            path,
            size: t.received_bytes,
            chunks: t.chunks,
        })))
    }

    async fn send_request_list(
        &mut self,
        auto_request: Option<FileSelection>,
    ) -> Result<(), TransferError> {
        if self.state == SessionState::Receiving {
            return Err(TransferError::Protocol(
                "a transfer is already in progress".into(),
            ));
        }
        self.send_control(ControlFrame::RequestList).await?;
        self.auto_request = auto_request;
        self.state = SessionState::Listing;
        Ok(())
    }

    async fn abort_transfer(&mut self) {
        if let Some(t) = self.transfer.take() {
            tracing::warn!(file = %t.name, received = t.received_bytes, "discarding partial download");
            t.partial.discard().await;
        }
        self.state = SessionState::Idle;
        self.auto_request = None;
    }

    async fn send_control(&mut self, frame: ControlFrame) -> Result<(), TransferError> {
        let msg = Frame::Control(frame).encode()?;
        self.channel.send(msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelMessage, MemoryChannel};
    use crate::seeder::{SeederConfig, SeederSession};
    use seedshare_file_ops::SharedDir;

    /// Receiver under test plus the raw seeder end of its channel.
    struct Scripted {
        rx: ReceiverSession<MemoryChannel>,
        seeder: MemoryChannel,
        downloads: tempfile::TempDir,
    }

    fn scripted() -> Scripted {
        let downloads = tempfile::tempdir().unwrap();
        let (a, b) = MemoryChannel::pair(64);
        Scripted {
            rx: ReceiverSession::new(a, DownloadDir::new(downloads.path())),
            seeder: b,
            downloads,
        }
    }

    impl Scripted {
        async fn push(&mut self, frame: ControlFrame) {
            let msg = Frame::Control(frame).encode().unwrap();
            self.seeder.send(msg).await.unwrap();
        }

        async fn push_bytes(&mut self, data: &[u8]) {
            self.seeder
                .send(ChannelMessage::Binary(data.to_vec()))
                .await
                .unwrap();
        }

        async fn sent(&mut self) -> ControlFrame {
            match Frame::decode(self.seeder.recv().await.unwrap()).unwrap() {
                Frame::Control(c) => c,
                other => panic!("receiver sent {other:?}"),
            }
        }

        fn leftover_files(&self) -> Vec<String> {
            std::fs::read_dir(self.downloads.path())
                .unwrap()
                .map(|e| e.unwrap().file_name().into_string().unwrap())
                .collect()
        }
    }

    fn listing(names: &[(&str, u64)]) -> ControlFrame {
        ControlFrame::FileList {
            files: names
                .iter()
                .map(|(n, s)| FileDescriptor::new(*n, *s))
                .collect(),
        }
    }

    #[tokio::test]
    async fn open_requests_list_then_first_file() {
        let mut s = scripted();
        s.rx.open().await.unwrap();
        assert_eq!(s.rx.state(), SessionState::Listing);
        assert_eq!(s.sent().await, ControlFrame::RequestList);

        s.push(listing(&[("a.txt", 1), ("b.txt", 2)])).await;
        let ev = s.rx.next_event().await.unwrap().unwrap();
        assert!(matches!(ev, ReceiverEvent::Listing(ref f) if f.len() == 2));
        assert_eq!(s.rx.state(), SessionState::AwaitingStart);
        assert_eq!(
            s.sent().await,
            ControlFrame::RequestFile {
                file_name: "a.txt".into()
            }
        );
    }

    #[tokio::test]
    async fn named_selection_requests_that_name() {
        let mut s = scripted();
        s.rx = s.rx.with_selection(FileSelection::Named("b.txt".into()));
        s.rx.open().await.unwrap();
        s.sent().await;
        s.push(listing(&[("a.txt", 1), ("b.txt", 2)])).await;
        s.rx.next_event().await.unwrap();
        assert_eq!(
            s.sent().await,
            ControlFrame::RequestFile {
                file_name: "b.txt".into()
            }
        );
    }

    #[tokio::test]
    async fn request_list_only_returns_to_idle() {
        let mut s = scripted();
        s.rx.request_list().await.unwrap();
        s.sent().await;
        s.push(listing(&[("a.txt", 1)])).await;
        s.rx.next_event().await.unwrap();
        assert_eq!(s.rx.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn empty_listing_returns_to_idle() {
        let mut s = scripted();
        s.rx.open().await.unwrap();
        s.sent().await;
        s.push(listing(&[])).await;
        let ev = s.rx.next_event().await.unwrap().unwrap();
        assert_eq!(ev, ReceiverEvent::Listing(Vec::new()));
        assert_eq!(s.rx.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn binary_in_idle_and_listing_is_ignored() {
        let mut s = scripted();
        s.push_bytes(b"stray").await;
        s.push(listing(&[])).await;
        // The stray chunk is skipped; the listing is the first event.
        let ev = s.rx.next_event().await.unwrap().unwrap();
        assert!(matches!(ev, ReceiverEvent::Listing(_)));
        assert_eq!(s.rx.state(), SessionState::Idle);

        s.rx.request_list().await.unwrap();
        s.push_bytes(b"stray").await;
        s.push(listing(&[])).await;
        let ev = s.rx.next_event().await.unwrap().unwrap();
        assert!(matches!(ev, ReceiverEvent::Listing(_)));
        assert!(s.leftover_files().is_empty());
    }

    #[tokio::test]
    async fn binary_while_awaiting_start_is_ignored() {
        let mut s = scripted();
        s.rx.request_file("a.txt").await.unwrap();
        s.push_bytes(b"early").await;
        s.push(ControlFrame::FileStart {
            name: "a.txt".into(),
            size: 2,
        })
        .await;
        let ev = s.rx.next_event().await.unwrap().unwrap();
        assert_eq!(
            ev,
            ReceiverEvent::Started {
                name: "a.txt".into(),
                size: 2
            }
        );
        assert_eq!(s.rx.transfer().unwrap().received_bytes, 0);
    }

    #[tokio::test]
    async fn receives_chunks_and_completes() {
        let mut s = scripted();
        s.rx.request_file("a.txt").await.unwrap();
        s.push(ControlFrame::FileStart {
            name: "a.txt".into(),
            size: 5,
        })
        .await;
        s.push_bytes(b"hel").await;
        s.push_bytes(b"lo").await;
        s.push(ControlFrame::FileEnd).await;

        assert!(matches!(
            s.rx.next_event().await.unwrap(),
            Some(ReceiverEvent::Started { .. })
        ));
        let Some(ReceiverEvent::Progress { progress, .. }) = s.rx.next_event().await.unwrap()
        else {
            panic!("expected progress");
        };
        assert_eq!(progress, TransferProgress::new(3, 5));
        s.rx.next_event().await.unwrap();
        let Some(ReceiverEvent::Completed(file)) = s.rx.next_event().await.unwrap() else {
            panic!("expected completion");
        };

        assert_eq!(file.name, "a.txt");
        assert_eq!(file.size, 5);
        assert_eq!(file.chunks, 2);
        assert_eq!(std::fs::read(&file.path).unwrap(), b"hello");
        assert_eq!(s.rx.state(), SessionState::Idle);
        assert!(s.rx.transfer().is_none());
        assert_eq!(s.leftover_files(), ["a.txt"]);
    }

    #[tokio::test]
    async fn size_mismatch_discards() {
        let mut s = scripted();
        s.rx.request_file("a.txt").await.unwrap();
        s.push(ControlFrame::FileStart {
            name: "a.txt".into(),
            size: 10,
        })
        .await;
        s.push_bytes(b"short").await;
        s.push(ControlFrame::FileEnd).await;

        s.rx.next_event().await.unwrap();
        s.rx.next_event().await.unwrap();
        let err = s.rx.next_event().await.unwrap_err();
        assert!(matches!(err, TransferError::Protocol(_)));
        assert_eq!(s.rx.state(), SessionState::Idle);
        assert!(s.leftover_files().is_empty());
    }

    #[tokio::test]
    async fn overflow_discards() {
        let mut s = scripted();
        s.rx.request_file("a.txt").await.unwrap();
        s.push(ControlFrame::FileStart {
            name: "a.txt".into(),
            size: 2,
        })
        .await;
        s.push_bytes(b"too long").await;

        s.rx.next_event().await.unwrap();
        assert!(matches!(
            s.rx.next_event().await,
            Err(TransferError::Protocol(_))
        ));
        assert_eq!(s.rx.state(), SessionState::Idle);
        assert!(s.leftover_files().is_empty());
    }

    #[tokio::test]
    async fn second_file_start_discards_current() {
        let mut s = scripted();
        s.rx.request_file("a.txt").await.unwrap();
        s.push(ControlFrame::FileStart {
            name: "a.txt".into(),
            size: 4,
        })
        .await;
        s.push_bytes(b"ab").await;
        s.push(ControlFrame::FileStart {
            name: "b.txt".into(),
            size: 4,
        })
        .await;

        s.rx.next_event().await.unwrap();
        s.rx.next_event().await.unwrap();
        assert!(matches!(
            s.rx.next_event().await,
            Err(TransferError::Protocol(_))
        ));
        assert_eq!(s.rx.state(), SessionState::Idle);
        assert!(s.rx.transfer().is_none());
        assert!(s.leftover_files().is_empty());
    }

    #[tokio::test]
    async fn unsafe_name_is_rejected_before_storage() {
        let mut s = scripted();
        s.rx.request_file("x").await.unwrap();
        s.push(ControlFrame::FileStart {
            name: "../escape".into(),
            size: 1,
        })
        .await;
        assert!(matches!(
            s.rx.next_event().await,
            Err(TransferError::Protocol(_))
        ));
        assert_eq!(s.rx.state(), SessionState::Idle);
        assert!(s.leftover_files().is_empty());
    }

    #[tokio::test]
    async fn remote_error_discards_and_surfaces() {
        let mut s = scripted();
        s.rx.request_file("a.txt").await.unwrap();
        s.push(ControlFrame::FileStart {
            name: "a.txt".into(),
            size: 4,
        })
        .await;
        s.push_bytes(b"ab").await;
        s.push(ControlFrame::Error {
            message: "read failed".into(),
        })
        .await;

        s.rx.next_event().await.unwrap();
        s.rx.next_event().await.unwrap();
        assert_eq!(
            s.rx.next_event().await.unwrap(),
            Some(ReceiverEvent::RemoteError("read failed".into()))
        );
        assert_eq!(s.rx.state(), SessionState::Idle);
        assert!(s.leftover_files().is_empty());
    }

    #[tokio::test]
    async fn channel_close_mid_transfer_discards() {
        let mut s = scripted();
        s.rx.request_file("a.txt").await.unwrap();
        s.push(ControlFrame::FileStart {
            name: "a.txt".into(),
            size: 4,
        })
        .await;
        s.push_bytes(b"ab").await;
        s.rx.next_event().await.unwrap();
        s.rx.next_event().await.unwrap();
        assert!(!s.leftover_files().is_empty());

        s.seeder.close();
        assert_eq!(s.rx.next_event().await.unwrap(), None);
        assert_eq!(s.rx.state(), SessionState::Idle);
        assert!(s.leftover_files().is_empty());
    }

    #[tokio::test]
    async fn malformed_control_is_skipped() {
        let mut s = scripted();
        s.seeder
            .send(ChannelMessage::Text("{oops".into()))
            .await
            .unwrap();
        s.push(ControlFrame::FileList { files: Vec::new() }).await;
        assert!(matches!(
            s.rx.next_event().await.unwrap(),
            Some(ReceiverEvent::Listing(_))
        ));
    }

    // Seeder and receiver wired together.

    fn pair_sessions(
        files: &[(&str, Vec<u8>)],
    ) -> (
        ReceiverSession<MemoryChannel>,
        tempfile::TempDir,
        tempfile::TempDir,
        tokio::task::JoinHandle<()>,
    ) {
        let share = tempfile::tempdir().unwrap();
        for (name, data) in files {
            std::fs::write(share.path().join(name), data).unwrap();
        }
        let downloads = tempfile::tempdir().unwrap();
        let (seeder_end, receiver_end) = MemoryChannel::pair(4);
        let seeder = SeederSession::new(
            seeder_end,
            SharedDir::new(share.path()),
            SeederConfig::default(),
        );
        let handle = tokio::spawn(async move {
            seeder.run().await.unwrap();
        });
        let rx = ReceiverSession::new(receiver_end, DownloadDir::new(downloads.path()));
        (rx, share, downloads, handle)
    }

    #[tokio::test]
    async fn report_zip_in_three_chunks() {
        let data: Vec<u8> = (0..32770u32).map(|i| (i * 7 % 256) as u8).collect();
        let (mut rx, _share, downloads, handle) = pair_sessions(&[("report.zip", data.clone())]);

        let file = rx.download(FileSelection::First).await.unwrap();
        assert_eq!(file.name, "report.zip");
        assert_eq!(file.size, 32770);
        assert_eq!(file.chunks, 3);
        assert_eq!(file.path, downloads.path().join("report.zip"));
        assert_eq!(std::fs::read(&file.path).unwrap(), data);

        rx.close().await;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn round_trip_various_lengths() {
        for len in [0usize, 1, 16383, 16384, 16385, 3 * 16384, 100_000] {
            let data: Vec<u8> = (0..len).map(|i| (i % 253) as u8).collect();
            let (mut rx, _share, _downloads, handle) = pair_sessions(&[("blob", data.clone())]);

            let file = rx
                .download(FileSelection::Named("blob".into()))
                .await
                .unwrap();
            assert_eq!(file.size, len as u64, "len {len}");
            assert_eq!(file.chunks, len.div_ceil(16384) as u64, "len {len}");
            assert_eq!(std::fs::read(&file.path).unwrap(), data, "len {len}");

            rx.close().await;
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn listing_twice_is_equal() {
        let (mut rx, _share, _downloads, handle) = pair_sessions(&[
            ("z", b"1".to_vec()),
            ("a", b"22".to_vec()),
            ("m", b"333".to_vec()),
        ]);

        rx.request_list().await.unwrap();
        let Some(ReceiverEvent::Listing(first)) = rx.next_event().await.unwrap() else {
            panic!("expected listing");
        };
        rx.request_list().await.unwrap();
        let Some(ReceiverEvent::Listing(second)) = rx.next_event().await.unwrap() else {
            panic!("expected listing");
        };
        assert_eq!(first, second);
        let names: Vec<&str> = first.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "m", "z"]);

        rx.close().await;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn not_found_then_retry() {
        let (mut rx, _share, _downloads, handle) = pair_sessions(&[("real.txt", b"ok".to_vec())]);

        let err = rx
            .download(FileSelection::Named("ghost.txt".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Remote(ref m) if m == "File not found"));
        assert_eq!(rx.state(), SessionState::Idle);

        rx.request_file("real.txt").await.unwrap();
        loop {
            match rx.next_event().await.unwrap() {
                Some(ReceiverEvent::Completed(file)) => {
                    assert_eq!(std::fs::read(&file.path).unwrap(), b"ok");
                    break;
                }
                Some(_) => {}
                None => panic!("channel closed"),
            }
        }

        rx.close().await;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn empty_share_reports_no_files() {
        let (mut rx, _share, _downloads, handle) = pair_sessions(&[]);
        assert!(matches!(
            rx.download(FileSelection::First).await,
            Err(TransferError::NoFilesAvailable)
        ));
        rx.close().await;
        handle.await.unwrap();
    }
}
