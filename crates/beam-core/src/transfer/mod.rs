//! File transfer sessions for Beam.
//!
//! This module drives both halves of a transfer:
//!
//! - [`SendSession`] hosts the listener, filters connecting peers by
//!   the whitelisted address, and streams the file
//! - [`ReceiveSession`] dials the hosting peer on a retry loop, then
//!   reconstructs the file under a collision-free name
//!
//! A session owns its connection for the whole exchange. There is one
//! transfer per invocation: the listener stops accepting once a peer
//! has been accepted, and the dialer exits after its single file.
//!
//! Faults inside the chunk loop are fatal for the session; only connect
//! errors during the dial retry loop are swallowed and retried.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::config::{ReceiverConfig, RetryPolicy, SenderConfig};
use crate::connection::peer_is_allowed;
use crate::error::{Error, Result};
use crate::file::{apply_mode, create_exclusive, get_mode, unique_destination};
use crate::protocol::{
    negotiate_chunk_size_dialer, negotiate_chunk_size_listener, read_signal, write_signal,
    ChunkLayout, FileManifest, Signal,
};

/// Transfer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Session created, connection not yet established
    Waiting,
    /// Connected and accepted, handshake in progress
    Connected,
    /// Moving file data
    Transferring,
    /// All chunks delivered
    Completed,
    /// Session ended with an error
    Failed,
}

/// Progress information for a transfer, published after every chunk.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    /// Current state
    pub state: TransferState,
    /// Name of the file in flight
    pub file_name: String,
    /// Chunks completed so far
    pub chunks_done: u64,
    /// Total chunks in the session
    pub chunk_count: u64,
    /// Bytes moved so far
    pub bytes_transferred: u64,
    /// Total bytes in the file
    pub total_bytes: u64,
    /// Transfer speed in bytes per second
    pub speed_bps: u64,
    /// Estimated time remaining
    pub eta: Option<Duration>,
    /// When the session started
    pub started_at: Instant,
}

impl TransferProgress {
    fn new() -> Self {
        Self {
            state: TransferState::Waiting,
            file_name: String::new(),
            chunks_done: 0,
            chunk_count: 0,
            bytes_transferred: 0,
            total_bytes: 0,
            speed_bps: 0,
            eta: None,
            started_at: Instant::now(),
        }
    }

    /// Overall progress as a percentage (0.0 - 100.0).
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            100.0
        } else {
            (self.bytes_transferred as f64 / self.total_bytes as f64) * 100.0
        }
    }

    fn on_chunk(&mut self, chunk_len: u64) {
        self.chunks_done += 1;
        self.bytes_transferred += chunk_len;

        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.speed_bps = (self.bytes_transferred as f64 / elapsed) as u64;
        }
        let remaining = self.total_bytes.saturating_sub(self.bytes_transferred);
        self.eta = if self.speed_bps > 0 {
            Some(Duration::from_secs(remaining / self.speed_bps))
        } else {
            None
        };
    }
}

/// Tracks progress and mirrors every update into a watch channel.
struct ProgressTracker {
    current: TransferProgress,
    tx: watch::Sender<TransferProgress>,
}

impl ProgressTracker {
    fn new() -> Self {
        let current = TransferProgress::new();
        let (tx, _rx) = watch::channel(current.clone());
        Self { current, tx }
    }

    fn subscribe(&self) -> watch::Receiver<TransferProgress> {
        self.tx.subscribe()
    }

    fn set_state(&mut self, state: TransferState) {
        self.current.state = state;
        self.publish();
    }

    fn begin_transfer(&mut self, file_name: &str, layout: ChunkLayout, chunk_size: u64) {
        self.current.file_name = file_name.to_string();
        self.current.chunk_count = layout.chunk_count;
        self.current.total_bytes = layout.total_bytes(chunk_size);
        self.current.started_at = Instant::now();
        self.current.state = TransferState::Transferring;
        self.publish();
    }

    fn on_chunk(&mut self, chunk_len: u64) {
        self.current.on_chunk(chunk_len);
        self.publish();
    }

    fn publish(&self) {
        let _ = self.tx.send(self.current.clone());
    }
}

/// A hosting session: listens, whitelists, and sends one file.
pub struct SendSession {
    config: SenderConfig,
    source: PathBuf,
    file_name: String,
    file_size: u64,
    mode: u32,
    listener: TcpListener,
    progress: ProgressTracker,
}

impl SendSession {
    /// Stat the source file and bind the listening socket.
    ///
    /// # Errors
    ///
    /// Fails if the source is missing or not a regular file, if its name
    /// is not representable, or if the port cannot be bound.
    pub async fn bind(config: SenderConfig, source: PathBuf) -> Result<Self> {
        let metadata = tokio::fs::metadata(&source).await?;
        if !metadata.is_file() {
            return Err(Error::InvalidFileName(format!(
                "'{}' is not a regular file",
                source.display()
            )));
        }

        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidFileName(format!("'{}' has no usable file name", source.display()))
            })?
            .to_string();

        let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
        tracing::info!(port = listener.local_addr()?.port(), "listener bound");

        Ok(Self {
            config,
            source,
            file_name,
            file_size: metadata.len(),
            mode: get_mode(&metadata),
            listener,
            progress: ProgressTracker::new(),
        })
    }

    /// Address the listener is bound on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Base name of the file this session offers.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Size of the file this session offers, in bytes.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Subscribe to progress updates for this session.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<TransferProgress> {
        self.progress.subscribe()
    }

    /// Wait for the whitelisted peer and stream the file to it.
    ///
    /// Connections from any other address get a rejection signal and are
    /// dropped; the listener then resumes accepting. Once the right peer
    /// is in, the listening socket accepts nobody else.
    pub async fn send(mut self) -> Result<()> {
        let result = self.run().await;
        if result.is_err() {
            self.progress.set_state(TransferState::Failed);
        }
        result
    }

    async fn run(&mut self) -> Result<()> {
        let mut stream = self.accept_whitelisted().await?;
        self.progress.set_state(TransferState::Connected);

        let chunk_size =
            negotiate_chunk_size_listener(&mut stream, self.config.chunk_size).await?;
        let layout = ChunkLayout::compute(self.file_size, chunk_size);

        let manifest = FileManifest {
            file_name: self.file_name.clone(),
            mode: self.mode,
            layout,
        };
        manifest.write_to(&mut stream).await?;
        tracing::debug!(
            file = %self.file_name,
            chunks = layout.chunk_count,
            chunk_size,
            "manifest sent"
        );

        self.progress
            .begin_transfer(&self.file_name, layout, chunk_size);
        self.stream_chunks(&mut stream, layout, chunk_size).await?;

        stream.flush().await?;
        self.progress.set_state(TransferState::Completed);
        tracing::info!(file = %self.file_name, "file sent");
        Ok(())
    }

    async fn accept_whitelisted(&mut self) -> Result<TcpStream> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;

            if !peer_is_allowed(peer, self.config.allowed_peer) {
                tracing::info!(%peer, "rejected connection from non-whitelisted address");
                let _ = write_signal(&mut stream, Signal::Rejected).await;
                drop(stream);
                continue;
            }

            write_signal(&mut stream, Signal::Accepted).await?;
            tracing::info!(%peer, "connection established");
            return Ok(stream);
        }
    }

    async fn stream_chunks(
        &mut self,
        stream: &mut TcpStream,
        layout: ChunkLayout,
        chunk_size: u64,
    ) -> Result<()> {
        #[allow(clippy::cast_possible_truncation)]
        let mut buffer = vec![0u8; chunk_size as usize];
        let mut file = tokio::fs::File::open(&self.source).await?;

        for index in 0..layout.chunk_count {
            #[allow(clippy::cast_possible_truncation)]
            let len = layout.chunk_len(index, chunk_size) as usize;
            file.read_exact(&mut buffer[..len]).await?;
            stream.write_all(&buffer[..len]).await?;
            self.progress.on_chunk(len as u64);
        }

        Ok(())
    }
}

/// A dialing session: connects, negotiates, and receives one file.
pub struct ReceiveSession {
    config: ReceiverConfig,
    stream: TcpStream,
    progress: ProgressTracker,
}

impl ReceiveSession {
    /// Dial the hosting peer until a connection lands, then read the
    /// accept/reject verdict.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionRejected` if the listener turned us away,
    /// `UnexpectedSignal` on a confused peer, or `RetriesExhausted` if a
    /// bounded retry policy ran out before any connection succeeded.
    pub async fn connect(config: ReceiverConfig) -> Result<Self> {
        let mut stream = dial_with_retry(config.peer, config.retry).await?;

        match read_signal(&mut stream).await? {
            Signal::Accepted => {}
            Signal::Rejected => return Err(Error::ConnectionRejected),
        }
        tracing::info!(peer = %config.peer, "connection accepted");

        let mut progress = ProgressTracker::new();
        progress.set_state(TransferState::Connected);

        Ok(Self {
            config,
            stream,
            progress,
        })
    }

    /// Subscribe to progress updates for this session.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<TransferProgress> {
        self.progress.subscribe()
    }

    /// Negotiate the chunk size, read the manifest, and reconstruct the
    /// file in the configured output directory.
    ///
    /// Returns the path the file was written to, which carries a numeric
    /// disambiguator if the advertised name was already taken.
    pub async fn receive(mut self) -> Result<PathBuf> {
        let result = self.run().await;
        match result {
            Ok(path) => Ok(path),
            Err(e) => {
                self.progress.set_state(TransferState::Failed);
                Err(e)
            }
        }
    }

    async fn run(&mut self) -> Result<PathBuf> {
        let chunk_size =
            negotiate_chunk_size_dialer(&mut self.stream, self.config.chunk_size).await?;

        let manifest = FileManifest::read_from(&mut self.stream).await?;
        manifest.layout.validate(chunk_size)?;
        tracing::debug!(
            file = %manifest.file_name,
            chunks = manifest.layout.chunk_count,
            chunk_size,
            "manifest received"
        );

        let destination = unique_destination(&self.config.output_dir, &manifest.file_name);
        let mut file = create_exclusive(&destination).await?;

        self.progress
            .begin_transfer(&manifest.file_name, manifest.layout, chunk_size);
        self.collect_chunks(&mut file, manifest.layout, chunk_size)
            .await?;

        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        apply_mode(&destination, manifest.mode)?;

        self.progress.set_state(TransferState::Completed);
        tracing::info!(file = %destination.display(), "file received");
        Ok(destination)
    }

    async fn collect_chunks(
        &mut self,
        file: &mut tokio::fs::File,
        layout: ChunkLayout,
        chunk_size: u64,
    ) -> Result<()> {
        #[allow(clippy::cast_possible_truncation)]
        let mut buffer = vec![0u8; chunk_size as usize];

        for index in 0..layout.chunk_count {
            #[allow(clippy::cast_possible_truncation)]
            let len = layout.chunk_len(index, chunk_size) as usize;
            self.stream.read_exact(&mut buffer[..len]).await?;
            file.write_all(&buffer[..len]).await?;
            self.progress.on_chunk(len as u64);
        }

        Ok(())
    }
}

/// Dial `peer` until a connection succeeds.
///
/// Connect errors are the expected "listener not up yet" case: they are
/// logged at debug level, swallowed, and retried after the policy's
/// interval. A bounded policy converts exhaustion into an error instead
/// of blocking forever.
async fn dial_with_retry(peer: SocketAddr, policy: RetryPolicy) -> Result<TcpStream> {
    let mut attempts: u32 = 0;

    loop {
        match TcpStream::connect(peer).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                attempts += 1;
                tracing::debug!(%peer, attempts, error = %e, "connect attempt failed");

                if let Some(max) = policy.max_attempts {
                    if attempts >= max {
                        return Err(Error::RetriesExhausted(attempts));
                    }
                }
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        let mut progress = TransferProgress::new();
        progress.total_bytes = 2048;
        progress.bytes_transferred = 512;
        assert!((progress.percentage() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_percentage_empty_file_is_complete() {
        let progress = TransferProgress::new();
        assert!((progress.percentage() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_on_chunk_accumulates() {
        let mut progress = TransferProgress::new();
        progress.total_bytes = 3000;
        progress.on_chunk(1024);
        progress.on_chunk(1024);
        assert_eq!(progress.chunks_done, 2);
        assert_eq!(progress.bytes_transferred, 2048);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_dial_gives_up() {
        // A port with nothing listening; paused time makes the waits free.
        let peer: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let policy = RetryPolicy::bounded(3, Duration::from_millis(500));

        let result = dial_with_retry(peer, policy).await;
        match result {
            Err(Error::RetriesExhausted(attempts)) => assert_eq!(attempts, 3),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dial_retries_until_listener_appears() {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let policy = RetryPolicy::bounded(200, Duration::from_millis(10));
        let dial = tokio::spawn(async move { dial_with_retry(addr, policy).await });

        // Let a few attempts fail before the listener shows up
        tokio::time::sleep(Duration::from_millis(50)).await;
        let listener = TcpListener::bind(addr).await.unwrap();

        let (stream, accepted) = tokio::join!(dial, listener.accept());
        assert!(stream.unwrap().is_ok());
        assert!(accepted.is_ok());
    }
}
