//! The copy loop and its file-level entry point.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bytesink_protocol::{ProgressEvent, TransferStatus, TransferSummary};

use crate::progress::ProgressSink;
use crate::resolve::{WritePolicy, resolve};
use crate::{TransferError, TransferOptions};

/// One end-to-end copy of `source` into `destination`.
///
/// The session owns both streams; [`run`](Self::run) consumes it, so both are
/// dropped exactly once when the call returns, whatever the outcome.
pub struct TransferSession<S, D, P> {
    target: String,
    source: S,
    destination: D,
    progress: P,
    options: TransferOptions,
    expected_total: Option<u64>,
    bytes_transferred: u64,
    /// Bytes moved since the last emitted event.
    progress_accumulator: u64,
}

impl<S, D, P> TransferSession<S, D, P>
where
    S: AsyncRead + Unpin,
    D: AsyncWrite + Unpin,
    P: ProgressSink,
{
    pub fn new(target: impl Into<String>, source: S, destination: D, progress: P) -> Self {
        Self {
            target: target.into(),
            source,
            destination,
            progress,
            options: TransferOptions::default(),
            expected_total: None,
            bytes_transferred: 0,
            progress_accumulator: 0,
        }
    }

    /// Sets the byte count the source is expected to produce.
    pub fn expected_total(mut self, expected_total: Option<u64>) -> Self {
        self.expected_total = expected_total;
        self
    }

    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Copies until end of stream, cancellation or failure.
    ///
    /// The destination is shut down (flushed) on every path before the
    /// result is returned. A shutdown failure is reported only when the copy
    /// itself succeeded.
    pub async fn run(mut self, cancel: &CancellationToken) -> Result<u64, TransferError> {
        let copied = self.copy(cancel).await;
        let closed = self.destination.shutdown().await;

        let result = match (copied, closed) {
            (Ok(n), Ok(())) => Ok(n),
            (Ok(_), Err(e)) => Err(TransferError::Io(e)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                debug!(transfer = %self.target, "destination shutdown after failure: {close_err}");
                Err(e)
            }
        };

        match &result {
            Ok(bytes) => info!(transfer = %self.target, bytes, "transfer complete"),
            Err(e) => warn!(
                transfer = %self.target,
                bytes = self.bytes_transferred,
                status = %e.status(),
                "transfer stopped: {e}"
            ),
        }
        result
    }

    async fn copy(&mut self, cancel: &CancellationToken) -> Result<u64, TransferError> {
        self.options.validate()?;
        let mut buf = vec![0u8; self.options.buffer_size];

        loop {
            let n = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                read = self.source.read(&mut buf) => read?,
            };
            if n == 0 {
                break;
            }

            // Per-chunk checkpoint: a chunk read after cancellation is not written.
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            self.destination.write_all(&buf[..n]).await?;
            self.record(n as u64);
        }

        if self.expected_total.is_none() && self.progress_accumulator > 0 {
            self.emit_progress();
        }

        match self.expected_total {
            Some(expected) if expected != self.bytes_transferred => {
                Err(TransferError::SizeMismatch {
                    written: self.bytes_transferred,
                    expected,
                })
            }
            _ => Ok(self.bytes_transferred),
        }
    }

    fn record(&mut self, n: u64) {
        self.bytes_transferred += n;
        self.progress_accumulator += n;

        if self.progress_accumulator >= self.options.progress_interval
            || self.expected_total == Some(self.bytes_transferred)
        {
            self.emit_progress();
        }
    }

    fn emit_progress(&mut self) {
        let event = ProgressEvent {
            target: self.target.clone(),
            increment: self.progress_accumulator,
            transferred: self.bytes_transferred,
            total: self.expected_total,
        };
        self.progress_accumulator = 0;
        debug!(
            transfer = %event.target,
            transferred = event.transferred,
            total = ?event.total,
            "progress"
        );
        self.progress.emit(event);
    }
}

/// Copies `source` into `destination` and validates the byte count.
///
/// `target` identifies the transfer in progress events and logs. Returns the
/// number of bytes written.
pub async fn transfer<S, D, P>(
    target: &str,
    source: S,
    destination: D,
    expected_total: Option<u64>,
    cancel: &CancellationToken,
    progress: P,
    options: TransferOptions,
) -> Result<u64, TransferError>
where
    S: AsyncRead + Unpin,
    D: AsyncWrite + Unpin,
    P: ProgressSink,
{
    TransferSession::new(target, source, destination, progress)
        .expected_total(expected_total)
        .options(options)
        .run(cancel)
        .await
}

/// Writes `source` into the file at `path`, appending when `append` is set
/// and the file exists.
///
/// Missing parent directories are created. On failure the file is left as
/// written so far; callers should treat its content as undefined.
pub async fn write_to_file<S, P>(
    source: S,
    path: &Path,
    append: bool,
    expected_total: Option<u64>,
    cancel: &CancellationToken,
    progress: P,
    options: TransferOptions,
) -> Result<TransferSummary, TransferError>
where
    S: AsyncRead + Unpin,
    P: ProgressSink,
{
    let mut destination = resolve(path, append).await?;
    let target = destination.path().display().to_string();
    let start_offset = destination.start_offset();
    let appended = destination.policy() == WritePolicy::Append;

    let written = TransferSession::new(target.clone(), source, destination.file_mut(), progress)
        .expected_total(expected_total)
        .options(options)
        .run(cancel)
        .await?;

    destination.finish(written).await?;

    Ok(TransferSummary {
        target,
        status: TransferStatus::Completed,
        bytes_written: written,
        existing_len: start_offset,
        appended,
    })
}
