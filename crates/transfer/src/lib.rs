//! Streams a response body into a local file.
//!
//! A transfer resolves its destination (append to an existing file, overwrite
//! it in place, or create it along with missing parent directories), copies the
//! body in fixed-size chunks, reports throttled progress, honors a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) between chunks,
//! and fails with [`TransferError::SizeMismatch`] when the byte count differs
//! from the advertised content length.
//!
//! Concurrent transfers into the same path are not coordinated; callers that
//! need exclusive access must arrange it themselves.

mod cancel;
mod engine;
mod options;
mod progress;
mod resolve;
mod response;
mod validation;

use std::io;
use std::path::PathBuf;

pub use bytesink_protocol::{ProgressEvent, TransferStatus, TransferSummary};
pub use cancel::{Deadline, cancel_after};
pub use engine::{TransferSession, transfer, write_to_file};
pub use options::TransferOptions;
pub use progress::{ChannelSink, NoProgress, ProgressCallback, ProgressCallbacks, ProgressSink};
pub use resolve::{DestinationTarget, OpenPlan, WritePolicy, plan_open, resolve};
pub use response::StreamedResponse;
pub use validation::validate_destination_path;

/// Default read buffer size shared by every transfer path: 8 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Default number of bytes between progress events: 100 KiB.
pub const DEFAULT_PROGRESS_UPDATE_INTERVAL: u64 = 100 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("cannot prepare destination {}: {source}", path.display())]
    PathResolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("size mismatch: wrote {written} bytes, expected {expected}")]
    SizeMismatch { written: u64, expected: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid transfer options: {0}")]
    InvalidOptions(String),
}

impl TransferError {
    pub(crate) fn path(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PathResolution {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the transfer stopped because cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Terminal status a transfer ending with this error reports.
    pub fn status(&self) -> TransferStatus {
        if self.is_cancelled() {
            TransferStatus::Cancelled
        } else {
            TransferStatus::Failed
        }
    }
}
