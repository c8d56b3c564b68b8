use serde::{Deserialize, Serialize};

/// Throttled notification of bytes moved by a transfer.
///
/// `transferred` counts bytes moved by this transfer only; bytes that were
/// already present in an appended destination are not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Identifier of the transfer, normally the destination path.
    pub target: String,
    /// Bytes moved since the previous event.
    pub increment: u64,
    /// Bytes moved since the transfer started.
    pub transferred: u64,
    /// Expected total, when the source reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl ProgressEvent {
    /// Returns progress as a percentage (0-100), or `None` if the total is unknown.
    ///
    /// An empty expected body counts as complete.
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|total| {
            if total == 0 {
                100.0
            } else {
                self.transferred as f64 / total as f64 * 100.0
            }
        })
    }

    /// Returns `true` once the cumulative count has reached a known total.
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|total| self.transferred >= total)
    }
}

/// Terminal (or current) state of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "failed")]
    Failed,
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of a completed stream-to-file transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub target: String,
    pub status: TransferStatus,
    pub bytes_written: u64,
    /// Length of the destination before the transfer (non-zero only when appending).
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub existing_len: u64,
    pub appended: bool,
}

impl TransferSummary {
    /// Size of the destination file after the transfer.
    pub fn final_len(&self) -> u64 {
        self.existing_len + self.bytes_written
    }
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}
