//! Transfer tuning knobs.
//!
//! Loaded from JSON, e.g. `{"bufferSize": 65536, "progressInterval": 1048576}`.
//! Missing fields take the library defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_BUFFER_SIZE, DEFAULT_PROGRESS_UPDATE_INTERVAL, TransferError};

/// Buffer and progress settings for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOptions {
    /// Bytes requested from the source per read.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Bytes that must accumulate before a progress event is emitted.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_UPDATE_INTERVAL
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            progress_interval: DEFAULT_PROGRESS_UPDATE_INTERVAL,
        }
    }
}

impl TransferOptions {
    /// Loads options from a JSON file.
    ///
    /// A missing file yields defaults. A file that does not parse is logged
    /// and also yields defaults. Parsed values are validated.
    pub fn load(path: &Path) -> Result<Self, TransferError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let options = match serde_json::from_str::<Self>(&content) {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    "failed to parse transfer options, using defaults: {e}"
                );
                Self::default()
            }
        };

        options.validate()?;
        Ok(options)
    }

    /// Rejects settings the copy loop cannot run with.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.buffer_size == 0 {
            return Err(TransferError::InvalidOptions(
                "buffer size must be greater than zero".into(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(TransferError::InvalidOptions(
                "progress interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_progress_interval(mut self, progress_interval: u64) -> Self {
        self.progress_interval = progress_interval;
        self
    }
}
