//! Value types crossing the boundary between a transfer and its observers.

pub mod types;

pub use types::{ProgressEvent, TransferStatus, TransferSummary};
