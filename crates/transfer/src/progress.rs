use tokio::sync::mpsc;
use tracing::trace;

use bytesink_protocol::ProgressEvent;

/// Receives progress events from a running transfer.
///
/// Called inline from the copy loop; a slow sink stalls the transfer.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressEvent),
{
    fn emit(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&mut self, _event: ProgressEvent) {}
}

/// Forwards events into a bounded channel without waiting.
///
/// Events that do not fit (full or closed channel) are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub mpsc::Sender<ProgressEvent>);

impl ProgressSink for ChannelSink {
    fn emit(&mut self, event: ProgressEvent) {
        if let Err(e) = self.0.try_send(event) {
            trace!("progress event dropped: {e}");
        }
    }
}

impl From<mpsc::Sender<ProgressEvent>> for ChannelSink {
    fn from(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self(tx)
    }
}

/// Callback invoked with each progress event.
pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Ordered list of callbacks that all receive every event.
#[derive(Default)]
pub struct ProgressCallbacks {
    callbacks: Vec<ProgressCallback>,
}

impl ProgressCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a progress callback.
    pub fn push(&mut self, callback: ProgressCallback) {
        self.callbacks.push(callback);
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for ProgressCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressCallbacks")
            .field("len", &self.callbacks.len())
            .finish()
    }
}

impl ProgressSink for ProgressCallbacks {
    fn emit(&mut self, event: ProgressEvent) {
        for cb in &self.callbacks {
            cb(&event);
        }
    }
}
