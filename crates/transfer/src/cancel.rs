//! Timeouts expressed as cancellation.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A child cancellation token that fires when a timer elapses.
///
/// Dropping the deadline stops the timer; the token stays usable and is
/// still cancelled by its parent.
#[derive(Debug)]
pub struct Deadline {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns `true` if the token has been cancelled, by the timer or the parent.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Derives a token from `parent` that is also cancelled after `timeout`.
///
/// Must be called within a tokio runtime.
pub fn cancel_after(parent: &CancellationToken, timeout: Duration) -> Deadline {
    let token = parent.child_token();
    let timer_token = token.clone();
    let timer = tokio::spawn(async move {
        tokio::select! {
            _ = timer_token.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                debug!(?timeout, "transfer deadline elapsed");
                timer_token.cancel();
            }
        }
    });
    Deadline { token, timer }
}
