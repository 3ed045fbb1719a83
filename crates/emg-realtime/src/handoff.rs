//! Bounded window hand-off between the two contexts
//!
//! Built on `tokio::sync::broadcast`, whose ring buffer gives drop-oldest
//! semantics for free: when the queue is full the oldest unreceived window
//! is overwritten and the receiver observes `RecvError::Lagged(n)` with the
//! exact number of windows it missed. The sender side never blocks and
//! never awaits, which is what the blocking acquisition loop needs.

use crate::stats::PipelineStats;
use emg_core::Window;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Create a bounded hand-off queue; dropped windows are counted on `stats`
pub fn window_channel(
    capacity: usize,
    stats: Arc<PipelineStats>,
) -> (WindowSender, WindowReceiver) {
    let (tx, rx) = broadcast::channel(capacity.max(1));
    (WindowSender { tx }, WindowReceiver { rx, stats })
}

/// Producer half, owned by the acquisition context
pub struct WindowSender {
    tx: broadcast::Sender<Window>,
}

impl WindowSender {
    /// Enqueue a window without blocking, displacing the oldest one when
    /// the queue is full. A send with no live receiver is a no-op.
    pub fn send(&self, window: Window) {
        let _ = self.tx.send(window);
    }
}

/// Consumer half, owned by the processing context
pub struct WindowReceiver {
    rx: broadcast::Receiver<Window>,
    stats: Arc<PipelineStats>,
}

impl WindowReceiver {
    /// Receive the next window in FIFO order, or `None` once the sender is
    /// gone and the queue is drained. Overwritten windows are counted and
    /// logged, then skipped.
    pub async fn recv(&mut self) -> Option<Window> {
        loop {
            match self.rx.recv().await {
                Ok(window) => return Some(window),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.stats.record_windows_dropped(skipped);
                    warn!(skipped, "processing lagged, oldest windows dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
