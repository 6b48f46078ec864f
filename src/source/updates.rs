//! "Store updated" notification channel.
//!
//! The notification source (a file watcher, a writer thread) may run on another
//! thread. It only sends an edge-triggered, payload-free event; the view drains
//! the channel on its own synchronous tick.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Create a connected notifier/listener pair.
pub fn channel() -> (UpdateNotifier, UpdateListener) {
    let (tx, rx) = mpsc::channel();
    (UpdateNotifier { tx }, UpdateListener { rx })
}

/// Sending half, held by the store or its watcher.
#[derive(Debug, Clone)]
pub struct UpdateNotifier {
    tx: Sender<()>,
}

impl UpdateNotifier {
    /// Signal that new data is available.
    ///
    /// Returns false when the listener is gone.
    pub fn notify(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

/// Receiving half, held by the view.
#[derive(Debug)]
pub struct UpdateListener {
    rx: Receiver<()>,
}

impl UpdateListener {
    /// Drain all pending notifications without blocking.
    ///
    /// Returns true if at least one arrived. Several notifications collapse
    /// into one because the event carries no payload.
    pub fn drain(&self) -> bool {
        let mut updated = false;
        loop {
            match self.rx.try_recv() {
                Ok(()) => updated = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        updated
    }
}
