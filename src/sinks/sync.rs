//! # Synchronous call bridge.
//!
//! Adapts the callback-based call contract to a single round trip for
//! transports that are inherently request/response (unary RPC, blocking FFI).
//!
//! ## Architecture
//! ```text
//! SyncCall::new() ──► (sink, pending)
//!
//! Registry::call(name, args, sink)
//!        │
//!        └─► handler ── on_success(bytes) / on_error(msg) ──► oneshot ──► pending.recv().await
//!                                                                   └──► pending.wait()   (blocking)
//! ```
//!
//! ## Rules
//! - The **first** outcome wins; later `on_success`/`on_error` calls are ignored and logged.
//! - Dropping the sink without an outcome resolves the pending call with [`CallError::Abandoned`].
//! - No built-in timeout: wrap [`PendingCall::recv`] yourself or use
//!   [`PendingCall::recv_timeout`] / [`Registry::call_timeout`](crate::Registry::call_timeout).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::CallError;
use crate::sinks::ResultSink;

type Outcome = Result<Bytes, CallError>;

/// Result sink that forwards the first outcome into a [`PendingCall`].
#[derive(Debug)]
pub struct SyncCall {
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl SyncCall {
    /// Creates a connected sink / pending pair.
    #[must_use]
    pub fn new() -> (Arc<Self>, PendingCall) {
        let (tx, rx) = oneshot::channel();
        let sink = Arc::new(Self {
            tx: Mutex::new(Some(tx)),
        });
        (sink, PendingCall { rx })
    }

    /// True once an outcome has been delivered.
    pub fn is_completed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn deliver(&self, outcome: Outcome) {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match tx {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    tracing::debug!("sync call result dropped: caller went away");
                }
            }
            None => tracing::debug!("sync call already completed; extra result ignored"),
        }
    }
}

impl ResultSink for SyncCall {
    fn on_success(&self, payload: Bytes) {
        self.deliver(Ok(payload));
    }

    fn on_error(&self, message: String) {
        self.deliver(Err(CallError::Remote(message)));
    }
}

/// Receiving half of a [`SyncCall`].
#[derive(Debug)]
#[must_use = "a pending call does nothing unless awaited"]
pub struct PendingCall {
    rx: oneshot::Receiver<Outcome>,
}

impl PendingCall {
    /// Waits for the outcome.
    pub async fn recv(self) -> Result<Bytes, CallError> {
        self.rx.await.unwrap_or(Err(CallError::Abandoned))
    }

    /// Waits for the outcome for at most `timeout`.
    pub async fn recv_timeout(self, timeout: Duration) -> Result<Bytes, CallError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => Err(CallError::Timeout { timeout }),
        }
    }

    /// Blocks the current thread until the outcome arrives.
    ///
    /// # Panics
    /// Panics when called from within an asynchronous execution context
    /// (same rule as [`oneshot::Receiver::blocking_recv`]); use [`Self::recv`] there.
    pub fn wait(self) -> Result<Bytes, CallError> {
        self.rx.blocking_recv().unwrap_or(Err(CallError::Abandoned))
    }
}
