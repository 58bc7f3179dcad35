//! # Result sink for one-shot calls.
//!
//! A [`ResultSink`] receives the outcome of a call. Handlers may complete it
//! synchronously before returning or later from another task/thread.
//!
//! ## Rules
//! - A conformant handler calls **at most one** of `on_success` / `on_error`.
//! - The registry does not enforce this; [`SyncCall`](crate::SyncCall) keeps the
//!   first outcome and ignores the rest.

use std::sync::Arc;

use bytes::Bytes;

/// Receiver of a single call outcome.
pub trait ResultSink: Send + Sync + 'static {
    /// The call succeeded with `payload`.
    fn on_success(&self, payload: Bytes);

    /// The call failed with a human-readable message.
    fn on_error(&self, message: String);
}

/// Shared handle to a result sink.
pub type ResultSinkRef = Arc<dyn ResultSink>;
