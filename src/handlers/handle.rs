//! # Subscription handles.
//!
//! A [`SubscriptionHandle`] is the capability a subscription handler returns to
//! represent one live producer. The registry calls [`SubscriptionHandle::cancel`]
//! exactly once, when the last logical subscriber leaves.
//!
//! Ready-made handles:
//! - [`CancellationToken`]: cancelled on teardown; the producer loop watches it.
//! - [`JoinHandle`]: the producer task is aborted on teardown.
//! - [`FnHandle`]: runs an arbitrary closure on teardown.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use bytes::Bytes;
//! use tokio_util::sync::CancellationToken;
//! use callhub::{EventSinkRef, SubscriptionHandle};
//!
//! fn ticker(sink: EventSinkRef) -> Box<dyn SubscriptionHandle> {
//!     let token = CancellationToken::new();
//!     let stop = token.clone();
//!     tokio::spawn(async move {
//!         let mut n = 0u64;
//!         loop {
//!             tokio::select! {
//!                 _ = stop.cancelled() => break,
//!                 _ = tokio::time::sleep(Duration::from_secs(1)) => {
//!                     n += 1;
//!                     sink.on_event(Bytes::from(n.to_string()));
//!                 }
//!             }
//!         }
//!     });
//!     Box::new(token)
//! }
//! ```

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capability to stop one underlying subscription.
pub trait SubscriptionHandle: Send + 'static {
    /// Releases whatever the handler allocated (timer, stream, watcher).
    ///
    /// Should stop future emissions promptly; it must not block for long.
    fn cancel(self: Box<Self>);
}

/// Owned, type-erased subscription handle.
pub type BoxHandle = Box<dyn SubscriptionHandle>;

impl SubscriptionHandle for CancellationToken {
    fn cancel(self: Box<Self>) {
        CancellationToken::cancel(&self);
    }
}

impl<T: Send + 'static> SubscriptionHandle for JoinHandle<T> {
    fn cancel(self: Box<Self>) {
        self.abort();
    }
}

/// Handle that runs a closure on cancel.
pub struct FnHandle<F> {
    f: F,
}

impl<F> FnHandle<F>
where
    F: FnOnce() + Send + 'static,
{
    /// Wraps a teardown closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a teardown closure and boxes it.
    pub fn boxed(f: F) -> BoxHandle {
        Box::new(Self::new(f))
    }
}

impl<F> SubscriptionHandle for FnHandle<F>
where
    F: FnOnce() + Send + 'static,
{
    fn cancel(self: Box<Self>) {
        (self.f)();
    }
}
