//! # Diagnostics emitted by the registry and the hub.
//!
//! The [`DiagnosticKind`] enum classifies diagnostics across three categories:
//! - **Call events**: dispatch and completion of one-shot calls
//! - **Subscription events**: lifecycle of deduplicated subscriptions
//! - **Listener events**: hub listener attach/detach, overflow and panics
//!
//! The [`Diagnostic`] struct carries metadata such as timestamps, the target
//! name, reasons and elapsed time.
//!
//! ## Ordering guarantees
//! Each diagnostic has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use callhub::{Diagnostic, DiagnosticKind};
//!
//! let d = Diagnostic::new(DiagnosticKind::CallFailed)
//!     .with_target("GetUser")
//!     .with_reason("not found")
//!     .with_elapsed(Duration::from_millis(12));
//!
//! assert_eq!(d.kind, DiagnosticKind::CallFailed);
//! assert_eq!(d.target.as_deref(), Some("GetUser"));
//! assert_eq!(d.elapsed_us, Some(12_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for diagnostic ordering.
static DIAGNOSTIC_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of registry diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    // === Call events ===
    /// A call was handed to its handler.
    ///
    /// Sets `target` (call name).
    CallDispatched,

    /// The handler completed the call through `on_success`.
    ///
    /// Sets `target`, `elapsed_us`.
    CallSucceeded,

    /// The handler completed the call through `on_error` or returned an error.
    ///
    /// Sets `target`, `reason`, `elapsed_us`.
    CallFailed,

    /// The handler panicked; the panic was converted into an error result.
    ///
    /// Sets `target`, `reason` (panic message).
    CallPanicked,

    /// A call or subscribe named a target nobody registered.
    ///
    /// Sets `target`.
    UnknownTarget,

    // === Subscription events ===
    /// First subscriber for a key; the handler produced a new subscription.
    ///
    /// Sets `target` (canonical key), `refcount`.
    SubscriptionCreated,

    /// Another subscriber joined an existing subscription.
    ///
    /// Sets `target`, `refcount`.
    SubscriptionShared,

    /// A subscriber left; others remain.
    ///
    /// Sets `target`, `refcount`.
    SubscriptionReleased,

    /// The last subscriber left; the underlying handle was cancelled.
    ///
    /// Sets `target`.
    SubscriptionTornDown,

    /// Subscribe failed (canonicalization, handler error or handler panic).
    ///
    /// Sets `target` (name or key), `reason`.
    SubscribeFailed,

    /// Cancel for a key with no active subscription; ignored.
    ///
    /// Sets `target`.
    RedundantCancel,

    // === Listener events ===
    /// A listener was attached to the hub.
    ///
    /// Sets `target` (listener name).
    ListenerAttached,

    /// A listener was detached from the hub.
    ///
    /// Sets `target`, `reason`.
    ListenerDetached,

    /// An event was dropped for one listener because its queue was full.
    ///
    /// Sets `target`, `reason`.
    ListenerOverflow,

    /// A listener panicked while handling an event.
    ///
    /// Sets `target`, `reason`.
    ListenerPanicked,
}

/// Registry diagnostic with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`DiagnosticKind`]
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Diagnostic classification.
    pub kind: DiagnosticKind,
    /// Call name, canonical key or listener name.
    pub target: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Time between dispatch and completion, in microseconds.
    pub elapsed_us: Option<u64>,
    /// Subscriber count after the change.
    pub refcount: Option<usize>,
}

impl Diagnostic {
    /// Creates a new diagnostic of the given kind with current timestamp and next sequence number.
    pub fn new(kind: DiagnosticKind) -> Self {
        Self {
            seq: DIAGNOSTIC_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            target: None,
            reason: None,
            elapsed_us: None,
            refcount: None,
        }
    }

    /// Attaches the target name.
    #[inline]
    pub fn with_target(mut self, target: impl Into<Arc<str>>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches elapsed time (stored as microseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let us = d.as_micros().min(u128::from(u64::MAX)) as u64;
        self.elapsed_us = Some(us);
        self
    }

    /// Attaches the subscriber count.
    #[inline]
    pub fn with_refcount(mut self, n: usize) -> Self {
        self.refcount = Some(n);
        self
    }

    /// Creates a listener overflow diagnostic.
    #[inline]
    pub fn listener_overflow(listener: &str, reason: &'static str) -> Self {
        Diagnostic::new(DiagnosticKind::ListenerOverflow)
            .with_target(listener)
            .with_reason(reason)
    }

    /// Creates a listener panic diagnostic.
    #[inline]
    pub fn listener_panicked(listener: &str, info: String) -> Self {
        Diagnostic::new(DiagnosticKind::ListenerPanicked)
            .with_target(listener)
            .with_reason(info)
    }

    /// True for diagnostics that end a call (`CallSucceeded`, `CallFailed`, `CallPanicked`).
    #[inline]
    pub fn is_call_terminal(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::CallSucceeded | DiagnosticKind::CallFailed | DiagnosticKind::CallPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Diagnostic::new(DiagnosticKind::CallDispatched);
        let b = Diagnostic::new(DiagnosticKind::CallDispatched);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn terminal_kinds() {
        assert!(Diagnostic::new(DiagnosticKind::CallPanicked).is_call_terminal());
        assert!(!Diagnostic::new(DiagnosticKind::CallDispatched).is_call_terminal());
        assert!(!Diagnostic::listener_overflow("ws", "full").is_call_terminal());
    }
}
