//! # Call table and call observation.
//!
//! [`CallTable`] maps call names to handlers. [`ObservedSink`] wraps the
//! caller's result sink so the registry learns when (and how) the handler
//! completed the call, even if that happens on another thread much later.
//!
//! ## Rules
//! - Registration overwrites silently (last writer wins).
//! - Handlers are never removed.
//! - The first completion publishes exactly one terminal diagnostic
//!   (`CallSucceeded` / `CallFailed` / `CallPanicked`); every completion is
//!   still forwarded to the caller's sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use bytes::Bytes;

use crate::events::{Bus, Diagnostic, DiagnosticKind};
use crate::handlers::CallRef;
use crate::sinks::{ResultSink, ResultSinkRef};

/// Name → call handler table.
#[derive(Default)]
pub(crate) struct CallTable {
    handlers: RwLock<HashMap<String, CallRef>>,
}

impl CallTable {
    /// Stores `handler` under `name`; returns `true` if it replaced another one.
    pub(crate) fn insert(&self, name: String, handler: CallRef) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, handler)
            .is_some()
    }

    pub(crate) fn get(&self, name: &str) -> Option<CallRef> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns sorted list of registered call names.
    pub(crate) fn names(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = handlers.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

/// Result sink that publishes call statistics before forwarding.
pub(crate) struct ObservedSink {
    inner: ResultSinkRef,
    name: Arc<str>,
    started: Instant,
    bus: Bus,
    finished: AtomicBool,
}

impl ObservedSink {
    pub(crate) fn new(name: &str, inner: ResultSinkRef, bus: Bus) -> Self {
        Self {
            inner,
            name: Arc::from(name),
            started: Instant::now(),
            bus,
            finished: AtomicBool::new(false),
        }
    }

    /// Completes the call with a contained panic.
    pub(crate) fn on_panic(&self, message: String) {
        if self.finish() {
            self.bus.publish(
                Diagnostic::new(DiagnosticKind::CallPanicked)
                    .with_target(Arc::clone(&self.name))
                    .with_reason(message.as_str())
                    .with_elapsed(self.started.elapsed()),
            );
        }
        self.inner.on_error(message);
    }

    /// Marks the call finished; `true` only for the first completion.
    fn finish(&self) -> bool {
        !self.finished.swap(true, Ordering::AcqRel)
    }
}

impl ResultSink for ObservedSink {
    fn on_success(&self, payload: Bytes) {
        if self.finish() {
            self.bus.publish(
                Diagnostic::new(DiagnosticKind::CallSucceeded)
                    .with_target(Arc::clone(&self.name))
                    .with_elapsed(self.started.elapsed()),
            );
        } else {
            tracing::debug!(call = %self.name, "call completed more than once");
        }
        self.inner.on_success(payload);
    }

    fn on_error(&self, message: String) {
        if self.finish() {
            self.bus.publish(
                Diagnostic::new(DiagnosticKind::CallFailed)
                    .with_target(Arc::clone(&self.name))
                    .with_reason(message.as_str())
                    .with_elapsed(self.started.elapsed()),
            );
        } else {
            tracing::debug!(call = %self.name, "call completed more than once");
        }
        self.inner.on_error(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{CallFn, CallHandler};
    use crate::sinks::SyncCall;

    #[test]
    fn last_registration_wins() {
        let table = CallTable::default();
        let first = CallFn::arc(|_, sink: ResultSinkRef| {
            sink.on_success(Bytes::from_static(b"1"));
            Ok(())
        });
        let second = CallFn::arc(|_, sink: ResultSinkRef| {
            sink.on_success(Bytes::from_static(b"2"));
            Ok(())
        });
        assert!(!table.insert("Get".into(), first));
        assert!(table.insert("Get".into(), second));
        assert_eq!(table.names(), ["Get"]);

        let (sink, pending) = SyncCall::new();
        table
            .get("Get")
            .unwrap()
            .call(Bytes::new(), sink)
            .unwrap();
        assert_eq!(pending.wait().unwrap(), Bytes::from_static(b"2"));
    }

    #[tokio::test]
    async fn observed_sink_publishes_one_terminal_diagnostic() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let (inner, pending) = SyncCall::new();
        let sink = ObservedSink::new("Get", inner, bus);

        sink.on_success(Bytes::from_static(b"ok"));
        sink.on_error("late".into());

        assert_eq!(pending.recv().await.unwrap(), Bytes::from_static(b"ok"));
        let d = rx.recv().await.unwrap();
        assert_eq!(d.kind, DiagnosticKind::CallSucceeded);
        assert!(d.elapsed_us.is_some());
        assert!(rx.try_recv().is_err());
    }
}
