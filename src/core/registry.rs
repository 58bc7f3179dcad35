//! # Registry - name-addressed calls and deduplicated subscriptions.
//!
//! The registry is the single instance a process builds at startup (see
//! [`RegistryBuilder`](crate::RegistryBuilder)) and hands to every transport
//! adapter. Generated glue registers handlers; transports dispatch by name.
//!
//! ## Architecture
//! ```text
//! transport ─► Registry::call(name, args, sink)
//!                 ├─► CallTable[name] ─► guard(handler.call(args, ObservedSink(sink)))
//!                 │                        ├─ Ok       → handler completes sink (now or later)
//!                 │                        ├─ Err(e)   → sink.on_error(e)
//!                 │                        └─ panic    → sink.on_error(message + backtrace)
//!                 └─► unknown name ─► sink.on_error("no such method: <name>")
//!
//! transport ─► Registry::subscribe(name, args) ─► key = handler.canonical_key(args)
//!                 └─► ActiveTable::acquire(key)
//!                        ├─ active  → refcount += 1
//!                        └─ absent  → handler.subscribe(args, KeyedSink{key}) → {handle, 1}
//!
//! transport ─► Registry::cancel_subscription(key) ─► ActiveTable::release(key)
//!                        ├─ refcount > 0 → keep producer
//!                        ├─ refcount = 0 → handle.cancel()
//!                        └─ unknown      → RedundantCancel (logged, ignored)
//! ```
//!
//! ## Rules
//! - Registration overwrites silently (last writer wins); nothing is ever unregistered.
//! - Caller errors (unknown name, bad arguments, failed subscribe) are always
//!   returned/delivered to the caller.
//! - Redundant cancels are logged and swallowed.
//! - Panics never unwind past the registry.
//! - `handle.cancel()` runs outside every registry lock.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;

use super::calls::{CallTable, ObservedSink};
use super::config::Config;
use super::panic::{PanicReport, guard};
use super::subscriptions::{Acquired, ActiveTable, Released, SubscriptionTable};
use crate::broadcast::BroadcastRef;
use crate::error::{CallError, HandlerError, RegistryError};
use crate::events::{Bus, Diagnostic, DiagnosticKind};
use crate::handlers::{BoxHandle, CallFn, CallRef, SubscriptionFn, SubscriptionRef};
use crate::sinks::{EventSinkRef, KeyedSink, PendingCall, ResultSink, ResultSinkRef, SyncCall};

/// Call and subscription dispatcher.
pub struct Registry {
    cfg: Config,
    bus: Bus,
    broadcaster: BroadcastRef,
    calls: CallTable,
    subscriptions: SubscriptionTable,
    active: ActiveTable,
}

impl Registry {
    /// Creates a registry. Prefer [`RegistryBuilder`](crate::RegistryBuilder).
    pub fn new(cfg: Config, bus: Bus, broadcaster: BroadcastRef) -> Self {
        Self {
            cfg,
            bus,
            broadcaster,
            calls: CallTable::default(),
            subscriptions: SubscriptionTable::default(),
            active: ActiveTable::default(),
        }
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Registers a closure as the call handler for `name`.
    pub fn register_function<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Bytes, ResultSinkRef) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register_call_handler(name, CallFn::arc(f));
    }

    /// Registers a call handler for `name`, replacing any previous one.
    pub fn register_call_handler(&self, name: impl Into<String>, handler: CallRef) {
        let name = name.into();
        if self.calls.insert(name.clone(), handler) {
            tracing::debug!(call = %name, "call handler replaced");
        }
    }

    /// Registers a subscribe closure paired with its canonical-key closure.
    pub fn register_subscription<S, K>(&self, name: impl Into<String>, subscribe: S, key: K)
    where
        S: Fn(Bytes, EventSinkRef) -> Result<BoxHandle, HandlerError> + Send + Sync + 'static,
        K: Fn(&[u8]) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.register_subscription_handler(name, SubscriptionFn::arc(subscribe, key));
    }

    /// Registers a subscription handler for `name`, replacing any previous one.
    pub fn register_subscription_handler(&self, name: impl Into<String>, handler: SubscriptionRef) {
        let name = name.into();
        if self.subscriptions.insert(name.clone(), handler) {
            tracing::debug!(subscription = %name, "subscription handler replaced");
        }
    }

    // ---------------------------
    // Calls
    // ---------------------------

    /// Dispatches a call.
    ///
    /// Never panics and never returns an error: every outcome goes to `sink`.
    /// An unknown `name` yields exactly one `on_error` and invokes nothing.
    pub fn call(&self, name: &str, args: Bytes, sink: ResultSinkRef) {
        let Some(handler) = self.calls.get(name) else {
            let err = RegistryError::UnknownCallTarget {
                name: name.to_owned(),
            };
            tracing::debug!(call = name, "{}", err.as_label());
            self.bus
                .publish(Diagnostic::new(DiagnosticKind::UnknownTarget).with_target(name));
            sink.on_error(err.to_string());
            return;
        };

        self.bus
            .publish(Diagnostic::new(DiagnosticKind::CallDispatched).with_target(name));
        let observed = Arc::new(ObservedSink::new(name, sink, self.bus.clone()));
        let handler_sink: ResultSinkRef = observed.clone();

        match guard(self.cfg.capture_backtrace, || handler.call(args, handler_sink)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(call = name, error = %e, "{}", e.as_label());
                observed.on_error(e.to_string());
            }
            Err(report) => {
                let err = panic_error(name, report);
                tracing::warn!(call = name, error = %err.as_message(), "call handler panicked");
                observed.on_panic(err.to_string());
            }
        }
    }

    /// Dispatches a call and returns its pending outcome.
    pub fn call_sync(&self, name: &str, args: Bytes) -> PendingCall {
        let (sink, pending) = SyncCall::new();
        self.call(name, args, sink);
        pending
    }

    /// Dispatches a call and awaits its outcome for at most `timeout`.
    pub async fn call_timeout(
        &self,
        name: &str,
        args: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, CallError> {
        self.call_sync(name, args).recv_timeout(timeout).await
    }

    // ---------------------------
    // Subscriptions
    // ---------------------------

    /// Subscribes to `name` with `args`; returns the canonical key.
    ///
    /// Identical `(name, args)` pairs (same canonical key) share one producer:
    /// the handler runs only for the first subscriber.
    pub fn subscribe(&self, name: &str, args: Bytes) -> Result<String, RegistryError> {
        let Some(handler) = self.subscriptions.get(name) else {
            self.bus
                .publish(Diagnostic::new(DiagnosticKind::UnknownTarget).with_target(name));
            return Err(RegistryError::UnknownSubscriptionTarget {
                name: name.to_owned(),
            });
        };

        let capture = self.cfg.capture_backtrace;
        let key = match guard(capture, || handler.canonical_key(&args)) {
            Ok(Ok(key)) => key,
            Ok(Err(e)) => {
                return Err(self.subscribe_failed(
                    name,
                    RegistryError::Canonicalization {
                        name: name.to_owned(),
                        error: e.to_string(),
                    },
                ));
            }
            Err(report) => return Err(self.subscribe_failed(name, panic_error(name, report))),
        };

        let broadcaster = Arc::clone(&self.broadcaster);
        let acquired = self.active.acquire(&key, || {
            let sink: EventSinkRef = Arc::new(KeyedSink::new(key.as_str(), broadcaster));
            match guard(capture, || handler.subscribe(args, sink)) {
                Ok(Ok(handle)) => Ok(handle),
                Ok(Err(e)) => Err(RegistryError::SubscribeFailed {
                    key: key.clone(),
                    error: e.to_string(),
                }),
                Err(report) => Err(panic_error(name, report)),
            }
        });

        match acquired {
            Ok(Acquired::Created) => {
                tracing::debug!(%key, "subscription created");
                self.bus.publish(
                    Diagnostic::new(DiagnosticKind::SubscriptionCreated)
                        .with_target(key.as_str())
                        .with_refcount(1),
                );
                Ok(key)
            }
            Ok(Acquired::Shared(refcount)) => {
                tracing::debug!(%key, refcount, "subscription shared");
                self.bus.publish(
                    Diagnostic::new(DiagnosticKind::SubscriptionShared)
                        .with_target(key.as_str())
                        .with_refcount(refcount),
                );
                Ok(key)
            }
            Err(err) => Err(self.subscribe_failed(&key, err)),
        }
    }

    /// Drops one subscriber of `key`; the producer stops with the last one.
    ///
    /// Unknown or already torn-down keys are ignored (logged, never an error).
    pub fn cancel_subscription(&self, key: &str) {
        match self.active.release(key) {
            Released::Missing => {
                tracing::debug!(key, "cancel for inactive subscription ignored");
                self.bus
                    .publish(Diagnostic::new(DiagnosticKind::RedundantCancel).with_target(key));
            }
            Released::Remaining(refcount) => {
                tracing::debug!(key, refcount, "subscriber released");
                self.bus.publish(
                    Diagnostic::new(DiagnosticKind::SubscriptionReleased)
                        .with_target(key)
                        .with_refcount(refcount),
                );
            }
            Released::Last(handle) => self.tear_down(key, handle),
        }
    }

    /// Cancels every active subscription regardless of refcount.
    ///
    /// Meant for process teardown; later cancels for these keys are redundant.
    pub fn shutdown(&self) {
        for (key, handle) in self.active.drain() {
            self.tear_down(&key, handle);
        }
    }

    // ---------------------------
    // Introspection
    // ---------------------------

    /// Sorted list of registered call names.
    pub fn call_names(&self) -> Vec<String> {
        self.calls.names()
    }

    /// Sorted list of registered subscription names.
    pub fn subscription_names(&self) -> Vec<String> {
        self.subscriptions.names()
    }

    /// Sorted canonical keys of active subscriptions.
    pub fn active_keys(&self) -> Vec<String> {
        self.active.keys()
    }

    /// Number of active subscriptions (distinct canonical keys).
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of subscribers sharing `key`, if it is active.
    pub fn refcount(&self, key: &str) -> Option<usize> {
        self.active.refcount(key)
    }

    /// New receiver for registry diagnostics.
    pub fn diagnostics(&self) -> broadcast::Receiver<Diagnostic> {
        self.bus.subscribe()
    }

    /// Broadcaster events are delivered to.
    pub fn broadcaster(&self) -> &BroadcastRef {
        &self.broadcaster
    }

    /// Registry configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn tear_down(&self, key: &str, handle: BoxHandle) {
        if let Err(report) = guard(self.cfg.capture_backtrace, || handle.cancel()) {
            tracing::warn!(key, panic = %report.message, "subscription cancel panicked");
        }
        tracing::debug!(key, "subscription torn down");
        self.bus
            .publish(Diagnostic::new(DiagnosticKind::SubscriptionTornDown).with_target(key));
    }

    fn subscribe_failed(&self, target: &str, err: RegistryError) -> RegistryError {
        tracing::debug!(name = target, error = %err.as_message(), "subscribe failed");
        self.bus.publish(
            Diagnostic::new(DiagnosticKind::SubscribeFailed)
                .with_target(target)
                .with_reason(err.as_message()),
        );
        err
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("calls", &self.calls.names())
            .field("subscriptions", &self.subscriptions.names())
            .field("active", &self.active.keys())
            .finish()
    }
}

fn panic_error(name: &str, report: PanicReport) -> RegistryError {
    RegistryError::HandlerPanic {
        name: name.to_owned(),
        message: format!("{} at {}", report.message, report.location),
        backtrace: report.backtrace,
    }
}
