//! # Diagnostics-to-tracing bridge.
//!
//! [`LogWriter`] drains a diagnostics receiver and renders each
//! [`Diagnostic`] as a `tracing` record under the `callhub::diagnostics` target.
//! Installing a `tracing` subscriber is left to the application.
//!
//! ## Output levels
//! ```text
//! debug  CallDispatched CallSucceeded SubscriptionCreated SubscriptionShared
//!        SubscriptionReleased SubscriptionTornDown ListenerAttached ListenerDetached
//! info   CallFailed UnknownTarget SubscribeFailed RedundantCancel
//! warn   CallPanicked ListenerOverflow ListenerPanicked (and receiver lag)
//! ```
//!
//! ## Example
//! ```no_run
//! # use callhub::{Config, LogWriter, Registry};
//! # async fn demo() {
//! let registry = Registry::builder(Config::default()).build();
//! let writer = LogWriter::spawn(registry.diagnostics());
//! // ... dispatch calls ...
//! writer.abort();
//! # }
//! ```

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::events::{Diagnostic, DiagnosticKind};

/// Renders diagnostics as `tracing` records.
///
/// Enabled via the `logging` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Spawns a task that logs everything `rx` yields until the bus closes.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn spawn(rx: broadcast::Receiver<Diagnostic>) -> JoinHandle<()> {
        tokio::spawn(Self.run(rx))
    }

    /// Logs everything `rx` yields until the bus closes.
    pub async fn run(self, mut rx: broadcast::Receiver<Diagnostic>) {
        loop {
            match rx.recv().await {
                Ok(d) => self.write(&d),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "callhub::diagnostics", skipped, "diagnostics lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Logs one diagnostic.
    pub fn write(&self, d: &Diagnostic) {
        let target = d.target.as_deref().unwrap_or("-");
        let reason = d.reason.as_deref().unwrap_or("");
        let seq = d.seq;
        match d.kind {
            DiagnosticKind::CallDispatched => {
                tracing::debug!(target: "callhub::diagnostics", seq, call = target, "call dispatched");
            }
            DiagnosticKind::CallSucceeded => {
                tracing::debug!(
                    target: "callhub::diagnostics",
                    seq,
                    call = target,
                    elapsed_us = d.elapsed_us,
                    "call succeeded"
                );
            }
            DiagnosticKind::CallFailed => {
                tracing::info!(
                    target: "callhub::diagnostics",
                    seq,
                    call = target,
                    elapsed_us = d.elapsed_us,
                    reason,
                    "call failed"
                );
            }
            DiagnosticKind::CallPanicked => {
                tracing::warn!(
                    target: "callhub::diagnostics",
                    seq,
                    call = target,
                    reason,
                    "call handler panicked"
                );
            }
            DiagnosticKind::UnknownTarget => {
                tracing::info!(target: "callhub::diagnostics", seq, name = target, "unknown target");
            }
            DiagnosticKind::SubscriptionCreated
            | DiagnosticKind::SubscriptionShared
            | DiagnosticKind::SubscriptionReleased => {
                tracing::debug!(
                    target: "callhub::diagnostics",
                    seq,
                    key = target,
                    refcount = d.refcount,
                    kind = ?d.kind,
                    "subscription refcount changed"
                );
            }
            DiagnosticKind::SubscriptionTornDown => {
                tracing::debug!(target: "callhub::diagnostics", seq, key = target, "subscription torn down");
            }
            DiagnosticKind::SubscribeFailed => {
                tracing::info!(
                    target: "callhub::diagnostics",
                    seq,
                    name = target,
                    reason,
                    "subscribe failed"
                );
            }
            DiagnosticKind::RedundantCancel => {
                tracing::info!(target: "callhub::diagnostics", seq, key = target, "redundant cancel");
            }
            DiagnosticKind::ListenerAttached => {
                tracing::debug!(target: "callhub::diagnostics", seq, listener = target, "listener attached");
            }
            DiagnosticKind::ListenerDetached => {
                tracing::debug!(
                    target: "callhub::diagnostics",
                    seq,
                    listener = target,
                    reason,
                    "listener detached"
                );
            }
            DiagnosticKind::ListenerOverflow => {
                tracing::warn!(
                    target: "callhub::diagnostics",
                    seq,
                    listener = target,
                    reason,
                    "listener queue overflow"
                );
            }
            DiagnosticKind::ListenerPanicked => {
                tracing::warn!(
                    target: "callhub::diagnostics",
                    seq,
                    listener = target,
                    reason,
                    "listener panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;

    #[tokio::test]
    async fn run_exits_when_bus_closes() {
        let bus = Bus::new(8);
        let rx = bus.subscribe();
        let writer = LogWriter::spawn(rx);
        bus.publish(Diagnostic::new(DiagnosticKind::CallDispatched).with_target("Get"));
        bus.publish(Diagnostic::listener_overflow("ui", "queue full"));
        drop(bus);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn disabled_bus_ends_immediately() {
        LogWriter.run(Bus::disabled().subscribe()).await;
    }
}
