//! # Diagnostics bus.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking publishing of [`Diagnostic`]s from the registry and the hub.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Receivers (any):
//!   Registry::call      ──┐
//!   Registry::subscribe ──┼──► Bus ──► LogWriter / debug clients / tests
//!   Hub workers         ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: diagnostics are lost if nobody is subscribed.
//! - **Disabled bus**: a bus built with [`Bus::disabled`] drops everything and
//!   hands out receivers that are immediately closed.

use tokio::sync::broadcast;

use super::event::Diagnostic;

/// Broadcast channel for registry diagnostics.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: Option<broadcast::Sender<Diagnostic>>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Diagnostic>(capacity);
        Self { tx: Some(tx) }
    }

    /// Creates a bus that drops every diagnostic.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// True if publishing has any effect.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Publishes a diagnostic to all active receivers.
    ///
    /// If there are no receivers, the diagnostic is dropped.
    pub fn publish(&self, d: Diagnostic) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(d);
        }
    }

    /// Creates a new receiver that will observe subsequent diagnostics.
    ///
    /// For a disabled bus the receiver reports `Closed` on first `recv()`.
    pub fn subscribe(&self) -> broadcast::Receiver<Diagnostic> {
        match &self.tx {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                rx
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DiagnosticKind;

    #[tokio::test]
    async fn publish_reaches_receiver() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Diagnostic::new(DiagnosticKind::RedundantCancel).with_target("k"));
        let d = rx.recv().await.unwrap();
        assert_eq!(d.kind, DiagnosticKind::RedundantCancel);
        assert_eq!(d.target.as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn disabled_bus_closes_receivers() {
        let bus = Bus::disabled();
        assert!(!bus.is_enabled());
        bus.publish(Diagnostic::new(DiagnosticKind::CallDispatched));
        let mut rx = bus.subscribe();
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
