//! # Hub: non-blocking fan-out to many listeners
//!
//! [`Hub`] delivers each [`NamedEvent`] to every attached listener **without
//! awaiting** their processing. It is the broadcaster for multi-client setups:
//! several remote debug sessions, streaming RPC responses, in-process observers.
//!
//! ## What it guarantees
//! - `broadcast()` returns immediately (`try_send` per listener).
//! - Per-listener FIFO, so per-key emission order is preserved for each listener.
//! - Panics inside listeners are caught, logged and published (isolation).
//! - A stalled listener never delays the producer or the other listeners.
//!
//! ## What it does **not** guarantee
//! - No global ordering across different listeners.
//! - No retries on overflow: with [`OverflowPolicy::DropEvent`] the event is
//!   dropped for that listener only; with [`OverflowPolicy::Detach`] the
//!   listener is removed.
//! - Listeners only see events broadcast after they were attached.
//!
//! ## Diagram
//! ```text
//!    broadcast(NamedEvent)                 (clone per listener, read lock)
//!        ├──try_send──► [queue L1] ─► worker L1 ─► on_event()
//!        ├──try_send──► [queue L2] ─► worker L2 ─► on_event()
//!        └──try_send──► [queue LN] ─► mpsc::Receiver owned by a transport
//!                  │
//!                  └─ Full   → ListenerOverflow (drop event | detach listener)
//!                  └─ Closed → listener detached
//! ```

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use super::{Broadcast, Listener};
use crate::core::panic::payload_message;
use crate::core::{Config, OverflowPolicy};
use crate::events::{Bus, Diagnostic, DiagnosticKind, NamedEvent};

/// Identifies one attached listener; pass it to [`Hub::detach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttachToken(u64);

impl fmt::Display for AttachToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Per-listener queue with metadata.
struct ListenerSlot {
    name: Arc<str>,
    sender: mpsc::Sender<NamedEvent>,
    worker: Option<JoinHandle<()>>,
}

/// Multi-client broadcaster with per-listener bounded queues.
pub struct Hub {
    default_capacity: usize,
    overflow: OverflowPolicy,
    bus: Bus,
    next_token: AtomicU64,
    slots: RwLock<HashMap<AttachToken, ListenerSlot>>,
}

impl Hub {
    /// Creates an empty hub using `cfg.hub_queue_capacity` and `cfg.overflow`.
    ///
    /// Listener diagnostics are published on `bus`.
    #[must_use]
    pub fn new(cfg: &Config, bus: Bus) -> Self {
        Self {
            default_capacity: cfg.hub_queue_capacity_clamped(),
            overflow: cfg.overflow,
            bus,
            next_token: AtomicU64::new(1),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Attaches a listener and spawns its worker task.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn attach(&self, listener: Arc<dyn Listener>) -> AttachToken {
        let cap = listener
            .queue_capacity()
            .unwrap_or(self.default_capacity)
            .max(1);
        let name: Arc<str> = Arc::from(listener.name());
        let (tx, mut rx) = mpsc::channel::<NamedEvent>(cap);

        let bus = self.bus.clone();
        let worker_name = Arc::clone(&name);
        let worker = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let fut = listener.on_event(&ev);
                if let Err(panic_err) = AssertUnwindSafe(fut).catch_unwind().await {
                    let info = payload_message(panic_err.as_ref());
                    tracing::warn!(
                        listener = %worker_name,
                        event = %ev.name,
                        panic = %info,
                        "listener panicked"
                    );
                    bus.publish(Diagnostic::listener_panicked(&worker_name, info));
                }
            }
        });

        self.insert(name, tx, Some(worker))
    }

    /// Attaches a bare queue; the caller drains the returned receiver itself.
    ///
    /// `capacity = 0` uses the hub default. Dropping the receiver detaches the
    /// listener on the next broadcast.
    pub fn attach_channel(
        &self,
        name: impl Into<Arc<str>>,
        capacity: usize,
    ) -> (AttachToken, mpsc::Receiver<NamedEvent>) {
        let cap = if capacity == 0 {
            self.default_capacity
        } else {
            capacity
        };
        let (tx, rx) = mpsc::channel::<NamedEvent>(cap);
        (self.insert(name.into(), tx, None), rx)
    }

    /// Detaches a listener: its queue is closed and its worker exits after
    /// draining what is already queued. Returns `false` for an unknown token.
    pub fn detach(&self, token: AttachToken) -> bool {
        self.remove(token, "detached")
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_slots().len()
    }

    /// True if nobody is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_slots().is_empty()
    }

    /// Sorted names of attached listeners.
    pub fn listener_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_slots()
            .values()
            .map(|s| s.name.to_string())
            .collect();
        names.sort_unstable();
        names
    }

    /// Graceful shutdown: close all queues and await worker completion.
    ///
    /// Events queued before the call are still delivered.
    pub async fn shutdown(&self) {
        let drained: Vec<(AttachToken, ListenerSlot)> = {
            let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
            slots.drain().collect()
        };

        let mut workers = Vec::with_capacity(drained.len());
        for (token, slot) in drained {
            self.publish_detached(token, &slot.name, "shutdown");
            if let Some(worker) = slot.worker {
                workers.push(worker);
            }
        }
        for h in workers {
            let _ = h.await;
        }
    }

    fn insert(
        &self,
        name: Arc<str>,
        sender: mpsc::Sender<NamedEvent>,
        worker: Option<JoinHandle<()>>,
    ) -> AttachToken {
        let token = AttachToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(listener = %name, %token, "listener attached");
        self.bus.publish(
            Diagnostic::new(DiagnosticKind::ListenerAttached).with_target(Arc::clone(&name)),
        );
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                token,
                ListenerSlot {
                    name,
                    sender,
                    worker,
                },
            );
        token
    }

    fn remove(&self, token: AttachToken, reason: &'static str) -> bool {
        let removed = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&token);
        match removed {
            Some(slot) => {
                self.publish_detached(token, &slot.name, reason);
                true
            }
            None => false,
        }
    }

    fn publish_detached(&self, token: AttachToken, name: &Arc<str>, reason: &'static str) {
        tracing::debug!(listener = %name, %token, reason, "listener detached");
        self.bus.publish(
            Diagnostic::new(DiagnosticKind::ListenerDetached)
                .with_target(Arc::clone(name))
                .with_reason(reason),
        );
    }

    fn read_slots(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<AttachToken, ListenerSlot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Broadcast for Hub {
    fn broadcast(&self, event: NamedEvent) {
        let mut evicted: Vec<(AttachToken, &'static str)> = Vec::new();
        {
            let slots = self.read_slots();
            for (token, slot) in slots.iter() {
                match slot.sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(
                            listener = %slot.name,
                            event = %event.name,
                            "listener queue full; event dropped"
                        );
                        self.bus
                            .publish(Diagnostic::listener_overflow(&slot.name, "full"));
                        if self.overflow == OverflowPolicy::Detach {
                            evicted.push((*token, "overflow"));
                        }
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        evicted.push((*token, "closed"));
                    }
                }
            }
        }
        for (token, reason) in evicted {
            self.remove(token, reason);
        }
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("listeners", &self.len())
            .field("default_capacity", &self.default_capacity)
            .field("overflow", &self.overflow)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Forward {
        name: &'static str,
        tx: mpsc::UnboundedSender<NamedEvent>,
        panic_on: Option<&'static str>,
    }

    #[async_trait]
    impl Listener for Forward {
        async fn on_event(&self, event: &NamedEvent) {
            if self
                .panic_on
                .is_some_and(|p| p.as_bytes() == &event.payload[..])
            {
                panic!("listener bug");
            }
            let _ = self.tx.send(event.clone());
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    trait PayloadStr {
        fn payload_str(&self) -> String;
    }

    impl PayloadStr for NamedEvent {
        fn payload_str(&self) -> String {
            String::from_utf8_lossy(&self.payload).into_owned()
        }
    }

    fn hub(overflow: OverflowPolicy) -> (Hub, Bus) {
        let cfg = Config {
            overflow,
            ..Config::default()
        };
        let bus = Bus::new(64);
        (Hub::new(&cfg, bus.clone()), bus)
    }

    #[tokio::test]
    async fn broadcast_without_listeners_returns() {
        let (hub, _) = hub(OverflowPolicy::DropEvent);
        assert!(hub.is_empty());
        hub.broadcast(NamedEvent::new("Tick", "1"));
    }

    #[tokio::test]
    async fn fans_out_to_every_listener() {
        let (hub, _) = hub(OverflowPolicy::DropEvent);
        let mut rxs: Vec<_> = (0..3)
            .map(|i| hub.attach_channel(format!("client-{i}"), 8).1)
            .collect();
        assert_eq!(hub.len(), 3);

        hub.broadcast(NamedEvent::new("Tick", "1"));

        for rx in &mut rxs {
            let ev = timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(ev.name(), "Tick");
        }
    }

    #[tokio::test]
    async fn saturated_listener_does_not_block_others() {
        let (hub, bus) = hub(OverflowPolicy::DropEvent);
        let mut diags = bus.subscribe();
        let (_stuck_token, mut stuck) = hub.attach_channel("stuck", 1);
        let (_ok_token, mut healthy) = hub.attach_channel("healthy", 16);

        for i in 0..10 {
            hub.broadcast(NamedEvent::new("Count", i.to_string()));
        }

        for i in 0..10 {
            let ev = healthy.recv().await.unwrap();
            assert_eq!(ev.payload_str(), i.to_string());
        }
        assert_eq!(stuck.recv().await.unwrap().payload_str(), "0");
        assert!(stuck.try_recv().is_err());
        assert_eq!(hub.len(), 2);

        let mut overflows = 0;
        while let Ok(d) = diags.try_recv() {
            if d.kind == DiagnosticKind::ListenerOverflow {
                assert_eq!(d.target.as_deref(), Some("stuck"));
                overflows += 1;
            }
        }
        assert_eq!(overflows, 9);
    }

    #[tokio::test]
    async fn detach_policy_evicts_saturated_listener() {
        let (hub, _) = hub(OverflowPolicy::Detach);
        let (_a, mut stuck) = hub.attach_channel("stuck", 1);
        let (_b, mut healthy) = hub.attach_channel("healthy", 16);

        hub.broadcast(NamedEvent::new("Count", "0"));
        hub.broadcast(NamedEvent::new("Count", "1"));
        hub.broadcast(NamedEvent::new("Count", "2"));

        assert_eq!(hub.listener_names(), ["healthy"]);
        assert_eq!(stuck.recv().await.unwrap().payload_str(), "0");
        assert!(stuck.recv().await.is_none());
        for expected in ["0", "1", "2"] {
            assert_eq!(healthy.recv().await.unwrap().payload_str(), expected);
        }
    }

    #[tokio::test]
    async fn dropped_receiver_is_detached() {
        let (hub, _) = hub(OverflowPolicy::DropEvent);
        let (_token, rx) = hub.attach_channel("gone", 4);
        drop(rx);
        hub.broadcast(NamedEvent::new("Tick", "1"));
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn detach_is_idempotent() {
        let (hub, _) = hub(OverflowPolicy::DropEvent);
        let (token, mut rx) = hub.attach_channel("session", 4);
        assert!(hub.detach(token));
        assert!(!hub.detach(token));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn worker_survives_listener_panic() {
        let (hub, bus) = hub(OverflowPolicy::DropEvent);
        let mut diags = bus.subscribe();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.attach(Arc::new(Forward {
            name: "fragile",
            tx,
            panic_on: Some("bad"),
        }));

        hub.broadcast(NamedEvent::new("Feed", "bad"));
        hub.broadcast(NamedEvent::new("Feed", "good"));

        let ev = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ev.payload_str(), "good");

        let panicked = loop {
            let d = timeout(Duration::from_secs(1), diags.recv())
                .await
                .unwrap()
                .unwrap();
            if d.kind == DiagnosticKind::ListenerPanicked {
                break d;
            }
        };
        assert_eq!(panicked.target.as_deref(), Some("fragile"));
        assert_eq!(panicked.reason.as_deref(), Some("listener bug"));
    }

    #[tokio::test]
    async fn shutdown_drains_queued_events() {
        let (hub, _) = hub(OverflowPolicy::DropEvent);
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.attach(Arc::new(Forward {
            name: "worker",
            tx,
            panic_on: None,
        }));
        for i in 0..5 {
            hub.broadcast(NamedEvent::new("Count", i.to_string()));
        }
        hub.shutdown().await;
        assert!(hub.is_empty());

        let mut got = Vec::new();
        while let Some(ev) = rx.recv().await {
            got.push(ev.payload_str());
        }
        assert_eq!(got, ["0", "1", "2", "3", "4"]);
    }
}
