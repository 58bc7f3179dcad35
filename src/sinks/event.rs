//! # Event sink handed to subscription handlers.
//!
//! A handler only knows how to say "an event happened, here is the payload".
//! [`KeyedSink`] adds the subscription identity: it is created once per active
//! subscription, holds the canonical key and forwards every payload to the
//! broadcaster as a [`NamedEvent`].
//!
//! ```text
//! handler ── on_event(payload) ──► KeyedSink{key} ── broadcast(NamedEvent{key, payload}) ──► Broadcast
//! ```

use std::sync::Arc;

use bytes::Bytes;

use crate::broadcast::BroadcastRef;
use crate::events::NamedEvent;

/// Receiver of raw events produced by a subscription handler.
pub trait EventSink: Send + Sync + 'static {
    /// Emits one event. Must not block for long; delivery is fire-and-forget.
    fn on_event(&self, payload: Bytes);
}

/// Shared handle to an event sink.
pub type EventSinkRef = Arc<dyn EventSink>;

/// Event sink bound to one canonical subscription key.
#[derive(Clone)]
pub struct KeyedSink {
    key: Arc<str>,
    broadcaster: BroadcastRef,
}

impl KeyedSink {
    /// Binds `key` to `broadcaster`.
    pub fn new(key: impl Into<Arc<str>>, broadcaster: BroadcastRef) -> Self {
        Self {
            key: key.into(),
            broadcaster,
        }
    }

    /// Canonical key events are tagged with.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl EventSink for KeyedSink {
    fn on_event(&self, payload: Bytes) {
        self.broadcaster
            .broadcast(NamedEvent::new(Arc::clone(&self.key), payload));
    }
}

impl std::fmt::Debug for KeyedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedSink").field("key", &self.key).finish()
    }
}
