//! # Events tagged with their canonical subscription name.
//!
//! A [`NamedEvent`] is what listeners receive: the canonical key of the
//! subscription that produced it plus the opaque payload. Transports map it to
//! their own wire format (JSON frame, streamed message, native emitter call).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use bytes::Bytes;

/// Global sequence counter for event ids.
static NAMED_SEQ: AtomicU64 = AtomicU64::new(0);

/// Event produced by a subscription handler and tagged with its canonical key.
///
/// Cheap to clone: the name is an `Arc<str>` and the payload is [`Bytes`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedEvent {
    /// Globally unique, monotonically increasing id.
    pub seq: u64,
    /// Wall-clock timestamp taken when the handler emitted the event.
    pub at: SystemTime,
    /// Canonical subscription key, e.g. `"SubscribeFoo:42:bar"`.
    pub name: Arc<str>,
    /// Opaque payload encoded by the handler glue.
    pub payload: Bytes,
}

impl NamedEvent {
    /// Creates a new event with current timestamp and next sequence number.
    pub fn new(name: impl Into<Arc<str>>, payload: impl Into<Bytes>) -> Self {
        Self {
            seq: NAMED_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Canonical key as `&str`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
