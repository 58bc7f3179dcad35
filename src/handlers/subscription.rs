//! # Subscription handler abstraction and function-backed implementation.
//!
//! A [`SubscriptionHandler`] pairs two functions:
//! - `canonical_key(args)`: pure, maps arguments to the canonical subscription key;
//! - `subscribe(args, sink)`: starts the producer and returns its [`BoxHandle`].
//!
//! Two subscribe requests whose arguments canonicalize to the same key share one
//! producer; see [`Registry::subscribe`](crate::Registry::subscribe).
//!
//! ## Canonical keys
//! A key is the subscription name followed by a deterministic encoding of the
//! arguments, joined with `:` (e.g. `"SubscribeFoo:42:bar"`). [`canonical_key`]
//! builds one from displayable parts.

use std::fmt::{Display, Write as _};
use std::sync::Arc;

use bytes::Bytes;

use crate::error::HandlerError;
use crate::handlers::BoxHandle;
use crate::sinks::EventSinkRef;

/// # Subscription target.
pub trait SubscriptionHandler: Send + Sync + 'static {
    /// Maps raw arguments to the canonical subscription key.
    ///
    /// Must be deterministic and side-effect free.
    fn canonical_key(&self, args: &[u8]) -> Result<String, HandlerError>;

    /// Starts the underlying producer.
    ///
    /// Called only for the first subscriber of a key. Events go to `sink` until
    /// the returned handle is cancelled.
    fn subscribe(&self, args: Bytes, sink: EventSinkRef) -> Result<BoxHandle, HandlerError>;
}

/// Shared reference to a subscription handler.
pub type SubscriptionRef = Arc<dyn SubscriptionHandler>;

/// Function-backed subscription handler.
///
/// ## Example
/// ```rust
/// use bytes::Bytes;
/// use callhub::{canonical_key, EventSinkRef, FnHandle, HandlerError, SubscriptionFn, SubscriptionHandler};
///
/// let h = SubscriptionFn::new(
///     |_args: Bytes, _sink: EventSinkRef| Ok(FnHandle::boxed(|| {})),
///     |args: &[u8]| {
///         let room = std::str::from_utf8(args).map_err(|e| HandlerError::invalid(e.to_string()))?;
///         Ok(canonical_key("SubscribeRoom", [room]))
///     },
/// );
/// assert_eq!(h.canonical_key(b"lobby").unwrap(), "SubscribeRoom:lobby");
/// ```
#[derive(Debug)]
pub struct SubscriptionFn<S, K> {
    subscribe: S,
    key: K,
}

impl<S, K> SubscriptionFn<S, K>
where
    S: Fn(Bytes, EventSinkRef) -> Result<BoxHandle, HandlerError> + Send + Sync + 'static,
    K: Fn(&[u8]) -> Result<String, HandlerError> + Send + Sync + 'static,
{
    /// Pairs a subscribe closure with its canonical-key closure.
    pub fn new(subscribe: S, key: K) -> Self {
        Self { subscribe, key }
    }

    /// Same as [`SubscriptionFn::new`] but returns a shared handle.
    pub fn arc(subscribe: S, key: K) -> Arc<Self> {
        Arc::new(Self::new(subscribe, key))
    }
}

impl<S, K> SubscriptionHandler for SubscriptionFn<S, K>
where
    S: Fn(Bytes, EventSinkRef) -> Result<BoxHandle, HandlerError> + Send + Sync + 'static,
    K: Fn(&[u8]) -> Result<String, HandlerError> + Send + Sync + 'static,
{
    fn canonical_key(&self, args: &[u8]) -> Result<String, HandlerError> {
        (self.key)(args)
    }

    fn subscribe(&self, args: Bytes, sink: EventSinkRef) -> Result<BoxHandle, HandlerError> {
        (self.subscribe)(args, sink)
    }
}

/// Builds a canonical key: `name` followed by each part, `:`-separated.
///
/// ```
/// assert_eq!(callhub::canonical_key("SubscribeFoo", ["42", "bar"]), "SubscribeFoo:42:bar");
/// assert_eq!(callhub::canonical_key::<&str>("Clock", []), "Clock");
/// ```
pub fn canonical_key<P: Display>(name: &str, parts: impl IntoIterator<Item = P>) -> String {
    let mut key = String::from(name);
    for part in parts {
        let _ = write!(key, ":{part}");
    }
    key
}
