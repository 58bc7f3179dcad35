//! # Event broadcasters.
//!
//! A [`Broadcast`] delivers a [`NamedEvent`](crate::NamedEvent) to whoever is
//! currently listening, without blocking the producer indefinitely and without
//! letting one bad listener break delivery to the others.
//!
//! Two implementations share that contract:
//! - [`LocalSlot`]: at most one in-process [`LocalListener`], called inline;
//!   setting a new listener **replaces** the previous one.
//! - [`Hub`]: any number of [`Listener`]s (remote debug sessions, streaming
//!   RPC writers), each behind its own bounded queue and worker task.
//!
//! See [`Hub`] for the queueing and overflow rules.

mod hub;
mod listener;
mod local;

use std::sync::Arc;

use crate::events::NamedEvent;

pub use hub::{AttachToken, Hub};
pub use listener::{LocalListener, Listener};
pub use local::LocalSlot;

/// Delivers tagged events to the currently attached listener(s).
pub trait Broadcast: Send + Sync + 'static {
    /// Delivers `event`; never blocks on a slow listener.
    ///
    /// With nobody listening the event is dropped silently.
    fn broadcast(&self, event: NamedEvent);
}

/// Shared reference to a broadcaster.
pub type BroadcastRef = Arc<dyn Broadcast>;
