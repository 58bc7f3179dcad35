//! # Event listeners.
//!
//! - [`Listener`]: hub listener; runs on a dedicated worker task behind a
//!   bounded queue, so it may await I/O (socket writes, stream sends).
//! - [`LocalListener`]: single-slot listener; called inline on the producer
//!   thread, so it must return quickly (e.g. hand the event to a native emitter).
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use callhub::{Listener, NamedEvent};
//! use tokio::sync::mpsc;
//!
//! struct Session {
//!     out: mpsc::UnboundedSender<String>,
//! }
//!
//! #[async_trait]
//! impl Listener for Session {
//!     async fn on_event(&self, ev: &NamedEvent) {
//!         let frame = format!("{}:{}", ev.name, String::from_utf8_lossy(&ev.payload));
//!         let _ = self.out.send(frame);
//!     }
//!
//!     fn name(&self) -> &str { "debug-session" }
//!     fn queue_capacity(&self) -> Option<usize> { Some(64) }
//! }
//! ```

use async_trait::async_trait;

use crate::events::NamedEvent;

/// Listener attached to a [`Hub`](crate::Hub).
///
/// Each listener runs in isolation:
/// - **Bounded queue** buffers events (capacity via [`Self::queue_capacity`]).
/// - **Dedicated worker task** processes events sequentially (FIFO).
/// - **Panic isolation**: panics are caught and published as `ListenerPanicked`.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from the listener's worker task, never in the producer context.
    async fn on_event(&self, event: &NamedEvent);

    /// Returns the listener name used in logs and diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity; `None` uses the hub default.
    fn queue_capacity(&self) -> Option<usize> {
        None
    }
}

/// Listener held by a [`LocalSlot`](crate::LocalSlot).
pub trait LocalListener: Send + Sync + 'static {
    /// Handles one event on the producer thread.
    fn on_event(&self, event: &NamedEvent);
}

impl<F> LocalListener for F
where
    F: Fn(&NamedEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: &NamedEvent) {
        self(event)
    }
}
