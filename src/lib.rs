//! # callhub
//!
//! **Callhub** is the runtime bridge between generated service glue and the
//! transports that expose it (WebSocket server, mobile bindings, in-process
//! callers).
//!
//! It dispatches one-shot calls by name, deduplicates event subscriptions by
//! canonical key so identical requests share one producer, and fans the
//! resulting events out to one local listener or many hub clients.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   generated glue                      transports
//!   register_function(name, f)          call(name, args, sink)
//!   register_subscription(name, s, k)   subscribe(name, args) / cancel_subscription(key)
//!            │                                  │
//!            ▼                                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Registry                                                         │
//! │  - CallTable          (name → CallHandler)                        │
//! │  - SubscriptionTable  (name → SubscriptionHandler)                │
//! │  - ActiveTable        (canonical key → {handle, refcount})        │
//! │  - Bus                (diagnostics)                               │
//! └──────┬─────────────────────────────┬──────────────────────────────┘
//!        │ ResultSink                  │ KeyedSink(key) ── NamedEvent{key, payload}
//!        ▼                             ▼
//!   caller / PendingCall         Broadcast
//!                                  ├─► LocalSlot  (one replaceable listener, inline)
//!                                  └─► Hub        (many listeners, bounded queues)
//! ```
//!
//! The subscription lifecycle is described on [`Registry`]; per-listener
//! queueing on [`Hub`].
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                                     |
//! |-------------------|-------------------------------------------------------------|--------------------------------------------------------|
//! | **Dispatch**      | Name-addressed calls and deduplicated subscriptions.        | [`Registry`], [`RegistryBuilder`]                      |
//! | **Handlers**      | What generated glue registers.                              | [`CallHandler`], [`SubscriptionHandler`], [`CallFn`]   |
//! | **Sinks**         | Where results and events go.                                | [`ResultSink`], [`EventSink`], [`PendingCall`]         |
//! | **Broadcast**     | Local single-listener slot and multi-client hub.            | [`LocalSlot`], [`Hub`], [`Listener`]                   |
//! | **Diagnostics**   | Lifecycle records for logging and tests.                    | [`Diagnostic`], [`DiagnosticKind`], [`Bus`]            |
//! | **Errors**        | Typed errors for dispatch, handlers and the sync bridge.    | [`RegistryError`], [`HandlerError`], [`CallError`]     |
//! | **Configuration** | Hub queue sizes, overflow policy, backtrace capture.        | [`Config`], [`OverflowPolicy`]                         |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which renders diagnostics as `tracing` records.
//!
//! ## Example
//! ```rust
//! use bytes::Bytes;
//! use callhub::{Config, Registry, ResultSinkRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::builder(Config::default()).build();
//!
//!     registry.register_function("Echo", |args: Bytes, sink: ResultSinkRef| {
//!         sink.on_success(args);
//!         Ok(())
//!     });
//!
//!     let reply = registry.call_sync("Echo", Bytes::from_static(b"hi")).recv().await?;
//!     assert_eq!(reply, Bytes::from_static(b"hi"));
//!     Ok(())
//! }
//! ```
mod broadcast;
mod core;
mod error;
mod events;
mod handlers;
mod sinks;

// ---- Public re-exports ----

pub use broadcast::{
    AttachToken, Broadcast, BroadcastRef, Hub, Listener, LocalListener, LocalSlot,
};
pub use core::{Config, OverflowPolicy, Registry, RegistryBuilder};
pub use error::{CallError, HandlerError, RegistryError};
pub use events::{Bus, Diagnostic, DiagnosticKind, NamedEvent};
pub use handlers::{
    BoxHandle, CallFn, CallHandler, CallRef, FnHandle, SubscriptionFn, SubscriptionHandle,
    SubscriptionHandler, SubscriptionRef, canonical_key,
};
pub use sinks::{
    EventSink, EventSinkRef, KeyedSink, PendingCall, ResultSink, ResultSinkRef, SyncCall,
};

// Optional: expose the built-in diagnostics logger.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
mod subscribers;
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
