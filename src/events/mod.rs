//! Events: subscription payloads, diagnostics and the diagnostics bus.
//!
//! ## Contents
//! - [`NamedEvent`] payload tagged with its canonical subscription key
//! - [`DiagnosticKind`], [`Diagnostic`] registry lifecycle records
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast` for diagnostics
//!
//! ## Quick reference
//! - **NamedEvent producers**: subscription handlers via [`KeyedSink`](crate::KeyedSink).
//! - **NamedEvent consumers**: [`LocalSlot`](crate::LocalSlot) and [`Hub`](crate::Hub) listeners.
//! - **Diagnostic producers**: `Registry`, `Hub`.
//! - **Diagnostic consumers**: `LogWriter`, [`Registry::diagnostics`](crate::Registry::diagnostics) receivers.

mod bus;
mod event;
mod named;

pub use bus::Bus;
pub use event::{Diagnostic, DiagnosticKind};
pub use named::NamedEvent;
