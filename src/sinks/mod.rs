//! # Sinks: where call results and subscription events go.
//!
//! Calls and subscriptions have different lifecycles, so they get separate
//! capability traits:
//! - [`ResultSink`] one outcome per call (`on_success` / `on_error`)
//! - [`EventSink`] any number of events per subscription (`on_event`)
//!
//! Plus two adapters:
//! - [`KeyedSink`] tags handler events with their canonical key
//! - [`SyncCall`] / [`PendingCall`] turn a call into a single awaitable round trip

mod event;
mod result;
mod sync;

pub use event::{EventSink, EventSinkRef, KeyedSink};
pub use result::{ResultSink, ResultSinkRef};
pub use sync::{PendingCall, SyncCall};
