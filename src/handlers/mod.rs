//! # Handler abstractions.
//!
//! This module provides the types generated glue registers with the registry:
//! - [`CallHandler`] / [`CallFn`] / [`CallRef`] - one-shot call targets
//! - [`SubscriptionHandler`] / [`SubscriptionFn`] / [`SubscriptionRef`] - subscription targets
//! - [`SubscriptionHandle`] / [`BoxHandle`] / [`FnHandle`] - live subscription capabilities

mod call;
mod handle;
mod subscription;

pub use call::{CallFn, CallHandler, CallRef};
pub use handle::{BoxHandle, FnHandle, SubscriptionHandle};
pub use subscription::{SubscriptionFn, SubscriptionHandler, SubscriptionRef, canonical_key};
