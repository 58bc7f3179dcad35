//! # Call handler abstraction and function-backed implementation.
//!
//! This module defines the [`CallHandler`] trait and a convenient function-backed
//! implementation [`CallFn`]. The common handle type is [`CallRef`], an
//! `Arc<dyn CallHandler>` suitable for sharing across transport threads.
//!
//! A handler receives the opaque argument payload and a [`ResultSinkRef`]. It may
//! complete the sink before returning or hand it to background work and complete
//! it later. Returning `Err` makes the registry deliver the error to the sink.
//!
//! ## Example
//! ```rust
//! use bytes::Bytes;
//! use callhub::{CallFn, CallHandler, CallRef, HandlerError, ResultSinkRef};
//!
//! let echo: CallRef = CallFn::arc(|args: Bytes, sink: ResultSinkRef| {
//!     if args.is_empty() {
//!         return Err(HandlerError::invalid("empty body"));
//!     }
//!     sink.on_success(args);
//!     Ok(())
//! });
//! # let _ = echo;
//! ```

use std::sync::Arc;

use bytes::Bytes;

use crate::error::HandlerError;
use crate::sinks::ResultSinkRef;

/// # One-shot call target.
///
/// Implementations are produced by generated glue: they decode `args`, call the
/// user function and encode its result into the sink.
pub trait CallHandler: Send + Sync + 'static {
    /// Handles one call.
    ///
    /// Must complete `sink` at most once, now or later. Panics are caught by the registry.
    fn call(&self, args: Bytes, sink: ResultSinkRef) -> Result<(), HandlerError>;
}

/// Shared reference to a call handler.
pub type CallRef = Arc<dyn CallHandler>;

/// Function-backed call handler.
#[derive(Debug)]
pub struct CallFn<F> {
    f: F,
}

impl<F> CallFn<F>
where
    F: Fn(Bytes, ResultSinkRef) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> CallHandler for CallFn<F>
where
    F: Fn(Bytes, ResultSinkRef) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn call(&self, args: Bytes, sink: ResultSinkRef) -> Result<(), HandlerError> {
        (self.f)(args, sink)
    }
}
