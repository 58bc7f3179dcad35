//! Error types used by the callhub registry, its handlers and the sync bridge.
//!
//! This module defines three error enums:
//!
//! - [`RegistryError`]: errors raised by the registry while dispatching.
//! - [`HandlerError`]: errors returned by generated handler glue.
//! - [`CallError`]: outcome of a call awaited through the sync bridge.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the registry.
///
/// Every variant originates from caller input or from a handler defect and is
/// always returned/delivered to the caller; none of them is fatal to the registry.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No call handler is registered under this name.
    #[error("no such method: {name}")]
    UnknownCallTarget {
        /// The requested call name.
        name: String,
    },

    /// No subscription handler is registered under this name.
    #[error("no adapter for event: {name}")]
    UnknownSubscriptionTarget {
        /// The requested subscription name.
        name: String,
    },

    /// The canonical-key function rejected the arguments.
    #[error("cannot canonicalize arguments for {name}: {error}")]
    Canonicalization {
        /// The requested subscription name.
        name: String,
        /// The underlying error message.
        error: String,
    },

    /// The subscription handler failed to establish the subscription.
    #[error("subscribe failed for {key}: {error}")]
    SubscribeFailed {
        /// Canonical key of the subscription that could not be created.
        key: String,
        /// The underlying error message.
        error: String,
    },

    /// A handler panicked; the panic was contained.
    #[error("handler {name} panicked: {message}\n{backtrace}")]
    HandlerPanic {
        /// Call or subscription name of the handler.
        name: String,
        /// Panic payload rendered as text.
        message: String,
        /// Backtrace captured at the panic site.
        backtrace: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use callhub::RegistryError;
    ///
    /// let err = RegistryError::UnknownCallTarget { name: "Nope".into() };
    /// assert_eq!(err.as_label(), "unknown_call_target");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::UnknownCallTarget { .. } => "unknown_call_target",
            RegistryError::UnknownSubscriptionTarget { .. } => "unknown_subscription_target",
            RegistryError::Canonicalization { .. } => "canonicalization_failed",
            RegistryError::SubscribeFailed { .. } => "subscribe_failed",
            RegistryError::HandlerPanic { .. } => "handler_panic",
        }
    }

    /// Returns a human-readable message without the backtrace.
    pub fn as_message(&self) -> String {
        match self {
            RegistryError::UnknownCallTarget { name } => format!("no such method: {name}"),
            RegistryError::UnknownSubscriptionTarget { name } => {
                format!("no adapter for event: {name}")
            }
            RegistryError::Canonicalization { name, error } => format!("{name}: {error}"),
            RegistryError::SubscribeFailed { key, error } => format!("{key}: {error}"),
            RegistryError::HandlerPanic { name, message, .. } => {
                format!("{name} panicked: {message}")
            }
        }
    }
}

/// # Errors returned by handlers.
///
/// Generated glue decodes arguments before calling user code; decoding problems
/// surface as [`HandlerError::InvalidArguments`], everything else as [`HandlerError::Fail`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Arguments could not be decoded or are out of range.
    #[error("invalid arguments: {error}")]
    InvalidArguments {
        /// The underlying error message.
        error: String,
    },

    /// Handler failed for any other reason.
    #[error("{error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`HandlerError::InvalidArguments`].
    pub fn invalid(error: impl Into<String>) -> Self {
        HandlerError::InvalidArguments {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::InvalidArguments { .. } => "handler_invalid_arguments",
            HandlerError::Fail { .. } => "handler_failed",
        }
    }
}

/// # Outcome of a call awaited through [`PendingCall`](crate::PendingCall).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The handler reported an error through `on_error`.
    #[error("{0}")]
    Remote(String),

    /// The result sink was dropped without ever being completed.
    #[error("call abandoned without a result")]
    Abandoned,

    /// The caller-imposed deadline elapsed first.
    #[error("call timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },
}

impl CallError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use callhub::CallError;
    ///
    /// assert_eq!(CallError::Abandoned.as_label(), "call_abandoned");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CallError::Remote(_) => "call_remote_error",
            CallError::Abandoned => "call_abandoned",
            CallError::Timeout { .. } => "call_timeout",
        }
    }

    /// Indicates whether the error came from the handler itself.
    pub fn is_remote(&self) -> bool {
        matches!(self, CallError::Remote(_))
    }
}
