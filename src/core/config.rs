//! # Registry configuration.
//!
//! Provides [`Config`] centralized settings for the registry and its hub.
//!
//! Config is consumed by [`RegistryBuilder`](crate::RegistryBuilder) and by
//! [`Hub::new`](crate::Hub::new).
//!
//! ## Sentinel values
//! - `diagnostics_capacity = 0` → diagnostics bus disabled
//! - `hub_queue_capacity = 0` → clamped to 1

/// What the hub does with an event that does not fit into a listener queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop this event for this listener only and keep the listener attached.
    #[default]
    DropEvent,
    /// Detach the listener; its queue is closed and its worker exits.
    Detach,
}

/// Configuration for the registry and its event hub.
///
/// ## Field semantics
/// - `hub_queue_capacity`: per-listener queue size for hub listeners (min 1)
/// - `overflow`: slow listener policy
/// - `diagnostics_capacity`: diagnostics bus ring buffer (`0` = disabled)
/// - `capture_backtrace`: capture a backtrace when a handler panics
#[derive(Clone, Debug)]
pub struct Config {
    /// Default queue capacity for listeners attached to a [`Hub`](crate::Hub).
    ///
    /// Listeners can request their own capacity; this value is used when they
    /// don't and for [`Hub::attach_channel`](crate::Hub::attach_channel) callers
    /// passing `0`.
    pub hub_queue_capacity: usize,

    /// Policy applied when a listener queue is full.
    pub overflow: OverflowPolicy,

    /// Capacity of the diagnostics broadcast channel.
    ///
    /// Receivers lagging behind more than this many diagnostics skip the oldest ones.
    pub diagnostics_capacity: usize,

    /// Whether panics in handlers capture a full backtrace.
    ///
    /// When `false` the error still carries the panic location.
    pub capture_backtrace: bool,
}

impl Config {
    /// Returns the hub queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn hub_queue_capacity_clamped(&self) -> usize {
        self.hub_queue_capacity.max(1)
    }

    /// Returns the diagnostics bus capacity as an `Option`.
    ///
    /// - `None` → diagnostics disabled
    /// - `Some(n)` → ring buffer of `n` diagnostics
    #[inline]
    pub fn diagnostics_limit(&self) -> Option<usize> {
        if self.diagnostics_capacity == 0 {
            None
        } else {
            Some(self.diagnostics_capacity)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `hub_queue_capacity = 256`
    /// - `overflow = OverflowPolicy::DropEvent`
    /// - `diagnostics_capacity = 1024`
    /// - `capture_backtrace = true`
    fn default() -> Self {
        Self {
            hub_queue_capacity: 256,
            overflow: OverflowPolicy::DropEvent,
            diagnostics_capacity: 1024,
            capture_backtrace: true,
        }
    }
}
