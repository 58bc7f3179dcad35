//! # Single-slot broadcaster.
//!
//! [`LocalSlot`] holds at most one [`LocalListener`]. It exists for the
//! in-process consumer case (a mobile UI bridge), where exactly one consumer is
//! expected: [`LocalSlot::set_listener`] **replaces** the current listener, it
//! does not add a second one.
//!
//! ## Rules
//! - `broadcast` calls the listener inline, in emission order.
//! - No listener → the event is dropped silently.
//! - A panicking listener is contained and logged; the slot keeps it.

use std::sync::{Arc, PoisonError, RwLock};

use super::{Broadcast, LocalListener};
use crate::core::panic::guard;
use crate::events::NamedEvent;

/// Broadcaster with one replaceable listener.
#[derive(Default)]
pub struct LocalSlot {
    listener: RwLock<Option<Arc<dyn LocalListener>>>,
}

impl LocalSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `listener`, or detaches with `None`. Returns the previous listener.
    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn LocalListener>>,
    ) -> Option<Arc<dyn LocalListener>> {
        let mut slot = self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, listener)
    }

    /// True if a listener is installed.
    pub fn has_listener(&self) -> bool {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Broadcast for LocalSlot {
    fn broadcast(&self, event: NamedEvent) {
        let current = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(listener) = current else {
            return;
        };
        if let Err(report) = guard(false, || listener.on_event(&event)) {
            tracing::warn!(
                event = %event.name,
                panic = %report.message,
                location = %report.location,
                "local listener panicked; event lost"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn drops_without_listener() {
        let slot = LocalSlot::new();
        assert!(!slot.has_listener());
        slot.broadcast(NamedEvent::new("Tick", "1"));
    }

    #[test]
    fn replace_not_add() {
        let slot = LocalSlot::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&first);
        slot.set_listener(Some(Arc::new(move |_: &NamedEvent| {
            f.fetch_add(1, Ordering::SeqCst);
        })));
        slot.broadcast(NamedEvent::new("Tick", "1"));

        let s = Arc::clone(&second);
        let previous = slot.set_listener(Some(Arc::new(move |_: &NamedEvent| {
            s.fetch_add(1, Ordering::SeqCst);
        })));
        assert!(previous.is_some());
        slot.broadcast(NamedEvent::new("Tick", "2"));

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        slot.set_listener(None);
        slot.broadcast(NamedEvent::new("Tick", "3"));
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn preserves_emission_order() {
        let slot = LocalSlot::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        slot.set_listener(Some(Arc::new(move |ev: &NamedEvent| {
            s.lock().unwrap().push(ev.payload.clone());
        })));
        for i in 0..5 {
            slot.broadcast(NamedEvent::new("Count", i.to_string()));
        }
        let got: Vec<String> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|b| String::from_utf8(b.to_vec()).unwrap())
            .collect();
        assert_eq!(got, ["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn panicking_listener_is_contained() {
        let slot = LocalSlot::new();
        slot.set_listener(Some(Arc::new(|_: &NamedEvent| -> () {
            panic!("listener bug")
        })));
        slot.broadcast(NamedEvent::new("Tick", "1"));
        slot.broadcast(NamedEvent::new("Tick", "2"));
        assert!(slot.has_listener());
    }
}
