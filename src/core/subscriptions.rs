//! # Subscription tables: handlers and active, deduplicated subscriptions.
//!
//! [`SubscriptionTable`] maps subscription names to handlers.
//! [`ActiveTable`] tracks live subscriptions by canonical key with a refcount.
//!
//! ## Architecture
//! ```text
//! ActiveTable
//!   slots: Mutex<HashMap<key, Arc<Slot>>>        (short bookkeeping lock)
//!                                 │
//!                                 └─► Slot: Mutex<SlotState>   (per-key lock)
//!                                           { active: Option<{handle, refcount}>, retired }
//! ```
//!
//! ## Rules
//! - The registry-wide lock is held only to look up / insert / remove a slot,
//!   never while a handler runs.
//! - Load-or-create runs under the key's own lock: concurrent subscribers of
//!   the same key wait for the first one, subscribers of other keys don't.
//! - A failed create leaves nothing behind: the empty slot is retired and removed.
//! - A retired slot is never reused; whoever finds one retries with a fresh slot.
//! - Lock order is slot → map; the map lock is never held while waiting for a slot.
//! - An entry is observable (counted, cancellable) iff its refcount is ≥ 1.
//! - Introspection (`keys`, `len`, `refcount` of an inactive key) never waits
//!   for a slot lock; it reads the slot's `live` flag instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::handlers::{BoxHandle, SubscriptionRef};

/// Name → subscription handler table.
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    handlers: RwLock<HashMap<String, SubscriptionRef>>,
}

impl SubscriptionTable {
    /// Stores `handler` under `name`; returns `true` if it replaced another one.
    pub(crate) fn insert(&self, name: String, handler: SubscriptionRef) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, handler)
            .is_some()
    }

    pub(crate) fn get(&self, name: &str) -> Option<SubscriptionRef> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns sorted list of registered subscription names.
    pub(crate) fn names(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = handlers.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

/// One live subscription.
struct Active {
    handle: BoxHandle,
    refcount: usize,
}

#[derive(Default)]
struct SlotState {
    active: Option<Active>,
    retired: bool,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    /// Mirrors `state.active.is_some()`; written under the slot lock.
    live: AtomicBool,
}

/// Outcome of [`ActiveTable::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquired {
    /// The create closure ran and produced a new subscription.
    Created,
    /// Joined an existing subscription; carries the new refcount.
    Shared(usize),
}

/// Outcome of [`ActiveTable::release`].
pub(crate) enum Released {
    /// No active subscription under this key.
    Missing,
    /// Other subscribers remain; carries the new refcount.
    Remaining(usize),
    /// Last subscriber left; the caller must cancel the handle.
    Last(BoxHandle),
}

/// Canonical key → active subscription table.
#[derive(Default)]
pub(crate) struct ActiveTable {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
    live: AtomicUsize,
}

impl ActiveTable {
    /// Joins the subscription under `key`, or creates it with `create`.
    ///
    /// `create` runs at most once, under the key's lock. If it fails the table is unchanged.
    pub(crate) fn acquire<E>(
        &self,
        key: &str,
        create: impl FnOnce() -> Result<BoxHandle, E>,
    ) -> Result<Acquired, E> {
        loop {
            let slot = self.slot_for(key);
            let mut state = lock(&slot.state);
            if state.retired {
                continue;
            }

            if let Some(active) = state.active.as_mut() {
                active.refcount += 1;
                return Ok(Acquired::Shared(active.refcount));
            }

            return match create() {
                Ok(handle) => {
                    state.active = Some(Active {
                        handle,
                        refcount: 1,
                    });
                    self.mark_live(&slot, true);
                    Ok(Acquired::Created)
                }
                Err(e) => {
                    self.retire(key, &slot, &mut state);
                    Err(e)
                }
            };
        }
    }

    /// Drops one reference to the subscription under `key`.
    pub(crate) fn release(&self, key: &str) -> Released {
        let Some(slot) = self.existing(key) else {
            return Released::Missing;
        };
        let mut state = lock(&slot.state);
        if state.retired {
            return Released::Missing;
        }

        let remaining = match state.active.as_mut() {
            None => return Released::Missing,
            Some(active) => {
                active.refcount -= 1;
                active.refcount
            }
        };
        if remaining > 0 {
            return Released::Remaining(remaining);
        }

        match state.active.take() {
            Some(active) => {
                self.mark_live(&slot, false);
                self.retire(key, &slot, &mut state);
                Released::Last(active.handle)
            }
            None => Released::Missing,
        }
    }

    /// Removes every active subscription regardless of refcount.
    pub(crate) fn drain(&self) -> Vec<(String, BoxHandle)> {
        let slots: Vec<(String, Arc<Slot>)> = lock(&self.slots).drain().collect();
        let mut handles = Vec::with_capacity(slots.len());
        for (key, slot) in slots {
            let mut state = lock(&slot.state);
            state.retired = true;
            if let Some(active) = state.active.take() {
                self.mark_live(&slot, false);
                handles.push((key, active.handle));
            }
        }
        handles
    }

    /// Refcount of the subscription under `key`, if active.
    pub(crate) fn refcount(&self, key: &str) -> Option<usize> {
        let slot = self.existing(key)?;
        if !slot.live.load(Ordering::Acquire) {
            return None;
        }
        let state = lock(&slot.state);
        state.active.as_ref().map(|a| a.refcount)
    }

    /// Sorted canonical keys of active subscriptions.
    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.slots)
            .iter()
            .filter(|(_, slot)| slot.live.load(Ordering::Acquire))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Number of active subscriptions.
    pub(crate) fn len(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    fn mark_live(&self, slot: &Slot, live: bool) {
        if slot.live.swap(live, Ordering::AcqRel) != live {
            if live {
                self.live.fetch_add(1, Ordering::AcqRel);
            } else {
                self.live.fetch_sub(1, Ordering::AcqRel);
            }
        }
    }

    fn slot_for(&self, key: &str) -> Arc<Slot> {
        let mut slots = lock(&self.slots);
        Arc::clone(slots.entry(key.to_owned()).or_default())
    }

    fn existing(&self, key: &str) -> Option<Arc<Slot>> {
        lock(&self.slots).get(key).cloned()
    }

    /// Marks `slot` dead and unlinks it if it is still the current slot for `key`.
    ///
    /// Called with the slot lock held.
    fn retire(&self, key: &str, slot: &Arc<Slot>, state: &mut SlotState) {
        state.retired = true;
        let mut slots = lock(&self.slots);
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{FnHandle, SubscriptionHandle};
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop() -> Result<BoxHandle, ()> {
        Ok(FnHandle::boxed(|| {}))
    }

    #[test]
    fn first_acquire_creates_then_shares() {
        let table = ActiveTable::default();
        assert_eq!(table.acquire("k", noop), Ok(Acquired::Created));
        assert_eq!(table.acquire("k", noop), Ok(Acquired::Shared(2)));
        assert_eq!(table.refcount("k"), Some(2));
        assert_eq!(table.keys(), ["k"]);
    }

    #[test]
    fn failed_create_leaves_nothing() {
        let table = ActiveTable::default();
        assert_eq!(table.acquire("k", || Err::<BoxHandle, _>("nope")), Err("nope"));
        assert_eq!(table.refcount("k"), None);
        assert!(table.keys().is_empty());
        assert!(lock(&table.slots).is_empty());
        assert_eq!(table.acquire("k", noop), Ok(Acquired::Created));
    }

    #[test]
    fn release_counts_down_to_last() {
        let table = ActiveTable::default();
        let cancelled = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&cancelled);
        table
            .acquire("k", || {
                Ok::<_, ()>(FnHandle::boxed(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                }))
            })
            .unwrap();
        table.acquire("k", noop).unwrap();

        assert!(matches!(table.release("k"), Released::Remaining(1)));
        match table.release("k") {
            Released::Last(handle) => handle.cancel(),
            _ => panic!("expected last reference"),
        }
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert!(matches!(table.release("k"), Released::Missing));
        assert!(lock(&table.slots).is_empty());
    }

    #[test]
    fn release_unknown_is_missing() {
        let table = ActiveTable::default();
        assert!(matches!(table.release("ghost"), Released::Missing));
    }

    #[test]
    fn drain_takes_everything() {
        let table = ActiveTable::default();
        table.acquire("a", noop).unwrap();
        table.acquire("b", noop).unwrap();
        table.acquire("b", noop).unwrap();
        let mut drained: Vec<String> = table.drain().into_iter().map(|(k, _)| k).collect();
        drained.sort();
        assert_eq!(drained, ["a", "b"]);
        assert!(table.keys().is_empty());
        assert!(matches!(table.release("b"), Released::Missing));
    }

    #[test]
    fn concurrent_acquire_creates_once() {
        let table = Arc::new(ActiveTable::default());
        let created = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                let created = Arc::clone(&created);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    table
                        .acquire("shared", || {
                            created.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(5));
                            noop()
                        })
                        .unwrap()
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(table.refcount("shared"), Some(8));
    }

    #[test]
    fn slow_create_does_not_block_other_keys() {
        let table = Arc::new(ActiveTable::default());
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let slow = {
            let table = Arc::clone(&table);
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            std::thread::spawn(move || {
                table
                    .acquire("slow", || {
                        entered.wait();
                        release.wait();
                        noop()
                    })
                    .unwrap()
            })
        };

        entered.wait();
        // "slow" is mid-create and holds its own lock; another key goes through.
        assert_eq!(table.acquire("fast", noop), Ok(Acquired::Created));
        assert_eq!(table.refcount("fast"), Some(1));
        release.wait();
        assert_eq!(slow.join().unwrap(), Acquired::Created);
    }

    #[test]
    fn introspection_skips_key_under_setup() {
        let table = Arc::new(ActiveTable::default());
        table.acquire("fast", noop).unwrap();
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let slow = {
            let table = Arc::clone(&table);
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            std::thread::spawn(move || {
                table
                    .acquire("slow", || {
                        entered.wait();
                        release.wait();
                        noop()
                    })
                    .unwrap()
            })
        };

        entered.wait();
        // "slow" holds its slot lock; none of these may wait for it.
        assert_eq!(table.len(), 1);
        assert_eq!(table.keys(), ["fast"]);
        assert_eq!(table.refcount("slow"), None);
        assert_eq!(table.refcount("fast"), Some(1));
        release.wait();
        slow.join().unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.keys(), ["fast", "slow"]);
        assert!(matches!(table.release("slow"), Released::Last(_)));
        assert_eq!(table.len(), 1);
        table.drain();
        assert_eq!(table.len(), 0);
    }
}
