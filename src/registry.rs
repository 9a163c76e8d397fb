//! Event registry: named listener sets with isolated fan-out.
//!
//! DESIGN
//! ======
//! Each event name maps to an insertion-ordered list of callbacks with set
//! semantics: a callback is identified by its `Arc` allocation, so
//! registering the same handle twice under one name is a no-op. The registry
//! only holds the handles for dispatch; callers keep their own clone to
//! unsubscribe later.
//!
//! Emission snapshots the listener list and releases the lock before calling
//! out, so listeners may subscribe or unsubscribe from inside a callback. A
//! panicking listener is logged and skipped; the rest of the emission runs.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::error;

use crate::event::Notification;

/// Shared listener handle. Clone it to keep a reference for `unsubscribe`.
pub type Callback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Wrap a closure into a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&Notification) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Default)]
pub struct EventRegistry {
    listeners: Mutex<HashMap<String, Vec<Callback>>>,
}

impl EventRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `callback` under `event`. Returns `false` if it was already there.
    pub fn subscribe(&self, event: &str, callback: Callback) -> bool {
        let mut listeners = self.lock();
        let set = listeners.entry(event.to_owned()).or_default();
        if set.iter().any(|existing| Arc::ptr_eq(existing, &callback)) {
            return false;
        }
        set.push(callback);
        true
    }

    /// Remove `callback` from `event`. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, event: &str, callback: &Callback) -> bool {
        let mut listeners = self.lock();
        let Some(set) = listeners.get_mut(event) else {
            return false;
        };
        let before = set.len();
        set.retain(|existing| !Arc::ptr_eq(existing, callback));
        let removed = set.len() != before;
        if set.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    /// Invoke every listener of `event` in insertion order.
    ///
    /// Returns how many listeners completed without panicking.
    pub fn emit(&self, event: &str, notification: &Notification) -> usize {
        let snapshot: Vec<Callback> = match self.lock().get(event) {
            Some(set) => set.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(notification))).is_ok() {
                delivered += 1;
            } else {
                error!(event, "live-update listener panicked; continuing fan-out");
            }
        }
        delivered
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Callback>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.lock();
        let mut events: Vec<(&String, usize)> = listeners.iter().map(|(k, v)| (k, v.len())).collect();
        events.sort();
        f.debug_struct("EventRegistry").field("events", &events).finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
