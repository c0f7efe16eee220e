//! One-shot promise/future pair used for frame and decode results.
//!
//! A [`Promise`] is fulfilled at most once from any thread; the matching [`Deferred`] can be
//! polled without blocking ([`Deferred::is_ready`]) or waited on. Dropping an unfulfilled
//! promise resolves the deferred as abandoned, so waiters never hang on a producer that went
//! away.

use std::{sync::Arc, time::Duration};

use parking_lot::{Condvar, Mutex};

enum Slot<T> {
    Pending,
    Ready(T),
    Abandoned,
    Taken,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    cv: Condvar,
}

/// Producer half of a one-shot value.
pub struct Promise<T> {
    shared: Option<Arc<Shared<T>>>,
}

/// Consumer half of a one-shot value.
pub struct Deferred<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    /// Create a connected promise/deferred pair.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Promise<T>, Deferred<T>) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::Pending),
            cv: Condvar::new(),
        });
        (
            Promise {
                shared: Some(Arc::clone(&shared)),
            },
            Deferred { shared },
        )
    }

    /// Resolve the deferred with `value` and wake every waiter.
    pub fn fulfill(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            *shared.slot.lock() = Slot::Ready(value);
            shared.cv.notify_all();
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            {
                let mut slot = shared.slot.lock();
                if matches!(*slot, Slot::Pending) {
                    *slot = Slot::Abandoned;
                }
            }
            shared.cv.notify_all();
        }
    }
}

impl<T> Deferred<T> {
    /// A deferred that is already resolved with `value`.
    pub fn ready(value: T) -> Self {
        let (promise, deferred) = Promise::new();
        promise.fulfill(value);
        deferred
    }

    /// Non-blocking readiness check (fulfilled or abandoned).
    pub fn is_ready(&self) -> bool {
        !matches!(*self.shared.slot.lock(), Slot::Pending)
    }

    /// Block up to `timeout` for the value; returns readiness.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut slot = self.shared.slot.lock();
        if matches!(*slot, Slot::Pending) {
            let _ = self
                .shared
                .cv
                .wait_while_for(&mut slot, |s| matches!(s, Slot::Pending), timeout);
        }
        !matches!(*slot, Slot::Pending)
    }

    /// Block until resolved. `None` when the promise was dropped unfulfilled.
    pub fn wait(self) -> Option<T> {
        let mut slot = self.shared.slot.lock();
        self.shared
            .cv
            .wait_while(&mut slot, |s| matches!(s, Slot::Pending));
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Take the value if already resolved, without blocking.
    ///
    /// Returns `Err(self)` while still pending.
    pub fn try_take(self) -> Result<Option<T>, Self> {
        if self.is_ready() {
            Ok(self.wait())
        } else {
            Err(self)
        }
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/deferred.rs"]
mod tests;
