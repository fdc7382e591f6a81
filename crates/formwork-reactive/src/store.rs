#![forbid(unsafe_code)]

//! Mutable store: a shared, version-tracked value with change notification.
//!
//! # Invariants
//!
//! 1. Every [`Store::set_state`] replaces the whole value and bumps the
//!    version by exactly one. There is no equality short-circuit.
//! 2. Subscribers are notified in registration order with a snapshot of the
//!    value current at delivery time.
//! 3. Outside a batch, notification is synchronous: `set_state` returns only
//!    after every subscriber (and every dependent derived store) has run.
//!    Inside a batch, notification is deferred and coalesced (see
//!    [`batch`](crate::batch::batch)).
//! 4. Dropping a [`Subscription`] removes its callback before the next
//!    notification cycle.
//!
//! # Failure Modes
//!
//! - An updater that calls `set_state` on the store it is updating panics
//!   (`RefCell` double borrow). Updaters must be pure functions of the
//!   previous value.
//! - A subscriber panic propagates to the code that triggered the flush.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::batch;
use crate::scope::SubscriptionScope;
use crate::source::Source;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id for stores and derived nodes (used in logs and for
/// coalescing notifications).
pub(crate) fn next_node_id() -> u64 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

type Callback<T> = dyn Fn(&T);

/// Ordered subscriber list shared by [`Store`] and
/// [`Derived`](crate::Derived).
pub(crate) struct Subscribers<T> {
    entries: RefCell<Vec<(u64, Weak<Callback<T>>)>>,
    next_id: Cell<u64>,
}

impl<T: 'static> Subscribers<T> {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        })
    }

    pub(crate) fn add(self: &Rc<Self>, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.entries
            .borrow_mut()
            .push((id, Rc::downgrade(&callback)));

        let list = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(list) = list.upgrade() {
                list.entries.borrow_mut().retain(|(entry, _)| *entry != id);
            }
            drop(callback);
        })
    }

    pub(crate) fn notify(&self, value: &T) {
        // Collect first so callbacks may subscribe/unsubscribe freely.
        let live: Vec<Rc<Callback<T>>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|(_, callback)| callback.strong_count() > 0);
            entries
                .iter()
                .filter_map(|(_, callback)| callback.upgrade())
                .collect()
        };
        for callback in live {
            callback(value);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(_, callback)| callback.strong_count() > 0)
            .count()
    }
}

/// RAII guard for a subscriber callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Unsubscribe now. Equivalent to dropping the guard.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

struct StoreInner<S> {
    id: u64,
    value: RefCell<S>,
    version: Cell<u64>,
    subscribers: Rc<Subscribers<S>>,
}

impl<S: Clone + 'static> StoreInner<S> {
    fn notify(&self) {
        let snapshot = self.value.borrow().clone();
        trace!(
            store = self.id,
            version = self.version.get(),
            subscribers = self.subscribers.len(),
            "store notify"
        );
        self.subscribers.notify(&snapshot);
    }
}

/// A mutable value cell with batched change notification.
///
/// `Store` is a cheap handle: clones share the same value and subscriber
/// list. It is `!Send`; see [`batch`](crate::batch) for the threading model.
///
/// # Example
///
/// ```
/// use formwork_reactive::Store;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = Store::new(1);
/// let seen = Rc::new(Cell::new(0));
/// let s = Rc::clone(&seen);
/// let _sub = count.subscribe(move |v| s.set(*v));
///
/// count.set_state(|prev| prev + 1);
/// assert_eq!(count.get(), 2);
/// assert_eq!(seen.get(), 2);
/// ```
pub struct Store<S> {
    inner: Rc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Clone + 'static> Store<S> {
    #[must_use]
    pub fn new(value: S) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                id: next_node_id(),
                value: RefCell::new(value),
                version: Cell::new(0),
                subscribers: Subscribers::new(),
            }),
        }
    }

    /// Clone of the current value. Mid-batch writes are already visible.
    #[must_use]
    pub fn get(&self) -> S {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value outright.
    pub fn set(&self, value: S) {
        self.set_state(|_| value);
    }

    /// Replace the value with `updater(previous)` and notify subscribers
    /// (immediately, or when the enclosing batch closes).
    pub fn set_state(&self, updater: impl FnOnce(&S) -> S) {
        let next = {
            let current = self.inner.value.borrow();
            updater(&current)
        };
        *self.inner.value.borrow_mut() = next;

        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);
        trace!(
            store = self.inner.id,
            version,
            deferred = batch::is_batching(),
            "store updated"
        );

        let weak = Rc::downgrade(&self.inner);
        batch::schedule_notify(
            self.inner.id,
            Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.notify();
                }
            }),
        );
    }

    /// Register `callback` to run after each (batched) change.
    pub fn subscribe(&self, callback: impl Fn(&S) + 'static) -> Subscription {
        self.inner.subscribers.add(callback)
    }

    /// Number of `set_state` calls so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl<S: Clone + Default + 'static> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<S: Clone + 'static> Source for Store<S> {
    type Value = S;

    fn snapshot(&self) -> S {
        self.get()
    }

    fn version(&self) -> u64 {
        self.inner.version.get()
    }

    fn rank(&self) -> u32 {
        0
    }

    fn watch(&self, on_change: &Rc<dyn Fn()>, scope: &mut SubscriptionScope) {
        let on_change = Rc::clone(on_change);
        scope.hold(self.subscribe(move |_| on_change()));
    }
}
