#![forbid(unsafe_code)]

//! Derived stores: read-only values computed from other stores.
//!
//! A [`Derived`] is a graph node holding a cached value, a
//! snapshot of its dependencies' versions and, while mounted, a
//! [`SubscriptionScope`] of upstream subscriptions.
//!
//! # Lifecycle
//!
//! - **Construction** computes the value once, eagerly, with no previous
//!   dependency values and no previous value. [`Derived::state`] is valid
//!   from then on.
//! - **Mount** ([`Derived::mount`]) subscribes to every dependency. If a
//!   dependency changed since the last computation, the node recomputes
//!   immediately. Mounts are counted.
//! - **Unmount** ([`MountGuard::unmount`], or dropping the guard) releases
//!   one mount. When the last mount is released the upstream subscriptions
//!   are dropped and the cached value freezes.
//!
//! # Invariants
//!
//! 1. While mounted, the node recomputes exactly once per flush in which
//!    any dependency changed, however many dependencies changed and however
//!    often.
//! 2. Each recomputation sees the previous and current dependency values
//!    and the previous derived value, then notifies subscribers once.
//! 3. While unmounted, nothing recomputes.
//! 4. Releasing the same guard twice is a no-op.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::batch;
use crate::scope::SubscriptionScope;
use crate::source::{Dependencies, Source};
use crate::store::{Subscribers, Subscription, next_node_id};

/// Arguments passed to a derived computation.
#[derive(Debug)]
pub struct DerivedInput<'a, V, T> {
    /// Dependency values at the previous computation (`None` the first time).
    pub prev_deps: Option<&'a V>,
    /// Dependency values now.
    pub curr_deps: &'a V,
    /// The previously computed value (`None` the first time).
    pub prev_value: Option<&'a T>,
}

trait Engine<T> {
    fn compute(&mut self, prev_value: Option<&T>) -> T;
    fn is_stale(&self) -> bool;
    fn watch(&self, on_change: &Rc<dyn Fn()>, scope: &mut SubscriptionScope);
}

struct DerivedEngine<D: Dependencies, F> {
    deps: D,
    compute: F,
    prev_deps: Option<D::Values>,
    seen_versions: Vec<u64>,
}

impl<D, T, F> Engine<T> for DerivedEngine<D, F>
where
    D: Dependencies,
    F: FnMut(DerivedInput<'_, D::Values, T>) -> T,
{
    fn compute(&mut self, prev_value: Option<&T>) -> T {
        let curr = self.deps.snapshot();
        let next = (self.compute)(DerivedInput {
            prev_deps: self.prev_deps.as_ref(),
            curr_deps: &curr,
            prev_value,
        });
        self.seen_versions = self.deps.versions();
        self.prev_deps = Some(curr);
        next
    }

    fn is_stale(&self) -> bool {
        self.deps.versions() != self.seen_versions
    }

    fn watch(&self, on_change: &Rc<dyn Fn()>, scope: &mut SubscriptionScope) {
        self.deps.watch(on_change, scope);
    }
}

struct DerivedNode<T> {
    id: u64,
    rank: u32,
    value: RefCell<T>,
    version: Cell<u64>,
    mounts: Cell<usize>,
    upstream: RefCell<SubscriptionScope>,
    subscribers: Rc<Subscribers<T>>,
    engine: RefCell<Box<dyn Engine<T>>>,
}

impl<T: Clone + 'static> DerivedNode<T> {
    /// Queue one recomputation for the current flush.
    fn schedule(self: &Rc<Self>) {
        if self.mounts.get() == 0 {
            return;
        }
        let weak = Rc::downgrade(self);
        batch::schedule_recompute(
            self.id,
            self.rank,
            Rc::new(move || {
                if let Some(node) = weak.upgrade() {
                    node.run_scheduled();
                }
            }),
        );
    }

    fn run_scheduled(&self) {
        // Unmounted since it was queued.
        if self.mounts.get() > 0 {
            self.recompute();
        }
    }

    fn recompute(&self) {
        let next = {
            let prev = self.value.borrow();
            self.engine.borrow_mut().compute(Some(&*prev))
        };
        *self.value.borrow_mut() = next;

        let version = self.version.get() + 1;
        self.version.set(version);
        debug!(derived = self.id, version, "derived recomputed");

        let snapshot = self.value.borrow().clone();
        self.subscribers.notify(&snapshot);
    }

    fn release_mount(&self) {
        let mounts = self.mounts.get().saturating_sub(1);
        self.mounts.set(mounts);
        if mounts > 0 {
            return;
        }
        let released = std::mem::take(&mut *self.upstream.borrow_mut());
        drop(released);
        debug!(derived = self.id, "derived unmounted");
    }
}

/// A read-only store recomputed from its dependencies.
///
/// # Example
///
/// ```
/// use formwork_reactive::{Derived, Store, batch};
///
/// let width = Store::new(2);
/// let height = Store::new(3);
/// let area = Derived::new((width.clone(), height.clone()), |input| {
///     let (w, h) = input.curr_deps;
///     w * h
/// });
/// assert_eq!(area.state(), 6);
///
/// let guard = area.mount();
/// batch(|| {
///     width.set(4);
///     height.set(5);
/// });
/// assert_eq!(area.state(), 20);
///
/// guard.unmount();
/// width.set(10);
/// assert_eq!(area.state(), 20, "unmounted nodes do not recompute");
/// ```
pub struct Derived<T> {
    node: Rc<DerivedNode<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Clone + 'static> Derived<T> {
    /// Build a derived store over `deps`, computing the first value now.
    pub fn new<D, F>(deps: D, compute: F) -> Self
    where
        D: Dependencies,
        F: FnMut(DerivedInput<'_, D::Values, T>) -> T + 'static,
    {
        let rank = deps.rank() + 1;
        let mut engine = DerivedEngine {
            deps,
            compute,
            prev_deps: None,
            seen_versions: Vec::new(),
        };
        let value: T = engine.compute(None);
        let id = next_node_id();
        debug!(derived = id, rank, "derived created");

        Self {
            node: Rc::new(DerivedNode {
                id,
                rank,
                value: RefCell::new(value),
                version: Cell::new(0),
                mounts: Cell::new(0),
                upstream: RefCell::new(SubscriptionScope::new()),
                subscribers: Subscribers::new(),
                engine: RefCell::new(Box::new(engine)),
            }),
        }
    }

    /// The last computed value.
    #[must_use]
    pub fn state(&self) -> T {
        self.node.value.borrow().clone()
    }

    /// Borrow the last computed value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.node.value.borrow())
    }

    /// Number of recomputations since construction.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.node.version.get()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.node.mounts.get() > 0
    }

    /// Register `callback` to run after each recomputation.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.node.subscribers.add(callback)
    }

    /// Start tracking dependencies. Tracking stops when every returned
    /// guard has been released.
    pub fn mount(&self) -> MountGuard {
        let node = &self.node;
        let mounts = node.mounts.get();
        node.mounts.set(mounts + 1);

        if mounts == 0 {
            let weak = Rc::downgrade(node);
            let on_change: Rc<dyn Fn()> = Rc::new(move || {
                if let Some(node) = weak.upgrade() {
                    node.schedule();
                }
            });
            node.engine
                .borrow()
                .watch(&on_change, &mut node.upstream.borrow_mut());
            debug!(derived = node.id, "derived mounted");

            let stale = node.engine.borrow().is_stale();
            if stale {
                node.recompute();
            }
        }

        let weak = Rc::downgrade(node);
        MountGuard::new(move || {
            if let Some(node) = weak.upgrade() {
                node.release_mount();
            }
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.node.id)
            .field("rank", &self.node.rank)
            .field("state", &*self.node.value.borrow())
            .field("version", &self.node.version.get())
            .field("mounts", &self.node.mounts.get())
            .finish()
    }
}

impl<T: Clone + 'static> Source for Derived<T> {
    type Value = T;

    fn snapshot(&self) -> T {
        self.state()
    }

    fn version(&self) -> u64 {
        self.node.version.get()
    }

    fn rank(&self) -> u32 {
        self.node.rank
    }

    /// Watching a derived store also keeps it mounted.
    fn watch(&self, on_change: &Rc<dyn Fn()>, scope: &mut SubscriptionScope) {
        let guard = self.mount();
        scope.hold(Subscription::new(move || guard.unmount()));
        let on_change = Rc::clone(on_change);
        scope.hold(self.subscribe(move |_| on_change()));
    }
}

/// RAII handle for one [`Derived::mount`]. Dropping it unmounts.
#[must_use = "dropping a MountGuard unmounts immediately"]
pub struct MountGuard {
    release: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl MountGuard {
    pub(crate) fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: RefCell::new(Some(Box::new(release))),
        }
    }

    /// Release this mount. Calling it again is a no-op.
    pub fn unmount(&self) {
        let release = self.release.borrow_mut().take();
        if let Some(release) = release {
            release();
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.release.borrow().is_none()
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl fmt::Debug for MountGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountGuard")
            .field("released", &self.is_released())
            .finish()
    }
}
