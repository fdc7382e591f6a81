#![forbid(unsafe_code)]

//! Batched notification delivery.
//!
//! A batch is a dynamic scope during which store writes apply immediately
//! but their notifications are held back. When the outermost batch closes,
//! pending work is flushed:
//!
//! 1. every store written in the batch notifies its subscribers once, in
//!    the order the stores were first written;
//! 2. every derived node those notifications marked dirty recomputes once,
//!    lowest rank (closest to the stores) first.
//!
//! Writes made by subscribers during a flush join the same flush. A single
//! `set_state` outside any batch runs as a one-write batch, so the same rules
//! apply everywhere.
//!
//! # Threading
//!
//! The depth counter and pending queues are thread-local and every reactive
//! handle is `!Send`, so a batch cannot span threads. Sharing form state
//! across threads needs an outer transactional boundary (for example, a
//! channel into the owning thread).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Update cycle | Subscribers keep writing stores | Flush abandoned after 100 rounds, `warn!` |
//! | Panic inside a batch | Caller or subscriber panics | Pending work discarded while unwinding |

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::{trace, trace_span, warn};

/// Upper bound on store-notification rounds in one flush.
const MAX_FLUSH_ROUNDS: usize = 100;

pub(crate) type Task = Rc<dyn Fn()>;

thread_local! {
    static CONTEXT: RefCell<BatchContext> = RefCell::new(BatchContext::default());
}

#[derive(Default)]
struct BatchContext {
    depth: usize,
    flushing: bool,
    pending_stores: Vec<(u64, Task)>,
    pending_nodes: Vec<QueuedNode>,
    next_seq: u64,
}

struct QueuedNode {
    node: u64,
    rank: u32,
    seq: u64,
    task: Task,
}

impl BatchContext {
    fn pop_node(&mut self) -> Option<Task> {
        let (pos, _) = self
            .pending_nodes
            .iter()
            .enumerate()
            .min_by_key(|(_, node)| (node.rank, node.seq))?;
        Some(self.pending_nodes.swap_remove(pos).task)
    }

    fn discard(&mut self) {
        self.pending_stores.clear();
        self.pending_nodes.clear();
    }
}

/// RAII guard that opens a batch for its lifetime.
///
/// Nested scopes flatten into the outermost one; the flush happens when the
/// last scope drops.
///
/// # Example
///
/// ```
/// use formwork_reactive::{BatchScope, Store};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let store = Store::new(0);
/// let hits = Rc::new(Cell::new(0));
/// let h = Rc::clone(&hits);
/// let _sub = store.subscribe(move |_| h.set(h.get() + 1));
///
/// {
///     let _scope = BatchScope::new();
///     store.set(1);
///     store.set(2);
///     assert_eq!(hits.get(), 0);
/// }
/// assert_eq!(hits.get(), 1);
/// ```
#[must_use = "dropping a BatchScope closes the batch immediately"]
pub struct BatchScope {
    _not_send: PhantomData<Rc<()>>,
}

impl BatchScope {
    pub fn new() -> Self {
        CONTEXT.with(|ctx| ctx.borrow_mut().depth += 1);
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let should_flush = CONTEXT.with(|ctx| {
            let mut ctx = ctx.borrow_mut();
            ctx.depth -= 1;
            ctx.depth == 0 && !ctx.flushing
        });
        if !should_flush {
            return;
        }
        if std::thread::panicking() {
            CONTEXT.with(|ctx| ctx.borrow_mut().discard());
            return;
        }
        flush();
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("depth", &batch_depth())
            .finish()
    }
}

/// Run `f` inside a batch and return its result.
///
/// Notifications from every store written inside `f` are delivered once,
/// after the outermost batch returns.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _scope = BatchScope::new();
    f()
}

/// Whether a batch is currently open on this thread.
#[must_use]
pub fn is_batching() -> bool {
    batch_depth() > 0
}

/// Current batch nesting depth on this thread.
#[must_use]
pub fn batch_depth() -> usize {
    CONTEXT.with(|ctx| ctx.borrow().depth)
}

/// Queue a store notification. Repeated writes to one store coalesce.
pub(crate) fn schedule_notify(store: u64, notify: Task) {
    let _scope = BatchScope::new();
    CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        if !ctx.pending_stores.iter().any(|(id, _)| *id == store) {
            ctx.pending_stores.push((store, notify));
        }
    });
}

/// Queue a derived-node recomputation. A node already queued is not queued
/// twice.
pub(crate) fn schedule_recompute(node: u64, rank: u32, task: Task) {
    let _scope = BatchScope::new();
    CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        if ctx.pending_nodes.iter().any(|queued| queued.node == node) {
            return;
        }
        let seq = ctx.next_seq;
        ctx.next_seq += 1;
        ctx.pending_nodes.push(QueuedNode {
            node,
            rank,
            seq,
            task,
        });
    });
}

struct FlushGuard;

impl FlushGuard {
    fn enter() -> Self {
        CONTEXT.with(|ctx| ctx.borrow_mut().flushing = true);
        Self
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        CONTEXT.with(|ctx| {
            let mut ctx = ctx.borrow_mut();
            ctx.flushing = false;
            if std::thread::panicking() {
                ctx.discard();
            }
        });
    }
}

fn flush() {
    let _span = trace_span!("batch_flush").entered();
    let _guard = FlushGuard::enter();
    let mut rounds = 0usize;

    loop {
        let stores = CONTEXT.with(|ctx| std::mem::take(&mut ctx.borrow_mut().pending_stores));
        if !stores.is_empty() {
            rounds += 1;
            if rounds > MAX_FLUSH_ROUNDS {
                warn!(
                    rounds,
                    "batch flush did not settle; dropping pending notifications"
                );
                CONTEXT.with(|ctx| ctx.borrow_mut().discard());
                return;
            }
            trace!(round = rounds, stores = stores.len(), "flushing stores");
            for (_, notify) in stores {
                notify();
            }
            continue;
        }

        let Some(task) = CONTEXT.with(|ctx| ctx.borrow_mut().pop_node()) else {
            break;
        };
        task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use std::cell::Cell;

    fn counter(store: &Store<i32>) -> (Rc<Cell<usize>>, crate::Subscription) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = store.subscribe(move |_| h.set(h.get() + 1));
        (hits, sub)
    }

    #[test]
    fn depth_tracks_nesting() {
        assert_eq!(batch_depth(), 0);
        batch(|| {
            assert_eq!(batch_depth(), 1);
            batch(|| assert_eq!(batch_depth(), 2));
            assert!(is_batching());
        });
        assert!(!is_batching());
    }

    #[test]
    fn batch_returns_closure_result() {
        assert_eq!(batch(|| 40 + 2), 42);
    }

    #[test]
    fn notifications_deferred_until_outermost_close() {
        let store = Store::new(0);
        let (hits, _sub) = counter(&store);

        batch(|| {
            store.set(1);
            batch(|| store.set(2));
            assert_eq!(hits.get(), 0, "inner batch must not flush");
        });
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn each_store_notifies_once_in_first_write_order() {
        let a = Store::new(0);
        let b = Store::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let la = Rc::clone(&log);
        let lb = Rc::clone(&log);
        let _sa = a.subscribe(move |v| la.borrow_mut().push(("a", *v)));
        let _sb = b.subscribe(move |v| lb.borrow_mut().push(("b", *v)));

        batch(|| {
            b.set(1);
            a.set(1);
            b.set(2);
            a.set(3);
        });
        assert_eq!(*log.borrow(), vec![("b", 2), ("a", 3)]);
    }

    #[test]
    fn scope_guard_flushes_on_drop() {
        let store = Store::new(0);
        let (hits, _sub) = counter(&store);
        let scope = BatchScope::new();
        store.set(5);
        assert_eq!(hits.get(), 0);
        drop(scope);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn batch_opened_by_subscriber_joins_flush() {
        let source = Store::new(0);
        let target = Store::new(0);
        let (hits, _sub) = counter(&target);
        let t = target.clone();
        let _forward = source.subscribe(move |v| {
            let v = *v;
            batch(|| {
                t.set(v);
                t.set(v * 2);
            });
        });

        source.set(4);
        assert_eq!(target.get(), 8);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn runaway_cycle_is_cut_off() {
        let store = Store::new(0);
        let writer = store.clone();
        let _sub = store.subscribe(move |v| writer.set(v + 1));

        store.set(1);
        assert!(store.get() > MAX_FLUSH_ROUNDS as i32 - 1);
        assert!(!is_batching());

        // The scheduler recovers for later writes.
        let other = Store::new(0);
        let (hits, _other_sub) = counter(&other);
        other.set(1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn panic_inside_batch_resets_state() {
        let store = Store::new(0);
        let (hits, _sub) = counter(&store);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            batch(|| {
                store.set(1);
                panic!("boom");
            })
        }));
        assert!(result.is_err());
        assert_eq!(batch_depth(), 0);
        assert_eq!(hits.get(), 0, "pending work is discarded");

        store.set(2);
        assert_eq!(hits.get(), 1);
    }
}
