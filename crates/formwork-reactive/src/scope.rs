#![forbid(unsafe_code)]

//! Lifetime management for groups of subscriptions.
//!
//! A [`SubscriptionScope`] collects [`Subscription`]s for one logical owner
//! (a mounted derived store, a UI component). Dropping or clearing the scope
//! releases all of them, cleanly detaching the owner from the graph.
//!
//! # Invariants
//!
//! 1. Subscriptions are released in reverse registration order.
//! 2. After `clear()` or drop, no callback from this scope fires again.
//! 3. A cleared scope is reusable.
//! 4. `len()` always matches the number of held subscriptions.

use std::fmt;

use crate::store::{Store, Subscription};

#[derive(Default)]
pub struct SubscriptionScope {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `sub` alive until the scope is cleared or dropped.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to `store` for the lifetime of this scope.
    pub fn subscribe<S: Clone + 'static>(
        &mut self,
        store: &Store<S>,
        callback: impl Fn(&S) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(store.subscribe(callback));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release everything now; the scope stays usable.
    pub fn clear(&mut self) {
        while let Some(sub) = self.subscriptions.pop() {
            drop(sub);
        }
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for SubscriptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionScope")
            .field("len", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn subscribed_callbacks_fire_while_held() {
        let first = Store::new(0);
        let second = Store::new(String::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut scope = SubscriptionScope::new();
        let (l1, l2) = (Rc::clone(&log), Rc::clone(&log));
        scope
            .subscribe(&first, move |v| l1.borrow_mut().push(v.to_string()))
            .subscribe(&second, move |v| l2.borrow_mut().push(v.clone()));
        assert_eq!(scope.len(), 2);

        first.set(7);
        second.set("x".into());
        assert_eq!(*log.borrow(), vec!["7".to_string(), "x".to_string()]);
    }

    #[test]
    fn drop_releases_subscriptions() {
        let store = Store::new(0);
        let seen = Rc::new(Cell::new(0));
        let mut scope = SubscriptionScope::new();
        let s = Rc::clone(&seen);
        scope.subscribe(&store, move |v| s.set(*v));
        store.set(1);
        drop(scope);

        store.set(99);
        assert_eq!(seen.get(), 1, "callback must not fire after drop");
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn clear_is_reusable() {
        let store = Store::new(0);
        let mut scope = SubscriptionScope::new();

        let first = Rc::new(Cell::new(false));
        let f = Rc::clone(&first);
        scope.subscribe(&store, move |_| f.set(true));
        scope.clear();
        assert!(scope.is_empty());

        let second = Rc::new(Cell::new(false));
        let s = Rc::clone(&second);
        scope.subscribe(&store, move |_| s.set(true));

        store.set(1);
        assert!(!first.get());
        assert!(second.get());
    }

    #[test]
    fn release_order_is_reversed() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scope = SubscriptionScope::new();
        for i in 0..3 {
            let log = Rc::clone(&log);
            scope.hold(Subscription::new(move || log.borrow_mut().push(i)));
        }
        drop(scope);
        assert_eq!(*log.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn debug_reports_len() {
        let store = Store::new(0);
        let mut scope = SubscriptionScope::new();
        scope.subscribe(&store, |_| {}).subscribe(&store, |_| {});
        assert!(format!("{scope:?}").contains("len: 2"));
    }
}
