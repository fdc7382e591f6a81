#![forbid(unsafe_code)]

//! Dependency plumbing for [`Derived`](crate::Derived).
//!
//! A [`Source`] is anything a derived store can depend on: a
//! [`Store`](crate::Store) or another `Derived`. [`Dependencies`] groups
//! sources so a derived computation can read all of their values at once;
//! it is implemented for tuples of up to four sources and for `Vec<S>`.

use std::rc::Rc;

use crate::scope::SubscriptionScope;

/// A readable, versioned, observable value.
pub trait Source: 'static {
    type Value: Clone + 'static;

    /// Clone of the current value.
    fn snapshot(&self) -> Self::Value;

    /// Monotonic change counter.
    fn version(&self) -> u64;

    /// Distance from the nearest mutable store (stores are rank 0).
    fn rank(&self) -> u32;

    /// Call `on_change` after each change, for as long as `scope` holds the
    /// registration.
    fn watch(&self, on_change: &Rc<dyn Fn()>, scope: &mut SubscriptionScope);
}

/// A fixed set of sources read together.
pub trait Dependencies: 'static {
    type Values: 'static;

    fn snapshot(&self) -> Self::Values;

    fn versions(&self) -> Vec<u64>;

    /// Highest rank among the sources.
    fn rank(&self) -> u32;

    fn watch(&self, on_change: &Rc<dyn Fn()>, scope: &mut SubscriptionScope);
}

macro_rules! impl_dependencies_for_tuple {
    ($($source:ident . $idx:tt),+) => {
        impl<$($source: Source),+> Dependencies for ($($source,)+) {
            type Values = ($(<$source as Source>::Value,)+);

            fn snapshot(&self) -> Self::Values {
                ($(self.$idx.snapshot(),)+)
            }

            fn versions(&self) -> Vec<u64> {
                vec![$(self.$idx.version()),+]
            }

            fn rank(&self) -> u32 {
                [$(self.$idx.rank()),+].into_iter().max().unwrap_or(0)
            }

            fn watch(&self, on_change: &Rc<dyn Fn()>, scope: &mut SubscriptionScope) {
                $(self.$idx.watch(on_change, scope);)+
            }
        }
    };
}

impl_dependencies_for_tuple!(A.0);
impl_dependencies_for_tuple!(A.0, B.1);
impl_dependencies_for_tuple!(A.0, B.1, C.2);
impl_dependencies_for_tuple!(A.0, B.1, C.2, D.3);

impl<S: Source> Dependencies for Vec<S> {
    type Values = Vec<S::Value>;

    fn snapshot(&self) -> Self::Values {
        self.iter().map(Source::snapshot).collect()
    }

    fn versions(&self) -> Vec<u64> {
        self.iter().map(Source::version).collect()
    }

    fn rank(&self) -> u32 {
        self.iter().map(Source::rank).max().unwrap_or(0)
    }

    fn watch(&self, on_change: &Rc<dyn Fn()>, scope: &mut SubscriptionScope) {
        for source in self {
            source.watch(on_change, scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn tuple_snapshot_and_versions() {
        let a = Store::new(1);
        let b = Store::new("x");
        let deps = (a.clone(), b.clone());
        assert_eq!(Dependencies::snapshot(&deps), (1, "x"));

        a.set(2);
        assert_eq!(Dependencies::versions(&deps), vec![1, 0]);
        assert_eq!(Dependencies::rank(&deps), 0);
    }

    #[test]
    fn vec_watch_registers_each_source() {
        let stores = vec![Store::new(0), Store::new(0), Store::new(0)];
        let mut scope = SubscriptionScope::new();
        let on_change: Rc<dyn Fn()> = Rc::new(|| {});
        Dependencies::watch(&stores, &on_change, &mut scope);
        assert_eq!(scope.len(), 3);
        assert!(stores.iter().all(|s| s.subscriber_count() == 1));
    }
}
