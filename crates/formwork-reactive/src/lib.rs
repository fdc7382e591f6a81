#![forbid(unsafe_code)]

//! Reactive primitives for formwork.
//!
//! - [`Store`]: a shared, version-tracked mutable value with change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Derived`]: a read-only value recomputed from stores (or other derived
//!   values) while mounted.
//! - [`batch`] / [`BatchScope`]: defer and coalesce notifications until the
//!   outermost batch closes.
//! - [`SubscriptionScope`]: owns a group of subscriptions.
//!
//! # Architecture
//!
//! Handles are `Rc`-based and single-threaded. Subscribers are held as
//! `Weak` callbacks and cleaned up lazily during notification. A derived node
//! keeps its upstream subscriptions in a [`SubscriptionScope`] that exists
//! only while the node is mounted, so dependents never keep their
//! dependencies alive and unmounted nodes cost nothing on writes.
//!
//! Every write goes through the thread-local batch context. Store
//! notifications are flushed first, then dirty derived nodes recompute in
//! rank order (distance from the nearest store), which keeps diamond-shaped
//! graphs glitch-free.
//!
//! # Invariants
//!
//! 1. Every write bumps the store version by one and is visible to reads
//!    immediately, even mid-batch.
//! 2. Subscribers are notified in registration order, once per flush.
//! 3. A mounted derived node recomputes at most once per flush.
//! 4. An unmounted derived node never recomputes.
//! 5. Dropping a [`Subscription`] or [`MountGuard`] detaches before the next
//!    notification cycle.

pub mod batch;
pub mod derived;
pub mod scope;
pub mod source;
pub mod store;

pub use batch::{BatchScope, batch, batch_depth, is_batching};
pub use derived::{Derived, DerivedInput, MountGuard};
pub use scope::SubscriptionScope;
pub use source::{Dependencies, Source};
pub use store::{Store, Subscription};
