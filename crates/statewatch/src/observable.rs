#![forbid(unsafe_code)]

//! Single-threaded observable value with closure subscribers.
//!
//! # Design
//!
//! [`Observable<T>`] is the local counterpart of [`Subject`]: shared,
//! reference-counted storage (`Rc<RefCell<..>>`) holding a value, a version
//! counter, and a list of weakly held closure subscribers. Where `Subject`
//! notifies on every `set`, `Observable` is change-driven: a mutation that
//! leaves the value equal (by `PartialEq`) is a no-op, with no version bump
//! and no delivery.
//!
//! Subscriptions are RAII: [`Observable::subscribe`] hands back a
//! [`Subscription`] guard owning the strong callback reference, and the
//! observable keeps only a `Weak`. Dropping the guard unsubscribes; the
//! dead entry is pruned lazily on the next delivery or eagerly via
//! [`Observable::prune_expired`].
//!
//! # Failure Modes
//!
//! - **Mutation inside a borrow**: the closures passed to `with` and
//!   `update` run while the cell is borrowed; calling `set`, `update`, or
//!   `subscribe` from inside them panics (`RefCell` borrow rules).
//!   Subscriber callbacks are different: the borrow is released before
//!   delivery, so a callback may read or mutate the cell freely.
//! - **Leaked guards**: a `Subscription` stored forever keeps its callback
//!   alive forever; there is no other strong reference to it.
//!
//! [`Subject`]: crate::subject::Subject

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

/// Interior shared between all handles to one observable.
struct ObservableState<T> {
    value: T,
    version: u64,
    /// Weak entries in subscription order; dead entries are pruned during
    /// delivery.
    subscribers: Vec<CallbackWeak<T>>,
}

/// A shared, version-tracked value with change-only notification.
///
/// Cloning an `Observable` creates a new handle to the **same** inner
/// state: both handles see the same value and share subscribers.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Subscribers are notified in subscription order.
/// 4. A dropped [`Subscription`] is never called again.
pub struct Observable<T> {
    state: Rc<RefCell<ObservableState<T>>>,
}

// Manual Clone: shares the same interior, no bound on T.
impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Observable")
            .field("value", &state.value)
            .field("version", &state.version)
            .field("subscriber_count", &state.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable with the given initial value, version 0,
    /// and no subscribers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            state: Rc::new(RefCell::new(ObservableState {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.state.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.borrow().value)
    }

    /// Set a new value. If it differs from the current value (by
    /// `PartialEq`), the version is incremented and live subscribers are
    /// notified in subscription order.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a `with` or `update` closure.
    pub fn set(&self, value: T) {
        {
            let mut state = self.state.borrow_mut();
            if state.value == value {
                return;
            }
            state.value = value;
            state.version += 1;
        }
        self.deliver();
    }

    /// Modify the value in place. If the result differs from the previous
    /// value, the version is incremented and subscribers are notified.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a `with` or `update` closure.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed = {
            let mut state = self.state.borrow_mut();
            let previous = state.value.clone();
            f(&mut state.value);
            if state.value != previous {
                state.version += 1;
                true
            } else {
                false
            }
        };
        if changed {
            self.deliver();
        }
    }

    /// Subscribe to value changes. The callback runs with a reference to
    /// the new value after each change.
    ///
    /// The observable holds the callback weakly; the returned
    /// [`Subscription`] guard owns it. Dropping the guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.state
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        // `Rc<dyn Fn(&T)>` cannot coerce to `Rc<dyn Any>` directly, so the
        // guard boxes the strong handle behind `dyn Any` to erase `T`.
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Subscribe and additionally invoke the callback once, immediately,
    /// with the current value.
    ///
    /// This is the pull-style entry point: a new subscriber reads the
    /// present state without waiting for the next change.
    pub fn subscribe_with_current(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let subscription = self.subscribe(callback);
        let value = self.get();
        // Release the borrow before invoking, same as regular delivery.
        let callback = {
            let state = self.state.borrow();
            state.subscribers.last().and_then(|entry| entry.upgrade())
        };
        if let Some(callback) = callback {
            callback(&value);
        }
        subscription
    }

    /// Current version number. Increments by 1 on each value-changing
    /// mutation; useful for dirty-checking.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    /// Subscriber list length, counting dead entries not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }

    /// Compact the subscriber list, dropping dead entries, without waiting
    /// for the next delivery. Preserves the relative order of survivors.
    pub fn prune_expired(&self) {
        self.state
            .borrow_mut()
            .subscribers
            .retain(|entry| entry.strong_count() > 0);
    }

    /// Prune dead entries, then call every live subscriber with the
    /// current value. The borrow is released before callbacks run so they
    /// may read (`get`/`with`) freely.
    fn deliver(&self) {
        let callbacks: Vec<CallbackRc<T>> = {
            let mut state = self.state.borrow_mut();
            state.subscribers.retain(|entry| entry.strong_count() > 0);
            state
                .subscribers
                .iter()
                .filter_map(|entry| entry.upgrade())
                .collect()
        };
        let value = self.state.borrow().value.clone();
        for callback in &callbacks {
            callback(&value);
        }
    }
}

/// RAII guard for one subscriber callback.
///
/// Dropping the guard drops the only strong reference to the callback, so
/// the observable's weak entry stops upgrading and the callback is never
/// invoked again.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
