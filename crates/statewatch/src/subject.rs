#![forbid(unsafe_code)]

//! Thread-safe subject with weakly held trait-object observers.
//!
//! # Design
//!
//! [`Subject<T>`] folds a state value and an ordered observer registry under
//! a single `parking_lot::RwLock`. `set()` mutates both in one write
//! section, snapshots the registry, then delivers outside the lock:
//!
//! ```text
//! set(v):
//!   write lock ── value = v, version += 1, snapshot = registry.clone()
//!   (lock released)
//!   for each weak in snapshot:
//!       upgrade ── live: observer.update(&v)
//!               └─ expired: skip
//! ```
//!
//! Delivering outside the lock is the load-bearing property of this type:
//! a callback may re-enter the subject (`attach`, `detach`, `set`,
//! `prune_expired`, `get`) without deadlocking, and a slow observer never
//! blocks registry mutation from other threads.
//!
//! # Delivery semantics
//!
//! - Order within one `set` is attach insertion order. [`Subject::prune_expired`]
//!   compacts in place and preserves the relative order of survivors.
//! - Each `set(v)` delivers `v` (the argument of that call, not a re-read
//!   of current state) exactly once per registry entry that is still live
//!   in its snapshot. Overlapping `set` calls from different threads may
//!   interleave deliveries; no total order across calls is guaranteed, and
//!   the same observer may be running `update` on two threads at once.
//! - Attaching the same observer twice creates two independent entries,
//!   each delivering its own notification.
//! - An entry whose observer has been dropped is skipped silently during
//!   delivery and removed by the next `prune_expired`.
//! - Observers attached from inside a callback are not part of the
//!   in-flight snapshot; they see the next `set` onward.
//!
//! # Performance
//!
//! | Operation         | Complexity                    |
//! |-------------------|-------------------------------|
//! | `get()`           | O(1) + `T::clone`             |
//! | `set()`           | O(S) snapshot + O(S) delivery |
//! | `attach()`        | O(1) amortized                |
//! | `detach()`        | O(S)                          |
//! | `prune_expired()` | O(S)                          |

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

/// Notification capability for [`Subject`] observers (push model).
///
/// For the pull model, hold a clone of the subject handle inside the
/// observer and call [`Subject::get`] from `update`; no lock is held during
/// delivery, so re-entry is safe.
pub trait Observer<T>: Send + Sync {
    /// Receive the value carried by the `set` call that produced this
    /// notification.
    fn update(&self, value: &T);
}

/// Interior shared between all handles to one subject.
struct SubjectShared<T> {
    value: T,
    version: u64,
    /// Weak entries in attach order. Expired entries linger, get skipped
    /// during delivery, and disappear on the next `prune_expired`.
    observers: Vec<Weak<dyn Observer<T>>>,
}

/// Thread-safe observable state cell.
///
/// Cloning a `Subject` creates another handle to the **same** inner state:
/// all handles read the same value and share one observer registry. The
/// subject never owns its observers: the registry holds only weak
/// references, so an observer's lifetime is governed entirely by whoever
/// holds its `Arc`.
///
/// # Invariants
///
/// 1. The registry never holds a strong reference to an observer.
/// 2. `get()` returns the value written by the last completed `set()`;
///    readers never observe a torn value.
/// 3. No lock is held while an observer's `update` runs.
/// 4. `version` increments by exactly 1 on every `set`, whether or not the
///    new value compares equal to the old one.
pub struct Subject<T> {
    shared: Arc<RwLock<SubjectShared<T>>>,
}

// Manual Clone: shares the same interior, no bound on T.
impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.read();
        f.debug_struct("Subject")
            .field("value", &shared.value)
            .field("version", &shared.version)
            .field("observer_count", &shared.observers.len())
            .finish()
    }
}

impl<T: Clone + 'static> Subject<T> {
    /// Create a new subject with the given initial value, version 0, and an
    /// empty registry.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(RwLock::new(SubjectShared {
                value,
                version: 0,
                observers: Vec::new(),
            })),
        }
    }

    /// Register a weak entry for `observer` at the end of the registry.
    ///
    /// Attaching the same observer twice yields two entries and duplicate
    /// delivery per `set`. The subject holds no strong reference: dropping
    /// the last `Arc` to the observer expires its entries.
    pub fn attach<O>(&self, observer: &Arc<O>)
    where
        O: Observer<T> + 'static,
    {
        let strong: Arc<dyn Observer<T>> = observer.clone();
        let entry: Weak<dyn Observer<T>> = Arc::downgrade(&strong);
        let mut shared = self.shared.write();
        shared.observers.push(entry);
        #[cfg(feature = "tracing")]
        tracing::trace!(observers = shared.observers.len(), "observer attached");
    }

    /// Remove every registry entry that points at `observer`'s allocation.
    ///
    /// Removes all duplicates at once. Idempotent; detaching an observer
    /// that was never attached is a no-op.
    pub fn detach<O>(&self, observer: &Arc<O>)
    where
        O: Observer<T> + 'static,
    {
        let target_strong: Arc<dyn Observer<T>> = observer.clone();
        let target: Weak<dyn Observer<T>> = Arc::downgrade(&target_strong);
        let mut shared = self.shared.write();
        shared.observers.retain(|entry| !entry.ptr_eq(&target));
    }

    /// Write a new value, then deliver it to every observer that is live in
    /// this call's registry snapshot.
    ///
    /// The write and the snapshot happen in one exclusive section; delivery
    /// happens with the lock released, so callbacks may re-enter the
    /// subject freely. Notifies unconditionally: there is no equality
    /// check, and setting the current value again delivers again.
    pub fn set(&self, value: T) {
        let snapshot: Vec<Weak<dyn Observer<T>>> = {
            let mut shared = self.shared.write();
            shared.value = value.clone();
            shared.version += 1;
            shared.observers.clone()
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(entries = snapshot.len(), "delivering state change");
        for entry in &snapshot {
            if let Some(observer) = entry.upgrade() {
                observer.update(&value);
            }
        }
    }

    /// Get a clone of the current value under shared access.
    ///
    /// Safe to call concurrently with `set` (including from inside an
    /// observer callback, where it reads the latest completed write).
    #[must_use]
    pub fn get(&self) -> T {
        self.shared.read().value.clone()
    }

    /// Current version number: the count of completed `set` calls.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.read().version
    }

    /// Registry length, counting expired entries not yet pruned.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.shared.read().observers.len()
    }

    /// Compact the registry, dropping entries whose observer is gone.
    ///
    /// Preserves the relative order of survivors. Idempotent and safe to
    /// call concurrently with any other operation.
    pub fn prune_expired(&self) {
        let mut shared = self.shared.write();
        #[cfg(feature = "tracing")]
        let before = shared.observers.len();
        shared.observers.retain(|entry| entry.strong_count() > 0);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            removed = before - shared.observers.len(),
            remaining = shared.observers.len(),
            "pruned expired observers"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
