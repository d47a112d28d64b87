#![forbid(unsafe_code)]

//! Thread-interleaving tests for `Subject`.
//!
//! These pin down the concurrent contract:
//!
//! 1. Concurrent `attach` calls all land: N threads registering one
//!    observer each leave a registry of size N.
//! 2. Every observer that stays alive for a whole run receives exactly one
//!    delivery per completed `set`, regardless of which thread set.
//! 3. Readers never observe a torn value, and with a single writer the
//!    values a reader sees are monotone.
//! 4. `prune_expired` racing with `set` and observer drops never loses a
//!    live entry and never panics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use statewatch::{Observer, Subject};

/// Counts deliveries, ignores the payload.
struct Counter {
    fired: AtomicUsize,
}

impl Counter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fired: AtomicUsize::new(0),
        })
    }

    fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl<T> Observer<T> for Counter
where
    T: Send + Sync,
{
    fn update(&self, _value: &T) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn attach_from_many_threads_all_land() {
    const THREADS: usize = 8;

    let subject = Subject::new(0u64);
    let observers: Mutex<Vec<Arc<Counter>>> = Mutex::new(Vec::new());
    let barrier = Barrier::new(THREADS);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                let observer = Counter::new();
                barrier.wait();
                subject.attach(&observer);
                observers.lock().unwrap().push(observer);
            });
        }
    });

    assert_eq!(subject.observer_count(), THREADS);

    subject.set(1);
    for observer in observers.lock().unwrap().iter() {
        assert_eq!(observer.fired(), 1);
    }
}

#[test]
fn live_observers_see_every_set() {
    const OBSERVERS: usize = 4;
    const WRITERS: usize = 4;
    const SETS_PER_WRITER: usize = 50;

    let subject = Subject::new(0u64);
    let observers: Vec<Arc<Counter>> = (0..OBSERVERS)
        .map(|_| {
            let observer = Counter::new();
            subject.attach(&observer);
            observer
        })
        .collect();

    thread::scope(|scope| {
        for writer in 0..WRITERS {
            let subject = subject.clone();
            scope.spawn(move || {
                for i in 0..SETS_PER_WRITER {
                    subject.set((writer * SETS_PER_WRITER + i) as u64);
                }
            });
        }
    });

    // Each completed set snapshots all four entries; every observer was
    // alive throughout, so the delivery counts are exact.
    for observer in &observers {
        assert_eq!(observer.fired(), WRITERS * SETS_PER_WRITER);
    }
    assert_eq!(subject.version(), (WRITERS * SETS_PER_WRITER) as u64);
}

#[test]
fn readers_never_observe_torn_values() {
    const LAST: u64 = 1000;

    // The payload carries its own checksum; a torn read would break it.
    let subject = Subject::new((0u64, 0u64));

    thread::scope(|scope| {
        let writer = subject.clone();
        scope.spawn(move || {
            for i in 1..=LAST {
                writer.set((i, 2 * i));
            }
        });

        for _ in 0..3 {
            let reader = subject.clone();
            scope.spawn(move || {
                let mut previous = 0;
                loop {
                    let (a, b) = reader.get();
                    assert_eq!(b, 2 * a, "torn value observed");
                    assert!(a >= previous, "single writer, reads must be monotone");
                    previous = a;
                    if a == LAST {
                        break;
                    }
                }
            });
        }
    });

    assert_eq!(subject.get(), (LAST, 2 * LAST));
}

#[test]
fn prune_races_with_set_and_drops() {
    const TOTAL: usize = 100;
    const DROPPED: usize = 50;
    const SETS: usize = 100;

    let subject = Subject::new(0u64);
    let mut observers: Vec<Arc<Counter>> = (0..TOTAL)
        .map(|_| {
            let observer = Counter::new();
            subject.attach(&observer);
            observer
        })
        .collect();
    let doomed: Vec<Arc<Counter>> = observers.drain(..DROPPED).collect();
    let survivors = observers;

    thread::scope(|scope| {
        let writer = subject.clone();
        scope.spawn(move || {
            for i in 0..SETS {
                writer.set(i as u64);
            }
        });

        let pruner = subject.clone();
        scope.spawn(move || {
            for observer in doomed {
                drop(observer);
                pruner.prune_expired();
            }
        });
    });

    // Prune never evicts a live entry, so every survivor saw every set.
    subject.prune_expired();
    assert_eq!(subject.observer_count(), TOTAL - DROPPED);
    for observer in &survivors {
        assert_eq!(observer.fired(), SETS);
    }
}
