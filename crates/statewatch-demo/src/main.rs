#![forbid(unsafe_code)]

//! Runnable walkthrough of the statewatch cells.
//!
//! Three scenarios, in order:
//!
//! 1. **Pull**: a subscriber reads the cell through its own handle when
//!    told that something changed.
//! 2. **Push**: subscribers receive the new value directly.
//! 3. **Thread-safe**: trait observers attached to a [`Subject`] updated
//!    from several threads, with a prune pass after one observer is
//!    dropped.
//!
//! Library internals log through `tracing`; run with
//! `RUST_LOG=statewatch=trace` to watch attach/delivery/prune events.

use std::sync::Arc;
use std::thread;

use statewatch::{Observable, Observer, Subject};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    pull_demo();
    push_demo();
    threaded_demo();
}

/// Pull model: the callback ignores the pushed payload and queries the
/// cell through a cloned handle.
fn pull_demo() {
    info!("pull demo");
    println!("--- pull ---");

    let temperature = Observable::new(18);
    let handle = temperature.clone();
    let _display = temperature.subscribe_with_current(move |_| {
        println!("display reads {} degrees", handle.get());
    });

    temperature.set(21);
    temperature.set(21); // Unchanged: no delivery.
    temperature.set(19);
}

/// Push model: subscribers receive the new value directly.
fn push_demo() {
    info!("push demo");
    println!("--- push ---");

    let price = Observable::new(100u32);
    let _ticker = price.subscribe(|value| println!("ticker: price is now {value}"));
    let _alarm = price.subscribe(|value| {
        if *value > 150 {
            println!("alarm: price above threshold ({value})");
        }
    });

    price.set(120);
    price.set(180);
}

/// Console observer for the thread-safe scenario.
struct Console {
    name: &'static str,
}

impl Console {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name })
    }
}

impl Observer<i64> for Console {
    fn update(&self, value: &i64) {
        println!("{} received {}", self.name, value);
    }
}

/// Thread-safe scenario: two observers, writers on several threads, then a
/// drop and a prune pass.
fn threaded_demo() {
    info!("thread-safe demo");
    println!("--- thread-safe ---");

    let readings = Subject::new(0i64);
    let first = Console::new("first");
    let second = Console::new("second");
    readings.attach(&first);
    readings.attach(&second);

    thread::scope(|scope| {
        for writer in 0..3i64 {
            let readings = readings.clone();
            scope.spawn(move || {
                readings.set(writer * 1000);
            });
        }
    });

    drop(second);
    readings.prune_expired();
    println!(
        "after prune: {} observer(s), last value {}",
        readings.observer_count(),
        readings.get()
    );

    readings.set(42);
}
