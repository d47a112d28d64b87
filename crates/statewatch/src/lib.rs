#![forbid(unsafe_code)]

//! Observable state cells with weakly held subscribers.
//!
//! # Architecture
//!
//! Two cells, one contract: a cell owns a value, subscribers register for
//! change notifications, and the cell never owns a subscriber: it holds
//! only weak references, so subscriber lifetime stays with whoever created
//! it, and a dead subscriber is skipped silently instead of being kept
//! alive by its subscription.
//!
//! - [`Observable<T>`]: single-threaded, `Rc`-based, closure subscribers
//!   with RAII [`Subscription`] guards. Change-driven: equal values are a
//!   no-op.
//! - [`Subject<T>`]: thread-safe, `Arc`-based, trait-object [`Observer`]s
//!   behind a reader-writer lock. Delivery happens with the lock released,
//!   so callbacks may re-enter the subject from any thread and a slow
//!   observer never blocks registry mutation. Notifies on every `set`.
//!
//! # Choosing a cell
//!
//! Reach for [`Observable`] inside a single-threaded core (UI models,
//! interpreters); reach for [`Subject`] when attach/set/get race across
//! threads. Both keep delivery order equal to registration order and both
//! preserve duplicate registrations as duplicate deliveries.

pub mod observable;
pub mod subject;

pub use observable::{Observable, Subscription};
pub use subject::{Observer, Subject};
