//! hookfeed durable event store.
//!
//! Implements [`feed::EventStore`] on a single SQLite database file.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** SQL, pragmas, and blocking-call scheduling live here.
//! The [`feed`] crate sees only [`feed::EventStore`].
//!
//! ## Durability
//!
//! The database runs in WAL mode with `synchronous = FULL`, and every append
//! commits its own `IMMEDIATE` transaction before returning, so an
//! acknowledged event survives a crash of the process.
//!
//! ## Concurrency
//!
//! One connection is shared behind a mutex and used from
//! [`tokio::task::spawn_blocking`]. The mutex together with the immediate
//! transaction serialises writers, which is what makes `recorded_at`
//! assignment monotonic.

mod sqlite;

pub use sqlite::SqliteEventStore;
