//! Core domain for hookfeed.
//!
//! hookfeed receives GitHub webhook deliveries (push, pull request, merge),
//! normalises them into one canonical [`EventRecord`] shape, appends them to
//! an [`EventStore`], and serves the most recent ones to polling consumers.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! The durable store lives in the `store` crate and the HTTP surface in the
//! `listener` crate; both depend on this crate, never the other way round.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype names and ids (`Author`, `BranchName`, `EventId`, ...) |
//! | [`types`] | Event records, `Timestamp`, `RecentLimit` |
//! | [`errors`] | Rejections, store errors, outcomes and retry policy |
//! | [`payload`] | Tagged union of accepted GitHub payload shapes |
//! | [`normalizer`] | Pure payload → event mapping |
//! | [`store`] | The `EventStore` port and `Clock` |
//! | [`memory`] | Non-durable in-process store |
//! | [`ingest`] | `IngestionService` |
//! | [`query`] | `QueryService` |

pub mod errors;
pub mod identifiers;
pub mod ingest;
pub mod memory;
pub mod normalizer;
pub mod payload;
pub mod query;
pub mod store;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{IngestOutcome, QueryError, RejectionReason, RetryPolicy, StoreError};
pub use identifiers::{Author, BranchName, EventId, RepositoryName};
pub use ingest::IngestionService;
pub use memory::MemoryEventStore;
pub use normalizer::normalize;
pub use query::QueryService;
pub use store::{next_recorded_at, Clock, EventStore, SystemClock};
pub use types::{EventAction, EventRecord, NormalizedEvent, RecentLimit, Timestamp};
