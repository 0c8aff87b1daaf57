//! Error, outcome and retry-policy types for the hookfeed domain.
//!
//! [`RejectionReason`] describes why a payload was refused before anything was
//! written; [`StoreError`] describes a durability-layer failure during a read
//! or write. Neither is retried inside the core: [`RetryPolicy`] tells the
//! caller whether retrying could help.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::EventId;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry.
///
/// Returned by the domain error types so the transport layer (or any other
/// caller) can decide whether to re-submit an operation.
///
/// - `Retryable`: the store could not be reached or a write did not commit.
/// - `NonRetryable`: the payload itself is unacceptable, or stored data is
///   corrupt; sending the same request again produces the same result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried; the caller picks the back-off.
    Retryable,
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable)
    }
}

// ---------------------------------------------------------------------------
// Normalisation rejections
// ---------------------------------------------------------------------------

/// Why the normaliser refused a payload.
///
/// A rejection is final for that payload: no record is created and the store
/// is never touched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The event-type hint names a kind of notification this system does not
    /// handle (e.g. `issue_comment`).
    #[error("Unsupported event type '{event_type}'")]
    UnsupportedEventType {
        /// The hint exactly as received.
        event_type: String,
    },

    /// A required field is absent, empty, or has the wrong shape.
    #[error("Malformed payload at '{field}': {detail}")]
    MalformedPayload {
        /// Dotted JSON path of the offending field (e.g. `"pusher.name"`).
        field: String,
        /// What was wrong with it.
        detail: String,
    },

    /// A recognised event type whose sub-state produces no record
    /// (e.g. a pull request that was labelled, or closed without merging).
    #[error("Ignored pull request action '{action}'")]
    IgnoredAction {
        /// The sub-state reported by the source.
        action: String,
    },
}

impl RejectionReason {
    pub(crate) fn missing(field: &str) -> Self {
        Self::MalformedPayload {
            field: field.to_string(),
            detail: "required field is missing or empty".to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, detail: impl Into<String>) -> Self {
        Self::MalformedPayload {
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedEventType { .. } => "UNSUPPORTED_EVENT_TYPE",
            Self::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            Self::IgnoredAction { .. } => "IGNORED_ACTION",
        }
    }

    /// Rejections are a property of the payload and are never retried.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::NonRetryable
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Failure of the durability layer behind an [`crate::EventStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StoreError {
    /// The store could not be reached, or a write could not be committed.
    ///
    /// Nothing was acknowledged; the caller may retry.
    #[error("Event store unavailable: {message}")]
    Unavailable {
        /// Description of the underlying failure.
        message: String,
    },

    /// A stored row could not be decoded into an event record.
    #[error("Corrupt event record: {message}")]
    Corrupt {
        /// Which row and which field failed to decode.
        message: String,
    },
}

impl StoreError {
    /// Shorthand for [`StoreError::Unavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Shorthand for [`StoreError::Corrupt`].
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Unavailability is transient; corruption is not.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Unavailable { .. } => RetryPolicy::Retryable,
            Self::Corrupt { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Errors returned by [`crate::QueryService`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The caller supplied an unusable query parameter. No store access
    /// happened.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Which argument and why.
        message: String,
    },

    /// The store failed while reading.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Ingestion outcome
// ---------------------------------------------------------------------------

/// Result of handing one webhook payload to [`crate::IngestionService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The event was normalised and durably appended.
    Accepted(EventId),
    /// The payload was refused; nothing was written.
    Rejected(RejectionReason),
    /// The payload was valid but the store failed; nothing was acknowledged.
    Failed(StoreError),
}

impl IngestOutcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "accepted",
            Self::Rejected(_) => "rejected",
            Self::Failed(_) => "failed",
        }
    }

    /// Returns the stored id for [`IngestOutcome::Accepted`].
    pub fn accepted_id(&self) -> Option<EventId> {
        match self {
            Self::Accepted(id) => Some(*id),
            _ => None,
        }
    }
}
