//! Event record value types.
//!
//! A webhook payload becomes a [`NormalizedEvent`] in the normaliser and an
//! [`EventRecord`] once a store has accepted it. Both are immutable: fields are
//! private and the only constructors uphold the record invariants, so a record
//! whose `from_branch` disagrees with its `action` cannot be built.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{Author, BranchName, EventId, RepositoryName};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp with microsecond precision.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Sub-microsecond precision is discarded on construction so that a
/// value survives a round trip through storage unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`], truncated to microseconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        let micros = dt.timestamp_micros();
        Self(DateTime::from_timestamp_micros(micros).unwrap_or(dt))
    }

    /// Creates a [`Timestamp`] from microseconds since the Unix epoch.
    ///
    /// Returns `None` if the value is outside chrono's representable range.
    pub fn from_unix_micros(micros: i64) -> Option<Self> {
        DateTime::from_timestamp_micros(micros).map(Self)
    }

    /// Creates a [`Timestamp`] from whole seconds since the Unix epoch.
    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        Utc.timestamp_opt(seconds, 0).single().map(Self)
    }

    /// Parses an RFC 3339 timestamp (e.g. `2021-04-01T21:30:00Z`) in any offset.
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Returns microseconds since the Unix epoch.
    pub fn as_unix_micros(self) -> i64 {
        self.0.timestamp_micros()
    }

    /// Returns the smallest timestamp strictly after `self`, or `None` at the
    /// end of the representable range.
    pub fn next_tick(self) -> Option<Self> {
        self.0
            .checked_add_signed(chrono::Duration::microseconds(1))
            .map(Self)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// What happened in the source repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Commits pushed to a branch.
    Push,
    /// A pull request was opened or updated.
    PullRequest,
    /// A pull request was merged into its base branch.
    Merge,
}

impl EventAction {
    /// Returns the wire/storage name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
            Self::Merge => "merge",
        }
    }

    /// Returns `true` for the actions that carry a source branch.
    pub fn has_source_branch(self) -> bool {
        !matches!(self, Self::Push)
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(Self::Push),
            "pull_request" => Ok(Self::PullRequest),
            "merge" => Ok(Self::Merge),
            other => Err(format!("unknown event action '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A source event in canonical form, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedEvent {
    action: EventAction,
    author: Author,
    to_branch: BranchName,
    from_branch: Option<BranchName>,
    repository: RepositoryName,
    occurred_at: Timestamp,
}

impl NormalizedEvent {
    /// A push of commits to `to_branch`.
    pub fn push(
        author: Author,
        to_branch: BranchName,
        repository: RepositoryName,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            action: EventAction::Push,
            author,
            to_branch,
            from_branch: None,
            repository,
            occurred_at,
        }
    }

    /// A pull request from `from_branch` into `to_branch`.
    pub fn pull_request(
        author: Author,
        to_branch: BranchName,
        from_branch: BranchName,
        repository: RepositoryName,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            action: EventAction::PullRequest,
            author,
            to_branch,
            from_branch: Some(from_branch),
            repository,
            occurred_at,
        }
    }

    /// A merge of `from_branch` into `to_branch`.
    pub fn merge(
        author: Author,
        to_branch: BranchName,
        from_branch: BranchName,
        repository: RepositoryName,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            action: EventAction::Merge,
            author,
            to_branch,
            from_branch: Some(from_branch),
            repository,
            occurred_at,
        }
    }

    /// Rebuilds an event from stored columns.
    ///
    /// Returns `None` if `from_branch` does not agree with `action`.
    pub fn from_parts(
        action: EventAction,
        author: Author,
        to_branch: BranchName,
        from_branch: Option<BranchName>,
        repository: RepositoryName,
        occurred_at: Timestamp,
    ) -> Option<Self> {
        match (action, from_branch) {
            (EventAction::Push, None) => {
                Some(Self::push(author, to_branch, repository, occurred_at))
            }
            (EventAction::PullRequest, Some(from)) => Some(Self::pull_request(
                author,
                to_branch,
                from,
                repository,
                occurred_at,
            )),
            (EventAction::Merge, Some(from)) => {
                Some(Self::merge(author, to_branch, from, repository, occurred_at))
            }
            _ => None,
        }
    }

    /// What happened.
    pub fn action(&self) -> EventAction {
        self.action
    }

    /// Who did it.
    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Target branch of the push or pull request.
    pub fn to_branch(&self) -> &BranchName {
        &self.to_branch
    }

    /// Source branch; `None` exactly for pushes.
    pub fn from_branch(&self) -> Option<&BranchName> {
        self.from_branch.as_ref()
    }

    /// Source repository.
    pub fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Event time as reported by the source.
    pub fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }
}

/// A stored event: the normalised fields plus what the store assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    id: EventId,
    #[serde(flatten)]
    event: NormalizedEvent,
    recorded_at: Timestamp,
}

impl EventRecord {
    /// Assembles a record. Only event stores call this, once per append.
    pub fn new(id: EventId, event: NormalizedEvent, recorded_at: Timestamp) -> Self {
        Self {
            id,
            event,
            recorded_at,
        }
    }

    /// Identifier assigned at append.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Ingestion time assigned by the store.
    pub fn recorded_at(&self) -> Timestamp {
        self.recorded_at
    }

    /// The normalised event fields.
    pub fn event(&self) -> &NormalizedEvent {
        &self.event
    }
}

impl std::ops::Deref for EventRecord {
    type Target = NormalizedEvent;

    fn deref(&self) -> &NormalizedEvent {
        &self.event
    }
}

// ---------------------------------------------------------------------------
// Query limits
// ---------------------------------------------------------------------------

/// Maximum number of records a single `list_recent` call returns; always > 0.
///
/// Deserializes from a bare integer and rejects zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RecentLimit(u32);

impl RecentLimit {
    /// Creates a limit, returning `None` for zero.
    #[must_use]
    pub const fn new(limit: u32) -> Option<Self> {
        if limit == 0 {
            None
        } else {
            Some(Self(limit))
        }
    }

    /// Returns the limit as a `u32`.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Returns the limit as a `usize` for slicing.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<RecentLimit> for u32 {
    fn from(limit: RecentLimit) -> Self {
        limit.0
    }
}

impl std::fmt::Display for RecentLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> (Author, BranchName, RepositoryName) {
        (
            Author::new("alice").unwrap(),
            BranchName::new("main").unwrap(),
            RepositoryName::new("octo/r1").unwrap(),
        )
    }

    #[test]
    fn push_has_no_source_branch() {
        let (author, to, repo) = names();
        let event = NormalizedEvent::push(author, to, repo, Timestamp::now());
        assert_eq!(event.action(), EventAction::Push);
        assert!(event.from_branch().is_none());
    }

    #[test]
    fn from_parts_rejects_inconsistent_source_branch() {
        let (author, to, repo) = names();
        let from = BranchName::new("feature").unwrap();
        let at = Timestamp::now();

        assert!(NormalizedEvent::from_parts(
            EventAction::Push,
            author.clone(),
            to.clone(),
            Some(from.clone()),
            repo.clone(),
            at,
        )
        .is_none());
        assert!(NormalizedEvent::from_parts(
            EventAction::Merge,
            author.clone(),
            to.clone(),
            None,
            repo.clone(),
            at,
        )
        .is_none());

        let merge =
            NormalizedEvent::from_parts(EventAction::Merge, author, to, Some(from), repo, at)
                .unwrap();
        assert_eq!(merge.from_branch().map(BranchName::as_str), Some("feature"));
    }

    #[test]
    fn timestamps_truncate_to_microseconds() {
        let ts = Timestamp::parse_rfc3339("2021-04-01T21:30:00.123456789Z").unwrap();
        assert_eq!(ts.as_unix_micros() % 1_000_000, 123_456);
        assert_eq!(Timestamp::from_unix_micros(ts.as_unix_micros()), Some(ts));
    }

    #[test]
    fn rfc3339_offsets_are_converted_to_utc() {
        let ts = Timestamp::parse_rfc3339("2021-04-01T14:30:00-07:00").unwrap();
        assert_eq!(ts, Timestamp::parse_rfc3339("2021-04-01T21:30:00Z").unwrap());
    }

    #[test]
    fn next_tick_is_strictly_later() {
        let ts = Timestamp::now();
        let next = ts.next_tick().unwrap();
        assert!(next > ts);
        assert_eq!(next.as_unix_micros() - ts.as_unix_micros(), 1);
    }

    #[test]
    fn next_tick_stops_at_the_end_of_time() {
        let last = Timestamp::from_utc(DateTime::<Utc>::MAX_UTC);
        assert!(last.next_tick().is_none());
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(RecentLimit::new(0).is_none());
        assert_eq!(RecentLimit::new(5).unwrap().get(), 5);
    }

    #[test]
    fn zero_limit_does_not_deserialize() {
        assert!(serde_json::from_str::<RecentLimit>("0").is_err());
        assert!(serde_json::from_str::<RecentLimit>("-1").is_err());
        let limit: RecentLimit = serde_json::from_str("20").unwrap();
        assert_eq!(limit.get(), 20);
    }

    #[test]
    fn actions_parse_from_their_names() {
        for action in [EventAction::Push, EventAction::PullRequest, EventAction::Merge] {
            assert_eq!(action.as_str().parse::<EventAction>().unwrap(), action);
        }
        assert!("debug".parse::<EventAction>().is_err());
    }

    #[test]
    fn record_serialises_flat_with_null_source_branch_for_push() {
        let (author, to, repo) = names();
        let at = Timestamp::parse_rfc3339("2021-04-01T21:30:00Z").unwrap();
        let record = EventRecord::new(
            EventId::new_random(),
            NormalizedEvent::push(author, to, repo, at),
            at,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["action"], "push");
        assert_eq!(json["author"], "alice");
        assert!(json["from_branch"].is_null());
        assert!(json.get("event").is_none());
    }
}
