use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use feed::{
    next_recorded_at, Author, BranchName, Clock, EventAction, EventId, EventRecord, EventStore,
    NormalizedEvent, RecentLimit, RepositoryName, StoreError, SystemClock, Timestamp,
};
use rusqlite::{params, Connection, TransactionBehavior};
use tracing::{debug, info, instrument};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS events (
        seq          INTEGER PRIMARY KEY AUTOINCREMENT,
        id           TEXT    NOT NULL UNIQUE,
        action       TEXT    NOT NULL CHECK (action IN ('push', 'pull_request', 'merge')),
        author       TEXT    NOT NULL,
        to_branch    TEXT    NOT NULL,
        from_branch  TEXT,
        repository   TEXT    NOT NULL,
        occurred_at  INTEGER NOT NULL,
        recorded_at  INTEGER NOT NULL,
        CHECK ((action = 'push') = (from_branch IS NULL))
    );
    CREATE INDEX IF NOT EXISTS events_recent ON events (recorded_at DESC, seq DESC);
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`EventStore`].
///
/// Cloning is cheap and clones share the same connection.
#[derive(Clone)]
pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
    path: Option<PathBuf>,
}

impl SqliteEventStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Opens the database at `path`, reading ingestion time from `clock`.
    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(unavailable)?;
        let store = Self::bootstrap(conn, clock, Some(path.to_path_buf()))?;
        info!(path = %path.display(), "opened sqlite event store");
        Ok(store)
    }

    /// Opens a private in-memory database. Nothing survives the value.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::bootstrap(conn, Arc::new(SystemClock), None)
    }

    /// Database file backing this store; `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn bootstrap(
        conn: Connection,
        clock: Arc<dyn Clock>,
        path: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        // In-memory databases answer "memory" here; that is expected.
        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(unavailable)?;
        conn.pragma_update(None, "synchronous", "FULL")
            .map_err(unavailable)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;
        debug!(%journal_mode, "sqlite pragmas applied");
        conn.execute_batch(SCHEMA).map_err(unavailable)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            clock,
            path,
        })
    }

    /// Runs `f` with exclusive use of the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::unavailable("sqlite connection lock poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(|err| StoreError::unavailable(format!("sqlite task failed: {err}")))?
    }
}

impl std::fmt::Debug for SqliteEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEventStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    #[instrument(skip_all, fields(action = %event.action()))]
    async fn append(&self, event: NormalizedEvent) -> Result<EventId, StoreError> {
        let clock = Arc::clone(&self.clock);
        self.with_conn(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(unavailable)?;

            let latest: Option<i64> = tx
                .query_row("SELECT MAX(recorded_at) FROM events", [], |row| row.get(0))
                .map_err(unavailable)?;
            let latest = latest
                .map(|micros| {
                    Timestamp::from_unix_micros(micros).ok_or_else(|| {
                        StoreError::corrupt(format!("latest recorded_at '{micros}' is out of range"))
                    })
                })
                .transpose()?;
            let recorded_at = next_recorded_at(clock.now(), latest)?;
            let id = EventId::new_random();

            tx.execute(
                "
                INSERT INTO events (
                    id, action, author, to_branch, from_branch, repository, occurred_at, recorded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
                params![
                    id.to_string(),
                    event.action().as_str(),
                    event.author().as_str(),
                    event.to_branch().as_str(),
                    event.from_branch().map(BranchName::as_str),
                    event.repository().as_str(),
                    event.occurred_at().as_unix_micros(),
                    recorded_at.as_unix_micros(),
                ],
            )
            .map_err(unavailable)?;
            tx.commit().map_err(unavailable)?;

            debug!(%id, %recorded_at, "appended event");
            Ok(id)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_recent(&self, limit: RecentLimit) -> Result<Vec<EventRecord>, StoreError> {
        let rows = self
            .with_conn(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "
                        SELECT id, action, author, to_branch, from_branch, repository,
                               occurred_at, recorded_at
                        FROM events
                        ORDER BY recorded_at DESC, seq DESC
                        LIMIT ?1
                        ",
                    )
                    .map_err(unavailable)?;
                let rows = stmt
                    .query_map(params![limit.get()], |row| {
                        Ok(EventRow {
                            id: row.get(0)?,
                            action: row.get(1)?,
                            author: row.get(2)?,
                            to_branch: row.get(3)?,
                            from_branch: row.get(4)?,
                            repository: row.get(5)?,
                            occurred_at: row.get(6)?,
                            recorded_at: row.get(7)?,
                        })
                    })
                    .map_err(unavailable)?;
                let rows = rows.collect::<Result<Vec<_>, _>>().map_err(unavailable)?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(EventRow::into_record).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
                    .map_err(unavailable)
            })
            .await?;
        u64::try_from(count)
            .map_err(|_| StoreError::corrupt(format!("event count '{count}' is negative")))
    }
}

/// Raw column values of one `events` row, before domain validation.
struct EventRow {
    id: String,
    action: String,
    author: String,
    to_branch: String,
    from_branch: Option<String>,
    repository: String,
    occurred_at: i64,
    recorded_at: i64,
}

impl EventRow {
    fn into_record(self) -> Result<EventRecord, StoreError> {
        let bad = |column: &str, value: &dyn std::fmt::Display| {
            StoreError::corrupt(format!("event '{}': invalid {column} '{value}'", self.id))
        };

        let id: EventId = self.id.parse().map_err(|_| bad("id", &self.id))?;
        let action: EventAction = self.action.parse().map_err(|_| bad("action", &self.action))?;
        let author = Author::new(self.author.as_str()).ok_or_else(|| bad("author", &self.author))?;
        let to_branch =
            BranchName::new(self.to_branch.as_str()).ok_or_else(|| bad("to_branch", &self.to_branch))?;
        let from_branch = match self.from_branch.as_deref() {
            Some(name) => Some(BranchName::new(name).ok_or_else(|| bad("from_branch", &name))?),
            None => None,
        };
        let repository = RepositoryName::new(self.repository.as_str())
            .ok_or_else(|| bad("repository", &self.repository))?;
        let occurred_at = Timestamp::from_unix_micros(self.occurred_at)
            .ok_or_else(|| bad("occurred_at", &self.occurred_at))?;
        let recorded_at = Timestamp::from_unix_micros(self.recorded_at)
            .ok_or_else(|| bad("recorded_at", &self.recorded_at))?;

        let event = NormalizedEvent::from_parts(
            action,
            author,
            to_branch,
            from_branch,
            repository,
            occurred_at,
        )
        .ok_or_else(|| bad("from_branch", &format!("{:?} for {action}", self.from_branch)))?;

        Ok(EventRecord::new(id, event, recorded_at))
    }
}

fn unavailable(err: rusqlite::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}
