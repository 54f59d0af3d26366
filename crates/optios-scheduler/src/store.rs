//! Bounded in-memory telemetry history with a pass-through persistence sink.

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;
use crate::telemetry::TelemetryRecord;

/// Trait for durable telemetry backends.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Appends one record.
    async fn append(&self, record: &TelemetryRecord) -> Result<()>;

    /// Returns the sink name for logging.
    fn name(&self) -> &'static str;
}

/// Point-in-time copy of the history.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    /// Records, oldest first.
    pub records: Vec<TelemetryRecord>,
    /// Total number of records ever added when the copy was taken.
    pub sequence: u64,
}

#[derive(Debug)]
struct History {
    records: VecDeque<TelemetryRecord>,
    sequence: u64,
}

/// Thread-safe telemetry history.
///
/// Holds at most `capacity` records; the oldest is dropped silently when a
/// new one arrives at capacity. Every add is forwarded to the sink, whose
/// failures are logged and never reach the caller.
pub struct TelemetryStore {
    capacity: usize,
    history: Mutex<History>,
    sink: Arc<dyn PersistenceSink>,
}

impl TelemetryStore {
    /// Default history length.
    pub const DEFAULT_CAPACITY: usize = 200;

    /// Creates a store. A zero capacity is raised to one.
    pub fn new(capacity: usize, sink: Arc<dyn PersistenceSink>) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: Mutex::new(History {
                records: VecDeque::with_capacity(capacity),
                sequence: 0,
            }),
            sink,
        }
    }

    /// Creates a store that keeps records in memory only.
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self::new(capacity, Arc::new(NullSink))
    }

    /// Appends a record and forwards it to the sink.
    pub async fn add_record(&self, record: TelemetryRecord) {
        {
            let mut history = self.history.lock();
            if history.records.len() >= self.capacity {
                history.records.pop_front();
            }
            history.records.push_back(record.clone());
            history.sequence += 1;
        }

        if let Err(e) = self.sink.append(&record).await {
            warn!(sink = self.sink.name(), error = %e, "failed to persist telemetry record");
        }
    }

    /// Returns the most recently added record.
    pub fn latest(&self) -> Option<TelemetryRecord> {
        self.history.lock().records.back().cloned()
    }

    /// Returns a copy of the history, oldest first.
    pub fn history(&self) -> Vec<TelemetryRecord> {
        self.history.lock().records.iter().cloned().collect()
    }

    /// Returns a copy of the history together with the insertion sequence.
    pub fn snapshot(&self) -> HistorySnapshot {
        let history = self.history.lock();
        HistorySnapshot {
            records: history.records.iter().cloned().collect(),
            sequence: history.sequence,
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.history.lock().records.len()
    }

    /// Returns true if no record has been kept.
    pub fn is_empty(&self) -> bool {
        self.history.lock().records.is_empty()
    }

    /// Maximum number of records held.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for TelemetryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryStore")
            .field("capacity", &self.capacity)
            .field("sink", &self.sink.name())
            .finish_non_exhaustive()
    }
}

/// Sink that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl PersistenceSink for NullSink {
    async fn append(&self, _record: &TelemetryRecord) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all appended records in append order.
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn append(&self, record: &TelemetryRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// SQLite-backed sink writing to the `system_stats` table.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Opens (creating if needed) the database and its schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;
        debug!(path = %path.display(), "telemetry database ready");

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS system_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT,
                cpu_percent REAL,
                memory_usage REAL,
                ready_queue_size INTEGER,
                avg_burst_time REAL,
                avg_priority REAL
            )
            ",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Number of persisted rows.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM system_stats")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl PersistenceSink for SqliteSink {
    async fn append(&self, record: &TelemetryRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO system_stats
                (timestamp, cpu_percent, memory_usage, ready_queue_size, avg_burst_time, avg_priority)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(record.timestamp.to_rfc3339())
        .bind(record.cpu_percent)
        .bind(record.memory_usage)
        .bind(i64::from(record.ready_queue_size))
        .bind(record.avg_burst_time)
        .bind(record.avg_priority)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
