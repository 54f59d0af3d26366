//! Append-only log of recommendations handed out to callers.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::agent::{Action, StateVector};
use crate::error::{Result, SchedulerError};

const HEADER: &str =
    "timestamp,ready_queue_size,avg_burst_time,avg_priority,memory_usage,rl_choice\n";

/// Trait for decision log destinations.
#[async_trait]
pub trait DecisionLogSink: Send + Sync {
    /// Records the state a recommendation was made for and the chosen action.
    async fn append(&self, state: &StateVector, choice: Action) -> Result<()>;
}

/// CSV decision log.
///
/// Writes a header row when the file is empty, then one row per decision.
#[derive(Debug)]
pub struct CsvDecisionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvDecisionLog {
    /// Creates a log writing to `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DecisionLogSink for CsvDecisionLog {
    async fn append(&self, state: &StateVector, choice: Action) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let io_err = |e: std::io::Error| SchedulerError::DecisionLog(format!("{}: {e}", self.path.display()));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;

        let mut buf = String::new();
        if file.metadata().await.map_err(io_err)?.len() == 0 {
            buf.push_str(HEADER);
        }
        buf.push_str(&format!(
            "{},{},{},{},{},{}\n",
            Utc::now().to_rfc3339(),
            state[0],
            state[1],
            state[2],
            state[3],
            choice
        ));

        file.write_all(buf.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        Ok(())
    }
}
