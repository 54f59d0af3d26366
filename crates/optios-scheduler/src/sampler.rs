//! System metrics sampling.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SchedulerError};

/// One raw reading of system load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSample {
    /// CPU utilisation in percent.
    pub cpu_percent: f64,
    /// Memory utilisation in percent.
    pub memory_percent: f64,
    /// Number of live processes.
    pub process_count: u32,
}

/// Trait for system metrics sources.
///
/// Implementations may block for their measurement window.
#[async_trait]
pub trait MetricsSampler: Send + Sync {
    /// Takes one reading.
    async fn sample(&self) -> Result<SystemSample>;
}

/// Linux `/proc` sampler.
#[derive(Debug, Clone)]
pub struct ProcfsSampler {
    root: PathBuf,
    cpu_window: Duration,
}

impl ProcfsSampler {
    /// Creates a sampler reading `/proc` with the given CPU window.
    #[must_use]
    pub fn new(cpu_window: Duration) -> Self {
        Self::with_root("/proc", cpu_window)
    }

    /// Creates a sampler reading a procfs-shaped tree at `root`.
    pub fn with_root(root: impl Into<PathBuf>, cpu_window: Duration) -> Self {
        Self {
            root: root.into(),
            cpu_window,
        }
    }

    async fn read(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SchedulerError::Sampling(format!("{}: {e}", path.display())))
    }

    async fn cpu_times(&self) -> Result<CpuTimes> {
        parse_cpu_times(&self.read("stat").await?)
    }

    async fn process_count(&self) -> Result<u32> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| SchedulerError::Sampling(format!("{}: {e}", self.root.display())))?;

        let mut count: u32 = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let is_pid = name
                .to_str()
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
            if is_pid {
                count = count.saturating_add(1);
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl MetricsSampler for ProcfsSampler {
    async fn sample(&self) -> Result<SystemSample> {
        let before = self.cpu_times().await?;
        tokio::time::sleep(self.cpu_window).await;
        let after = self.cpu_times().await?;

        let memory_percent = parse_memory_percent(&self.read("meminfo").await?)?;
        let process_count = self.process_count().await?;

        Ok(SystemSample {
            cpu_percent: before.utilisation_until(&after),
            memory_percent,
            process_count,
        })
    }
}

/// Aggregate CPU jiffies from the first line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    idle: u64,
    total: u64,
}

impl CpuTimes {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn utilisation_until(&self, later: &Self) -> f64 {
        let total = later.total.saturating_sub(self.total);
        if total == 0 {
            return 0.0;
        }
        let idle = later.idle.saturating_sub(self.idle).min(total);
        100.0 * (total - idle) as f64 / total as f64
    }
}

fn parse_cpu_times(stat: &str) -> Result<CpuTimes> {
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| SchedulerError::Sampling("no aggregate cpu line in stat".into()))?;

    // user nice system idle iowait irq softirq steal; guest time is already in user.
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| SchedulerError::Sampling(format!("malformed cpu line: {e}")))?;

    if fields.len() < 4 {
        return Err(SchedulerError::Sampling("truncated cpu line".into()));
    }

    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        idle,
        total: fields.iter().sum(),
    })
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn parse_memory_percent(meminfo: &str) -> Result<f64> {
    let field = |key: &str| -> Option<u64> {
        meminfo
            .lines()
            .find_map(|l| l.strip_prefix(key))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|v| v.parse().ok())
    };

    let total = field("MemTotal")
        .filter(|t| *t > 0)
        .ok_or_else(|| SchedulerError::Sampling("MemTotal missing from meminfo".into()))?;
    let available = field("MemAvailable")
        .or_else(|| Some(field("MemFree")? + field("Buffers")? + field("Cached")?))
        .ok_or_else(|| SchedulerError::Sampling("MemAvailable missing from meminfo".into()))?
        .min(total);

    Ok(100.0 * (total - available) as f64 / total as f64)
}
