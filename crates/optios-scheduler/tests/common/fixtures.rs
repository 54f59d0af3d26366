//! Test fixtures for scheduler integration tests.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use optios_scheduler::{
    MetricsSampler, PersistenceSink, Process, Result, SchedulerError, SystemSample,
    TelemetryRecord,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Builder for creating test Process instances.
pub struct ProcessBuilder {
    pid: u32,
    burst_time: u32,
    priority: u32,
    memory: u32,
    arrival_time: u32,
}

impl ProcessBuilder {
    /// Creates a new process builder with the given pid.
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            burst_time: 1,
            priority: 1,
            memory: 128,
            arrival_time: 0,
        }
    }

    /// Sets the burst time.
    pub fn burst(mut self, burst_time: u32) -> Self {
        self.burst_time = burst_time;
        self
    }

    /// Sets the arrival tick.
    pub fn arrives_at(mut self, arrival_time: u32) -> Self {
        self.arrival_time = arrival_time;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Builds the Process.
    pub fn build(self) -> Process {
        Process::new(
            self.pid,
            self.burst_time,
            self.priority,
            self.memory,
            self.arrival_time,
        )
    }
}

/// Creates a batch from `(burst, arrival)` pairs with pids starting at 1.
pub fn batch(spec: &[(u32, u32)]) -> Vec<Process> {
    spec.iter()
        .zip(1..)
        .map(|(&(burst, arrival), pid)| {
            ProcessBuilder::new(pid)
                .burst(burst)
                .arrives_at(arrival)
                .build()
        })
        .collect()
}

/// Creates a record whose timestamp increases with `n`.
pub fn record(n: u32) -> TelemetryRecord {
    let base = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_else(Utc::now);
    TelemetryRecord {
        timestamp: base + ChronoDuration::seconds(i64::from(n)),
        cpu_percent: 25.0,
        memory_usage: 40.0,
        ready_queue_size: n,
        avg_burst_time: 6.0,
        avg_priority: 3.0,
    }
}

/// Sampler that replays a script of readings, repeating the last one.
pub struct ScriptedSampler {
    script: Mutex<VecDeque<Result<SystemSample>>>,
    last: SystemSample,
    calls: AtomicUsize,
}

impl ScriptedSampler {
    /// Creates a sampler that always returns `sample`.
    pub fn constant(sample: SystemSample) -> Self {
        Self::scripted(Vec::new(), sample)
    }

    /// Creates a sampler that plays `script` and then repeats `last`.
    pub fn scripted(script: Vec<Result<SystemSample>>, last: SystemSample) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of sample calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSampler for ScriptedSampler {
    async fn sample(&self) -> Result<SystemSample> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or(Ok(self.last))
    }
}

/// A moderately loaded system.
pub fn busy_sample() -> SystemSample {
    SystemSample {
        cpu_percent: 60.0,
        memory_percent: 45.0,
        process_count: 180,
    }
}

/// Sink that always fails.
pub struct FailingSink;

#[async_trait]
impl PersistenceSink for FailingSink {
    async fn append(&self, _record: &TelemetryRecord) -> Result<()> {
        Err(SchedulerError::Persistence("database is locked".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
