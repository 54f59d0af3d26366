//! Telemetry records produced by the monitor and consumed by the trainer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::StateVector;
use crate::error::{Result, SchedulerError};

/// One timestamped snapshot of system load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Wall-clock time the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// CPU utilisation in percent.
    pub cpu_percent: f64,
    /// Memory utilisation in percent.
    pub memory_usage: f64,
    /// Number of processes competing for the CPU.
    pub ready_queue_size: u32,
    /// Estimated mean burst time.
    pub avg_burst_time: f64,
    /// Estimated mean priority.
    pub avg_priority: f64,
}

impl TelemetryRecord {
    /// Controller input: `[ready_queue_size, avg_burst_time, avg_priority, memory_usage]`.
    #[must_use]
    pub fn state_vector(&self) -> StateVector {
        [
            f64::from(self.ready_queue_size),
            self.avg_burst_time,
            self.avg_priority,
            self.memory_usage,
        ]
    }

    /// Checks that every numeric field is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("cpu_percent", self.cpu_percent),
            ("memory_usage", self.memory_usage),
            ("avg_burst_time", self.avg_burst_time),
            ("avg_priority", self.avg_priority),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SchedulerError::InvalidTelemetry(format!("{name} = {value}")));
            }
        }
        Ok(())
    }
}
