//! Synthetic processes used for policy comparison runs.

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::ops::RangeInclusive;

/// Process identifier, unique within a batch.
pub type Pid = u32;

/// A simulated process.
///
/// `waiting_time` and `turnaround_time` are outputs: they stay zero until a
/// scheduling run completes the process and are overwritten by every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    /// Process identifier.
    pub pid: Pid,
    /// Total CPU units required.
    pub burst_time: u32,
    /// Informational priority, not used for ordering.
    pub priority: u32,
    /// Informational memory footprint.
    pub memory: u32,
    /// Tick at which the process becomes eligible to run.
    pub arrival_time: u32,
    /// Time spent ready but not running.
    pub waiting_time: u32,
    /// Time from arrival to completion.
    pub turnaround_time: u32,
}

impl Process {
    /// Creates a process with zeroed outputs.
    #[must_use]
    pub const fn new(pid: Pid, burst_time: u32, priority: u32, memory: u32, arrival_time: u32) -> Self {
        Self {
            pid,
            burst_time,
            priority,
            memory,
            arrival_time,
            waiting_time: 0,
            turnaround_time: 0,
        }
    }
}

/// Generates randomised process batches.
pub struct ProcessSetGenerator {
    rng: Mutex<SmallRng>,
    burst: RangeInclusive<u32>,
    priority: RangeInclusive<u32>,
    memory: RangeInclusive<u32>,
    arrival: RangeInclusive<u32>,
}

impl ProcessSetGenerator {
    /// Default batch size.
    pub const DEFAULT_COUNT: usize = 10;

    /// Creates a generator seeded from system entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Creates a deterministic generator.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            burst: 2..=10,
            priority: 1..=5,
            memory: 50..=300,
            arrival: 0..=9,
        }
    }

    /// Generates `count` processes with pids `1..=count`, in pid order.
    pub fn generate(&self, count: usize) -> Vec<Process> {
        let mut rng = self.rng.lock();
        (1..=count)
            .map(|i| {
                let pid = Pid::try_from(i).unwrap_or(Pid::MAX);
                Process::new(
                    pid,
                    rng.gen_range(self.burst.clone()),
                    rng.gen_range(self.priority.clone()),
                    rng.gen_range(self.memory.clone()),
                    rng.gen_range(self.arrival.clone()),
                )
            })
            .collect()
    }
}

impl Default for ProcessSetGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessSetGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSetGenerator").finish_non_exhaustive()
    }
}
