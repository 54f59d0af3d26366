//! Scheduling policies and the engine that runs them over a process batch.

use serde::Serialize;
use std::collections::VecDeque;

use crate::agent::Action;
use crate::error::{Result, SchedulerError};
use crate::process::Process;

/// Trait for scheduling policies.
///
/// A policy simulates the batch to completion and writes each process's
/// `waiting_time` and `turnaround_time` in place.
pub trait SchedulingPolicy: Send + Sync {
    /// Runs the batch to completion.
    fn schedule(&self, processes: &mut [Process]);

    /// Returns the action this policy implements.
    fn action(&self) -> Action;
}

/// First-come-first-served.
///
/// Runs processes in slice order. The batch is expected to be ordered by
/// arrival already; no sorting is done.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fcfs;

impl SchedulingPolicy for Fcfs {
    fn schedule(&self, processes: &mut [Process]) {
        let mut clock = 0;
        for p in processes.iter_mut() {
            clock = clock.max(p.arrival_time);
            p.waiting_time = clock - p.arrival_time;
            clock += p.burst_time;
            p.turnaround_time = p.waiting_time + p.burst_time;
        }
    }

    fn action(&self) -> Action {
        Action::Fcfs
    }
}

/// Non-preemptive shortest-job-first.
///
/// At each decision point the arrived, unfinished process with the smallest
/// burst runs to completion. Equal bursts go to the earlier arrival, then to
/// the earlier slice position. The clock idles one tick at a time while
/// nothing has arrived.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShortestJobFirst;

impl SchedulingPolicy for ShortestJobFirst {
    fn schedule(&self, processes: &mut [Process]) {
        let mut done = vec![false; processes.len()];
        let mut completed = 0;
        let mut clock = 0;

        while completed < processes.len() {
            let next = processes
                .iter()
                .enumerate()
                .filter(|(i, p)| !done[*i] && p.arrival_time <= clock)
                .min_by_key(|(i, p)| (p.burst_time, p.arrival_time, *i))
                .map(|(i, _)| i);

            match next {
                Some(i) => {
                    let p = &mut processes[i];
                    p.waiting_time = clock - p.arrival_time;
                    clock += p.burst_time;
                    p.turnaround_time = p.waiting_time + p.burst_time;
                    done[i] = true;
                    completed += 1;
                }
                None => clock += 1,
            }
        }
    }

    fn action(&self) -> Action {
        Action::Sjf
    }
}

/// Round robin with a fixed time quantum.
#[derive(Debug, Clone, Copy)]
pub struct RoundRobin {
    quantum: u32,
}

impl RoundRobin {
    /// Default time quantum.
    pub const DEFAULT_QUANTUM: u32 = 3;

    /// Creates a round-robin policy. A zero quantum is raised to one.
    #[must_use]
    pub fn new(quantum: u32) -> Self {
        Self {
            quantum: quantum.max(1),
        }
    }

    /// Returns the time quantum.
    #[must_use]
    pub const fn quantum(&self) -> u32 {
        self.quantum
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new(Self::DEFAULT_QUANTUM)
    }
}

impl SchedulingPolicy for RoundRobin {
    fn schedule(&self, processes: &mut [Process]) {
        let mut remaining: Vec<u32> = processes.iter().map(|p| p.burst_time).collect();
        let mut queue: VecDeque<usize> = VecDeque::with_capacity(processes.len());
        let mut clock = 0;

        loop {
            // Admit in batch order; the process that just ran goes behind
            // everything admitted during its slice.
            for (i, p) in processes.iter().enumerate() {
                if p.arrival_time <= clock && remaining[i] > 0 && !queue.contains(&i) {
                    queue.push_back(i);
                }
            }

            let Some(current) = queue.pop_front() else {
                if remaining.iter().all(|r| *r == 0) {
                    break;
                }
                clock += 1;
                continue;
            };

            let slice = self.quantum.min(remaining[current]);
            remaining[current] -= slice;
            clock += slice;

            for (i, p) in processes.iter().enumerate() {
                if i != current
                    && p.arrival_time <= clock
                    && remaining[i] > 0
                    && !queue.contains(&i)
                {
                    queue.push_back(i);
                }
            }

            if remaining[current] == 0 {
                let p = &mut processes[current];
                p.turnaround_time = clock - p.arrival_time;
                p.waiting_time = p.turnaround_time - p.burst_time;
            }
        }
    }

    fn action(&self) -> Action {
        Action::RoundRobin
    }
}

/// Summary of one scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulingMetrics {
    /// Policy that produced the run.
    pub algorithm: Action,
    /// Mean waiting time, rounded to two decimals.
    pub avg_waiting: f64,
    /// Mean turnaround time, rounded to two decimals.
    pub avg_turnaround: f64,
}

impl SchedulingMetrics {
    /// Computes the metrics of a scheduled batch.
    pub fn from_batch(algorithm: Action, processes: &[Process]) -> Result<Self> {
        if processes.is_empty() {
            return Err(SchedulerError::EmptyBatch);
        }

        let mean = |total: u64| {
            #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
            let avg = total as f64 / processes.len() as f64;
            round2(avg)
        };
        let waiting: u64 = processes.iter().map(|p| u64::from(p.waiting_time)).sum();
        let turnaround: u64 = processes.iter().map(|p| u64::from(p.turnaround_time)).sum();

        Ok(Self {
            algorithm,
            avg_waiting: mean(waiting),
            avg_turnaround: mean(turnaround),
        })
    }
}

/// Rounds to two decimals, halves to even.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Runs scheduling policies over process batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerEngine {
    round_robin: RoundRobin,
}

impl SchedulerEngine {
    /// Creates an engine whose round-robin policy uses `quantum`.
    #[must_use]
    pub fn new(quantum: u32) -> Self {
        Self {
            round_robin: RoundRobin::new(quantum),
        }
    }

    /// Returns the policy implementing `action`.
    #[must_use]
    pub fn policy(&self, action: Action) -> &dyn SchedulingPolicy {
        match action {
            Action::Fcfs => &Fcfs,
            Action::Sjf => &ShortestJobFirst,
            Action::RoundRobin => &self.round_robin,
        }
    }

    /// Schedules the batch under `action` and summarises it.
    ///
    /// Overwrites every process's waiting and turnaround times. An empty
    /// batch is rejected untouched.
    pub fn run(&self, action: Action, processes: &mut [Process]) -> Result<SchedulingMetrics> {
        if processes.is_empty() {
            return Err(SchedulerError::EmptyBatch);
        }
        let policy = self.policy(action);
        policy.schedule(processes);
        SchedulingMetrics::from_batch(policy.action(), processes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::process::ProcessSetGenerator;
    use rstest::rstest;

    fn batch(spec: &[(u32, u32)]) -> Vec<Process> {
        spec.iter()
            .zip(1..)
            .map(|(&(burst, arrival), pid)| Process::new(pid, burst, 1, 64, arrival))
            .collect()
    }

    fn times(processes: &[Process]) -> Vec<(u32, u32)> {
        processes
            .iter()
            .map(|p| (p.waiting_time, p.turnaround_time))
            .collect()
    }

    #[test]
    fn fcfs_three_process_scenario() {
        let mut processes = batch(&[(4, 0), (2, 1), (6, 2)]);
        let metrics = SchedulerEngine::default()
            .run(Action::Fcfs, &mut processes)
            .unwrap();

        assert_eq!(times(&processes), vec![(0, 4), (3, 5), (4, 10)]);
        assert_eq!(metrics.algorithm, Action::Fcfs);
        assert!((metrics.avg_waiting - 2.33).abs() < 1e-9);
        assert!((metrics.avg_turnaround - 6.33).abs() < 1e-9);
    }

    #[test]
    fn fcfs_jumps_idle_gaps() {
        let mut processes = batch(&[(2, 5), (3, 20)]);
        Fcfs.schedule(&mut processes);
        assert_eq!(times(&processes), vec![(0, 2), (0, 3)]);
    }

    #[test]
    fn fcfs_keeps_input_order() {
        // Out-of-order arrival: the late process still runs first.
        let mut processes = batch(&[(3, 4), (2, 0)]);
        Fcfs.schedule(&mut processes);
        assert_eq!(times(&processes), vec![(0, 3), (7, 9)]);
    }

    #[test]
    fn sjf_picks_shortest_ready_job() {
        let mut processes = batch(&[(8, 0), (4, 1), (2, 2), (1, 3)]);
        let metrics = SchedulerEngine::default()
            .run(Action::Sjf, &mut processes)
            .unwrap();

        assert_eq!(times(&processes), vec![(0, 8), (7, 11), (7, 9), (5, 6)]);
        assert!((metrics.avg_waiting - 4.75).abs() < 1e-9);
        assert!((metrics.avg_turnaround - 8.5).abs() < 1e-9);
    }

    #[test]
    fn sjf_idles_until_first_arrival() {
        let mut processes = batch(&[(2, 5), (1, 6)]);
        ShortestJobFirst.schedule(&mut processes);
        assert_eq!(times(&processes), vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn sjf_ties_go_to_batch_order() {
        let mut processes = batch(&[(5, 0), (3, 1), (3, 2)]);
        ShortestJobFirst.schedule(&mut processes);
        assert_eq!(times(&processes), vec![(0, 5), (4, 7), (6, 9)]);
    }

    #[test]
    fn sjf_ties_go_to_earliest_arrival() {
        // The later slice entry arrived first and wins the tie at t=5.
        let mut processes = batch(&[(5, 0), (3, 3), (3, 1)]);
        ShortestJobFirst.schedule(&mut processes);
        assert_eq!(times(&processes), vec![(0, 5), (5, 8), (4, 7)]);
    }

    #[test]
    fn sjf_equal_arrival_ties_fall_back_to_batch_order() {
        let mut processes = batch(&[(4, 0), (2, 2), (2, 2)]);
        ShortestJobFirst.schedule(&mut processes);
        assert_eq!(times(&processes), vec![(0, 4), (2, 4), (4, 6)]);
    }

    #[test]
    fn averages_round_half_to_even() {
        // Waiting sum 17 and turnaround sum 41 over 8 processes: 2.125 and 5.125.
        let mut processes = batch(&[(1, 0); 8]);
        for (p, (wait, burst)) in processes
            .iter_mut()
            .zip([(0, 3), (1, 3), (2, 3), (3, 3), (4, 3), (5, 3), (1, 3), (1, 3)])
        {
            p.burst_time = burst;
            p.waiting_time = wait;
            p.turnaround_time = wait + burst;
        }

        let metrics = SchedulingMetrics::from_batch(Action::Fcfs, &processes).unwrap();
        assert!((metrics.avg_waiting - 2.12).abs() < 1e-9);
        assert!((metrics.avg_turnaround - 5.12).abs() < 1e-9);
    }

    #[rstest]
    #[case(2.375, 2.38)]
    #[case(2.625, 2.62)]
    #[case(1.0 / 3.0, 0.33)]
    #[case(0.0, 0.0)]
    fn round2_cases(#[case] value: f64, #[case] expected: f64) {
        assert!((round2(value) - expected).abs() < 1e-9);
    }

    #[test]
    fn round_robin_interleaves_slices() {
        let mut processes = batch(&[(4, 0), (2, 1), (6, 2)]);
        let metrics = SchedulerEngine::new(3)
            .run(Action::RoundRobin, &mut processes)
            .unwrap();

        assert_eq!(times(&processes), vec![(5, 9), (2, 4), (4, 10)]);
        assert_eq!(metrics.algorithm, Action::RoundRobin);
        assert!((metrics.avg_waiting - 3.67).abs() < 1e-9);
        assert!((metrics.avg_turnaround - 7.67).abs() < 1e-9);
    }

    #[test]
    fn round_robin_idles_when_queue_empty() {
        let mut processes = batch(&[(1, 0), (2, 4)]);
        RoundRobin::default().schedule(&mut processes);
        assert_eq!(times(&processes), vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn round_robin_zero_quantum_still_terminates() {
        let rr = RoundRobin::new(0);
        assert_eq!(rr.quantum(), 1);
        let mut processes = batch(&[(2, 0), (2, 0)]);
        rr.schedule(&mut processes);
        assert_eq!(times(&processes), vec![(1, 3), (2, 4)]);
    }

    #[test]
    fn round_robin_equal_jobs_finish_within_one_rotation() {
        let quantum = 3;
        let mut processes = batch(&[(7, 0), (7, 0), (7, 0), (7, 0)]);
        RoundRobin::new(quantum).schedule(&mut processes);

        let completions: Vec<u32> = processes.iter().map(|p| p.turnaround_time).collect();
        let spread = completions.iter().max().unwrap() - completions.iter().min().unwrap();
        assert!(spread <= quantum * 4, "spread {spread} exceeds one rotation");
        assert!(completions.windows(2).all(|w| w[0] < w[1]));
    }

    #[rstest]
    #[case(Action::Fcfs)]
    #[case(Action::Sjf)]
    #[case(Action::RoundRobin)]
    fn empty_batch_is_rejected(#[case] action: Action) {
        let result = SchedulerEngine::default().run(action, &mut []);
        assert!(matches!(result, Err(SchedulerError::EmptyBatch)));
    }

    #[rstest]
    #[case(Action::Fcfs)]
    #[case(Action::Sjf)]
    #[case(Action::RoundRobin)]
    fn turnaround_is_waiting_plus_burst(#[case] action: Action) {
        let engine = SchedulerEngine::default();
        for seed in 0..50 {
            let mut processes = ProcessSetGenerator::with_seed(seed).generate(10);
            engine.run(action, &mut processes).unwrap();
            for p in &processes {
                assert_eq!(p.turnaround_time, p.waiting_time + p.burst_time);
            }
        }
    }

    #[rstest]
    #[case(Action::Fcfs)]
    #[case(Action::Sjf)]
    #[case(Action::RoundRobin)]
    fn rerun_is_deterministic(#[case] action: Action) {
        let engine = SchedulerEngine::default();
        let original = ProcessSetGenerator::with_seed(99).generate(12);

        let mut first = original.clone();
        let mut second = original;
        let a = engine.run(action, &mut first).unwrap();
        let b = engine.run(action, &mut second).unwrap();

        assert_eq!(first, second);
        assert_eq!(a, b);
    }

    #[test]
    fn sjf_never_worse_than_fcfs_with_equal_arrivals() {
        let engine = SchedulerEngine::default();
        for seed in 0..200 {
            let mut fcfs = ProcessSetGenerator::with_seed(seed).generate(10);
            for p in &mut fcfs {
                p.arrival_time = 0;
            }
            let mut sjf = fcfs.clone();

            let f = engine.run(Action::Fcfs, &mut fcfs).unwrap();
            let s = engine.run(Action::Sjf, &mut sjf).unwrap();
            assert!(s.avg_waiting <= f.avg_waiting, "seed {seed}: {s:?} vs {f:?}");
        }
    }

    #[test]
    fn policy_lookup_matches_action() {
        let engine = SchedulerEngine::new(5);
        for action in Action::ALL {
            assert_eq!(engine.policy(action).action(), action);
        }
    }
}
