//! Background trainer feeding telemetry transitions to the controller.
//!
//! Every cycle the trainer takes the most recent records, turns each
//! consecutive pair into a transition and applies one update per pair. The
//! action for each update comes from the controller's own epsilon-greedy
//! choice, not from what was actually scheduled, so learning is off-policy.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agent::QLearningController;
use crate::config::TrainerConfig;
use crate::store::TelemetryStore;
use crate::telemetry::TelemetryRecord;

/// Reward for moving from `current` to `next`.
///
/// Shrinking queue, burst and memory are rewarded; a long queue afterwards
/// is penalised.
#[must_use]
pub fn reward(current: &TelemetryRecord, next: &TelemetryRecord) -> f64 {
    let rq = f64::from(current.ready_queue_size);
    let next_rq = f64::from(next.ready_queue_size);

    0.5 * (rq - next_rq) + 0.2 * (current.avg_burst_time - next.avg_burst_time)
        + 0.1 * (current.memory_usage - next.memory_usage)
        - 0.01 * next_rq
}

/// Result of one training cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Fewer than two records, or nothing new since the last cycle.
    Skipped,
    /// A batch was trained.
    Trained {
        /// Number of updates applied.
        transitions: usize,
        /// Epsilon after decay.
        epsilon: f64,
    },
}

/// Trains the controller from the telemetry store.
#[derive(Debug)]
pub struct Trainer {
    controller: Arc<QLearningController>,
    store: Arc<TelemetryStore>,
    config: TrainerConfig,
    last_sequence: u64,
}

impl Trainer {
    /// Creates a trainer.
    #[must_use]
    pub const fn new(
        config: TrainerConfig,
        controller: Arc<QLearningController>,
        store: Arc<TelemetryStore>,
    ) -> Self {
        Self {
            controller,
            store,
            config,
            last_sequence: 0,
        }
    }

    /// Returns the configured delay between cycles.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Runs one training cycle.
    pub fn train_cycle(&mut self) -> CycleOutcome {
        let snapshot = self.store.snapshot();
        if snapshot.records.len() < 2 || snapshot.sequence <= self.last_sequence {
            return CycleOutcome::Skipped;
        }

        let start = snapshot
            .records
            .len()
            .saturating_sub(self.config.batch_size.max(2));
        let batch = &snapshot.records[start..];

        for pair in batch.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let state = current.state_vector();
            let next_state = next.state_vector();
            let action = self.controller.choose_action(&state);
            self.controller
                .update(&state, action, reward(current, next), &next_state);
        }

        self.last_sequence = snapshot.sequence;
        let epsilon = self
            .controller
            .decay_epsilon(self.config.epsilon_decay, self.config.epsilon_floor);

        CycleOutcome::Trained {
            transitions: batch.len() - 1,
            epsilon,
        }
    }

    /// Run the training loop until the cancellation token is triggered.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            batch_size = self.config.batch_size,
            "trainer started"
        );

        while !cancel.is_cancelled() {
            if let CycleOutcome::Trained { transitions, epsilon } = self.train_cycle() {
                debug!(transitions, epsilon, "training batch applied");
            }

            tokio::select! {
                biased;

                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!(epsilon = self.controller.epsilon(), "trainer stopped");
    }
}
