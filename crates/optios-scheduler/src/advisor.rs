//! Live policy recommendation for request-side callers.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::agent::{Action, QLearningController, StateVector};
use crate::decision_log::DecisionLogSink;
use crate::engine::{SchedulerEngine, SchedulingMetrics};
use crate::error::Result;
use crate::process::ProcessSetGenerator;
use crate::store::TelemetryStore;

/// Recommendation for the current system state.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Greedy action for `state`.
    pub choice: Action,
    /// State the recommendation was made for.
    pub state: StateVector,
    /// FCFS, SJF and RR run on freshly generated batches.
    pub comparisons: Vec<SchedulingMetrics>,
}

impl Recommendation {
    /// Comparison with the lowest average waiting time; first wins ties.
    #[must_use]
    pub fn fastest(&self) -> Option<&SchedulingMetrics> {
        self.comparisons
            .iter()
            .reduce(|best, m| if m.avg_waiting < best.avg_waiting { m } else { best })
    }
}

/// Read-only consumer of the store and controller.
pub struct Advisor {
    store: Arc<TelemetryStore>,
    controller: Arc<QLearningController>,
    decision_log: Arc<dyn DecisionLogSink>,
    engine: SchedulerEngine,
    generator: ProcessSetGenerator,
    process_count: usize,
}

impl Advisor {
    /// Creates an advisor.
    pub fn new(
        store: Arc<TelemetryStore>,
        controller: Arc<QLearningController>,
        decision_log: Arc<dyn DecisionLogSink>,
        engine: SchedulerEngine,
        generator: ProcessSetGenerator,
        process_count: usize,
    ) -> Self {
        Self {
            store,
            controller,
            decision_log,
            engine,
            generator,
            process_count: process_count.max(1),
        }
    }

    /// State of the latest record, zeros when nothing has been recorded.
    pub fn current_state(&self) -> StateVector {
        self.store
            .latest()
            .map_or([0.0; 4], |record| record.state_vector())
    }

    /// Recommends a policy and compares all three on fresh batches.
    ///
    /// Decision log failures are logged and do not fail the call.
    pub async fn recommend(&self) -> Result<Recommendation> {
        let state = self.current_state();
        let choice = self.controller.best_action_for_state(&state);

        if let Err(e) = self.decision_log.append(&state, choice).await {
            warn!(error = %e, "failed to log decision");
        }

        let comparisons = self.compare()?;
        Ok(Recommendation {
            choice,
            state,
            comparisons,
        })
    }

    /// Runs every policy on its own freshly generated batch.
    pub fn compare(&self) -> Result<Vec<SchedulingMetrics>> {
        Action::ALL
            .iter()
            .map(|&action| {
                let mut batch = self.generator.generate(self.process_count);
                self.engine.run(action, &mut batch)
            })
            .collect()
    }
}

impl std::fmt::Debug for Advisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Advisor")
            .field("process_count", &self.process_count)
            .finish_non_exhaustive()
    }
}
