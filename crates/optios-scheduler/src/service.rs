//! Composition of the store, controller and background loops.

use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::advisor::Advisor;
use crate::agent::QLearningController;
use crate::config::OptiosConfig;
use crate::decision_log::DecisionLogSink;
use crate::engine::SchedulerEngine;
use crate::monitor::TelemetryProducer;
use crate::process::ProcessSetGenerator;
use crate::sampler::MetricsSampler;
use crate::store::{PersistenceSink, TelemetryStore};
use crate::trainer::Trainer;

/// External collaborators injected into the service.
pub struct Collaborators {
    /// System metrics source.
    pub sampler: Arc<dyn MetricsSampler>,
    /// Durable telemetry backend.
    pub sink: Arc<dyn PersistenceSink>,
    /// Recommendation log.
    pub decision_log: Arc<dyn DecisionLogSink>,
}

/// Whether the background loops are alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    /// Telemetry producer running.
    pub monitor_running: bool,
    /// Trainer running.
    pub trainer_running: bool,
}

/// Running scheduler service.
///
/// Owns the shared store and controller and the two loop tasks. Dropping
/// the service without calling [`OptiosService::shutdown`] leaves the loops
/// running until the runtime stops.
pub struct OptiosService {
    store: Arc<TelemetryStore>,
    controller: Arc<QLearningController>,
    producer: Arc<TelemetryProducer>,
    advisor: Arc<Advisor>,
    cancel: CancellationToken,
    monitor: JoinHandle<()>,
    trainer: JoinHandle<()>,
}

impl OptiosService {
    /// Builds every component and spawns both loops on the current runtime.
    pub fn start(config: &OptiosConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            sampler,
            sink,
            decision_log,
        } = collaborators;

        let store = Arc::new(TelemetryStore::new(config.store.history_len, sink));
        let controller = Arc::new(QLearningController::new(&config.agent));
        info!(
            n_states = controller.n_states(),
            history_len = store.capacity(),
            "controller and store initialised"
        );

        let producer = Arc::new(TelemetryProducer::new(
            &config.monitor,
            sampler,
            Arc::clone(&store),
        ));
        let trainer = Trainer::new(
            config.trainer.clone(),
            Arc::clone(&controller),
            Arc::clone(&store),
        );

        let advisor = Arc::new(Advisor::new(
            Arc::clone(&store),
            Arc::clone(&controller),
            decision_log,
            SchedulerEngine::new(config.simulation.quantum),
            ProcessSetGenerator::new(),
            config.simulation.process_count,
        ));

        let cancel = CancellationToken::new();
        let monitor = {
            let producer = Arc::clone(&producer);
            let cancel = cancel.clone();
            tokio::spawn(async move { producer.run(cancel).await })
        };
        let trainer = tokio::spawn(trainer.run(cancel.clone()));

        Self {
            store,
            controller,
            producer,
            advisor,
            cancel,
            monitor,
            trainer,
        }
    }

    /// Shared telemetry store.
    #[must_use]
    pub fn store(&self) -> Arc<TelemetryStore> {
        Arc::clone(&self.store)
    }

    /// Shared controller.
    #[must_use]
    pub fn controller(&self) -> Arc<QLearningController> {
        Arc::clone(&self.controller)
    }

    /// Producer, for on-demand snapshots outside the loop.
    #[must_use]
    pub fn producer(&self) -> Arc<TelemetryProducer> {
        Arc::clone(&self.producer)
    }

    /// Recommendation front end.
    #[must_use]
    pub fn advisor(&self) -> Arc<Advisor> {
        Arc::clone(&self.advisor)
    }

    /// Reports which loops are still running.
    #[must_use]
    pub fn status(&self) -> ServiceStatus {
        let stopping = self.cancel.is_cancelled();
        ServiceStatus {
            monitor_running: !stopping && !self.monitor.is_finished(),
            trainer_running: !stopping && !self.trainer.is_finished(),
        }
    }

    /// Signals both loops to stop and waits for them.
    pub async fn shutdown(self) {
        info!("stopping background loops");
        self.cancel.cancel();

        for (name, handle) in [("monitor", self.monitor), ("trainer", self.trainer)] {
            if let Err(e) = handle.await {
                error!(task = name, error = %e, "background task failed");
            }
        }

        info!("background loops stopped");
    }
}

impl std::fmt::Debug for OptiosService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptiosService")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
