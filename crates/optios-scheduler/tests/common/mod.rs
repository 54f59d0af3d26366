//! Common test utilities for scheduler integration tests.

#![allow(dead_code)]

pub mod fixtures;

use optios_scheduler::{
    AgentConfig, Collaborators, CsvDecisionLog, MemorySink, MetricsSampler, MonitorConfig,
    OptiosConfig, OptiosService, TrainerConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use fixtures::{busy_sample, ScriptedSampler};

/// Running service wired to in-memory collaborators.
pub struct TestOptios {
    pub service: OptiosService,
    pub sink: Arc<MemorySink>,
    pub decision_log: Arc<CsvDecisionLog>,
    pub dir: TempDir,
}

impl TestOptios {
    /// Starts a service with fast loops and a constant sampler.
    pub fn start() -> Self {
        Self::with_sampler(Arc::new(ScriptedSampler::constant(busy_sample())))
    }

    /// Starts a service with fast loops and the given sampler.
    pub fn with_sampler(sampler: Arc<dyn MetricsSampler>) -> Self {
        Self::with_config(fast_config(), sampler)
    }

    /// Starts a service with custom configuration.
    pub fn with_config(config: OptiosConfig, sampler: Arc<dyn MetricsSampler>) -> Self {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let decision_log = Arc::new(CsvDecisionLog::new(dir.path().join("decisions.csv")));

        let service = OptiosService::start(
            &config,
            Collaborators {
                sampler,
                sink: sink.clone(),
                decision_log: decision_log.clone(),
            },
        );

        Self {
            service,
            sink,
            decision_log,
            dir,
        }
    }
}

/// Configuration with millisecond loop intervals and fixed seeds.
pub fn fast_config() -> OptiosConfig {
    OptiosConfig {
        monitor: MonitorConfig {
            interval: Duration::from_millis(10),
            seed: Some(1),
            ..MonitorConfig::default()
        },
        trainer: TrainerConfig {
            interval: Duration::from_millis(10),
            ..TrainerConfig::default()
        },
        agent: AgentConfig {
            seed: Some(2),
            ..AgentConfig::default()
        },
        ..OptiosConfig::default()
    }
}
