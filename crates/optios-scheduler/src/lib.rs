//! Optios scheduler - scheduling simulation and an online policy advisor.
//!
//! The crate is responsible for:
//!
//! - **Scheduling simulation**: FCFS, non-preemptive SJF and round robin over
//!   synthetic process batches, with waiting/turnaround summaries
//! - **Telemetry**: a bounded, thread-safe history of system load snapshots,
//!   forwarded to a persistence sink
//! - **Policy learning**: a tabular Q-learning controller that maps the
//!   current load to the policy expected to minimise waiting time
//! - **Background loops**: a producer sampling system metrics and a trainer
//!   updating the controller from the telemetry stream
//!
//! # Architecture
//!
//! ```text
//! MetricsSampler -> TelemetryProducer -> TelemetryStore -> Trainer -> QLearningController
//!                                             |                             |
//!                                             +---------> Advisor <---------+
//! ```
//!
//! The advisor is the read-only side: it never trains, it only asks the
//! controller for its greedy choice and runs comparison simulations.
//!
//! # Example
//!
//! ```ignore
//! use optios_scheduler::{Collaborators, OptiosConfig, OptiosService};
//!
//! let service = OptiosService::start(&OptiosConfig::default(), collaborators);
//! let recommendation = service.advisor().recommend().await?;
//! service.shutdown().await;
//! ```

pub mod advisor;
pub mod agent;
pub mod config;
pub mod decision_log;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod process;
pub mod sampler;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod trainer;

// Re-export main types
pub use advisor::{Advisor, Recommendation};
pub use agent::{state_index, Action, QLearningController, StateVector};
pub use config::{
    AgentConfig, DecisionLogConfig, MonitorConfig, OptiosConfig, SimulationConfig, StoreConfig,
    TrainerConfig,
};
pub use decision_log::{CsvDecisionLog, DecisionLogSink};
pub use engine::{Fcfs, RoundRobin, SchedulerEngine, SchedulingMetrics, SchedulingPolicy, ShortestJobFirst};
pub use error::{Result, SchedulerError};
pub use monitor::TelemetryProducer;
pub use process::{Pid, Process, ProcessSetGenerator};
pub use sampler::{MetricsSampler, ProcfsSampler, SystemSample};
pub use service::{Collaborators, OptiosService, ServiceStatus};
pub use store::{HistorySnapshot, MemorySink, NullSink, PersistenceSink, SqliteSink, TelemetryStore};
pub use telemetry::TelemetryRecord;
pub use trainer::{reward, CycleOutcome, Trainer};
