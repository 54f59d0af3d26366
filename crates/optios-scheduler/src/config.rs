//! Configuration types for the scheduler.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SchedulerError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OptiosConfig {
    /// Telemetry producer configuration.
    pub monitor: MonitorConfig,
    /// Trainer loop configuration.
    pub trainer: TrainerConfig,
    /// Q-learning controller configuration.
    pub agent: AgentConfig,
    /// Telemetry store configuration.
    pub store: StoreConfig,
    /// Process simulation configuration.
    pub simulation: SimulationConfig,
    /// Decision log configuration.
    pub decision_log: DecisionLogConfig,
}

impl OptiosConfig {
    /// Loads configuration from `optios.toml` and `OPTIOS_` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from("optios.toml")
    }

    /// Loads configuration from a specific TOML file plus the environment.
    pub fn load_from(path: &str) -> Result<Self> {
        Self::load_with_env(path, Env::prefixed("OPTIOS_"))
    }

    /// Nested keys in the environment are separated by `__`, so
    /// `OPTIOS_STORE__HISTORY_LEN` sets `store.history_len`.
    fn load_with_env(path: &str, env: Env) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path))
            .merge(env.split("__"))
            .extract()
            .map_err(|e| SchedulerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the loops and the controller cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.store.history_len == 0 {
            return Err(SchedulerError::Config("store.history_len must be positive".into()));
        }
        if self.agent.n_states == 0 {
            return Err(SchedulerError::Config("agent.n_states must be positive".into()));
        }
        if !(self.agent.alpha > 0.0 && self.agent.alpha <= 1.0) {
            return Err(SchedulerError::Config(format!(
                "agent.alpha must be in (0, 1], got {}",
                self.agent.alpha
            )));
        }
        if !(self.agent.gamma > 0.0 && self.agent.gamma <= 1.0) {
            return Err(SchedulerError::Config(format!(
                "agent.gamma must be in (0, 1], got {}",
                self.agent.gamma
            )));
        }
        if !(0.0..=1.0).contains(&self.agent.epsilon) {
            return Err(SchedulerError::Config(format!(
                "agent.epsilon must be in [0, 1], got {}",
                self.agent.epsilon
            )));
        }
        if !(0.0..=1.0).contains(&self.trainer.epsilon_floor)
            || !(0.0..=1.0).contains(&self.trainer.epsilon_decay)
        {
            return Err(SchedulerError::Config(
                "trainer.epsilon_floor and trainer.epsilon_decay must be in [0, 1]".into(),
            ));
        }
        if self.agent.epsilon < self.trainer.epsilon_floor {
            return Err(SchedulerError::Config(format!(
                "agent.epsilon {} is below trainer.epsilon_floor {}",
                self.agent.epsilon, self.trainer.epsilon_floor
            )));
        }
        if self.trainer.batch_size < 2 {
            return Err(SchedulerError::Config("trainer.batch_size must be at least 2".into()));
        }
        if self.simulation.quantum == 0 {
            return Err(SchedulerError::Config("simulation.quantum must be positive".into()));
        }
        if self.simulation.process_count == 0 {
            return Err(SchedulerError::Config(
                "simulation.process_count must be positive".into(),
            ));
        }
        let [lo, hi] = self.monitor.burst_range;
        if !(lo.is_finite() && hi.is_finite() && 0.0 <= lo && lo < hi) {
            return Err(SchedulerError::Config(format!(
                "monitor.burst_range is empty or negative: [{lo}, {hi}]"
            )));
        }
        let [lo, hi] = self.monitor.priority_range;
        if !(lo.is_finite() && hi.is_finite() && 0.0 <= lo && lo < hi) {
            return Err(SchedulerError::Config(format!(
                "monitor.priority_range is empty or negative: [{lo}, {hi}]"
            )));
        }
        Ok(())
    }
}

/// Telemetry producer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Target cycle length, sampling time included.
    #[serde(with = "serde_duration_secs")]
    pub interval: Duration,
    /// Window over which CPU utilisation is measured.
    pub cpu_sample_window_ms: u64,
    /// Range of the synthetic burst time, scaled by CPU load.
    pub burst_range: [f64; 2],
    /// Range of the synthetic priority.
    pub priority_range: [f64; 2],
    /// Fixed RNG seed for the synthetic fields.
    pub seed: Option<u64>,
}

impl MonitorConfig {
    /// Returns the CPU sample window as a duration.
    #[must_use]
    pub const fn cpu_sample_window(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_window_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            cpu_sample_window_ms: 1000,
            burst_range: [5.0, 50.0],
            priority_range: [1.0, 10.0],
            seed: None,
        }
    }
}

/// Trainer loop configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Delay between training cycles.
    #[serde(with = "serde_duration_secs")]
    pub interval: Duration,
    /// Number of most recent records used per cycle.
    pub batch_size: usize,
    /// Multiplicative epsilon decay applied after each trained batch.
    pub epsilon_decay: f64,
    /// Lower bound for epsilon.
    pub epsilon_floor: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            batch_size: 10,
            epsilon_decay: 0.999,
            epsilon_floor: 0.02,
        }
    }
}

/// Q-learning controller configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Number of discretised states.
    pub n_states: usize,
    /// Learning rate.
    pub alpha: f64,
    /// Discount factor.
    pub gamma: f64,
    /// Initial exploration rate.
    pub epsilon: f64,
    /// Fixed RNG seed for exploration.
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            n_states: 200,
            alpha: 0.2,
            gamma: 0.9,
            epsilon: 0.25,
            seed: None,
        }
    }
}

/// Telemetry store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of records kept in memory.
    pub history_len: usize,
    /// SQLite database path.
    pub db_path: PathBuf,
    /// Whether records are written to the database at all.
    pub persist: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_len: 200,
            db_path: PathBuf::from("optios.db"),
            persist: true,
        }
    }
}

/// Process simulation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Processes per generated batch.
    pub process_count: usize,
    /// Round-robin time quantum.
    pub quantum: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            process_count: 10,
            quantum: 3,
        }
    }
}

/// Decision log configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecisionLogConfig {
    /// CSV file receiving one row per recommendation.
    pub path: PathBuf,
}

impl Default for DecisionLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("rl_predictions.csv"),
        }
    }
}

/// Serde helper for Duration as seconds.
mod serde_duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
