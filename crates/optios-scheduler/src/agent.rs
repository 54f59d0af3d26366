//! Tabular Q-learning controller that recommends a scheduling policy.
//!
//! The controller discretises a telemetry state vector
//! `[ready_queue_size, avg_burst_time, avg_priority, memory_usage]` into one
//! of `n_states` buckets and keeps a value per (state, action) pair. The
//! trainer feeds it transitions; request-side callers only read the greedy
//! action through [`QLearningController::best_action_for_state`].
//!
//! Selection, update and epsilon decay each take the single controller lock
//! for their whole read-modify-write span. A trainer update and an external
//! best-action query may interleave between calls; both are best-effort.

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;

/// Telemetry state vector fed to the controller.
pub type StateVector = [f64; 4];

/// Scheduling policy the controller can recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// First-come-first-served.
    #[serde(rename = "FCFS")]
    Fcfs,
    /// Non-preemptive shortest-job-first.
    #[serde(rename = "SJF")]
    Sjf,
    /// Round robin.
    #[serde(rename = "RR")]
    RoundRobin,
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Self; 3] = [Self::Fcfs, Self::Sjf, Self::RoundRobin];

    /// Number of actions.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the Q-table column for this action.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Fcfs => 0,
            Self::Sjf => 1,
            Self::RoundRobin => 2,
        }
    }

    /// Maps a Q-table column back to an action.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Fcfs),
            1 => Some(Self::Sjf),
            2 => Some(Self::RoundRobin),
            _ => None,
        }
    }

    /// Short label used in logs and decision records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fcfs => "FCFS",
            Self::Sjf => "SJF",
            Self::RoundRobin => "RR",
        }
    }

    /// Long algorithm name.
    #[must_use]
    pub const fn policy_name(self) -> &'static str {
        match self {
            Self::Fcfs => "FCFS",
            Self::Sjf => "SJF",
            Self::RoundRobin => "Round Robin",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a state vector to a table row.
///
/// Only the queue size, burst time and memory usage take part; each is
/// floored and clamped to 100 before hashing. Collisions are expected.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn state_index(state: &StateVector, n_states: usize) -> usize {
    // `as` saturates: NaN and negatives land on 0.
    let bucket = |v: f64| (v.floor() as usize).min(100);
    let rq = bucket(state[0]);
    let burst = bucket(state[1]);
    let mem = bucket(state[3]);
    (rq * 3 + burst * 5 + mem * 7) % n_states.max(1)
}

/// Index of the first maximum in a row.
fn argmax(row: &[f64; Action::COUNT]) -> usize {
    let mut best = 0;
    for (i, value) in row.iter().enumerate().skip(1) {
        if *value > row[best] {
            best = i;
        }
    }
    best
}

struct Inner {
    q_table: Vec<[f64; Action::COUNT]>,
    epsilon: f64,
    rng: SmallRng,
}

/// Q-learning controller with an epsilon-greedy policy.
pub struct QLearningController {
    n_states: usize,
    alpha: f64,
    gamma: f64,
    inner: Mutex<Inner>,
}

impl QLearningController {
    /// Creates a controller with a zeroed Q-table.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        let n_states = config.n_states.max(1);

        Self {
            n_states,
            alpha: config.alpha,
            gamma: config.gamma,
            inner: Mutex::new(Inner {
                q_table: vec![[0.0; Action::COUNT]; n_states],
                epsilon: config.epsilon,
                rng,
            }),
        }
    }

    /// Number of discretised states.
    #[must_use]
    pub const fn n_states(&self) -> usize {
        self.n_states
    }

    /// Maps a state vector to this controller's table row.
    #[must_use]
    pub fn state_index(&self, state: &StateVector) -> usize {
        state_index(state, self.n_states)
    }

    /// Current exploration rate.
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.inner.lock().epsilon
    }

    /// Copy of one Q-table row, `None` when out of range.
    #[must_use]
    pub fn q_values(&self, state_index: usize) -> Option<[f64; Action::COUNT]> {
        self.inner.lock().q_table.get(state_index).copied()
    }

    /// Epsilon-greedy action selection.
    pub fn choose_action(&self, state: &StateVector) -> Action {
        let idx = self.state_index(state);
        let mut inner = self.inner.lock();
        let epsilon = inner.epsilon;
        let index = if inner.rng.gen::<f64>() < epsilon {
            inner.rng.gen_range(0..Action::COUNT)
        } else {
            argmax(&inner.q_table[idx])
        };
        Action::from_index(index).unwrap_or(Action::Sjf)
    }

    /// Greedy action for a state, without exploration or mutation.
    pub fn best_action_for_state(&self, state: &StateVector) -> Action {
        let idx = self.state_index(state);
        let index = argmax(&self.inner.lock().q_table[idx]);
        Action::from_index(index).unwrap_or(Action::Sjf)
    }

    /// Applies one temporal-difference update.
    ///
    /// `Q[s,a] += alpha * (reward + gamma * max Q[ns,_] - Q[s,a])`
    pub fn update(&self, state: &StateVector, action: Action, reward: f64, next_state: &StateVector) {
        let mut inner = self.inner.lock();
        let s = self.state_index(state);
        let ns = self.state_index(next_state);

        let best_next = inner.q_table[ns]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let old = inner.q_table[s][action.index()];
        let new = old + self.alpha * (reward + self.gamma * best_next - old);
        inner.q_table[s][action.index()] = new;
    }

    /// Multiplies epsilon by `factor`, never going below `floor`.
    ///
    /// Returns the new epsilon.
    pub fn decay_epsilon(&self, factor: f64, floor: f64) -> f64 {
        let mut inner = self.inner.lock();
        // min() keeps epsilon non-increasing when it already sits below the floor.
        inner.epsilon = (inner.epsilon * factor).max(floor).min(inner.epsilon);
        inner.epsilon
    }
}

impl std::fmt::Debug for QLearningController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QLearningController")
            .field("n_states", &self.n_states)
            .field("alpha", &self.alpha)
            .field("gamma", &self.gamma)
            .finish_non_exhaustive()
    }
}
