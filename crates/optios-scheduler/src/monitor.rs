//! Telemetry producer loop.
//!
//! Each cycle samples the system, synthesises the burst and priority
//! estimates, pushes the record into the store, then sleeps for whatever is
//! left of the interval. Failures skip the cycle and are logged.

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::sampler::{MetricsSampler, SystemSample};
use crate::store::TelemetryStore;
use crate::telemetry::TelemetryRecord;

/// Samples system metrics into the telemetry store.
pub struct TelemetryProducer {
    sampler: Arc<dyn MetricsSampler>,
    store: Arc<TelemetryStore>,
    interval: Duration,
    burst_range: [f64; 2],
    priority_range: [f64; 2],
    rng: Mutex<SmallRng>,
}

impl TelemetryProducer {
    /// Creates a producer.
    pub fn new(
        config: &MonitorConfig,
        sampler: Arc<dyn MetricsSampler>,
        store: Arc<TelemetryStore>,
    ) -> Self {
        let rng = config
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        Self {
            sampler,
            store,
            interval: config.interval,
            burst_range: config.burst_range,
            priority_range: config.priority_range,
            rng: Mutex::new(rng),
        }
    }

    /// Takes one sample and builds a record without storing it.
    pub async fn sample_record(&self) -> Result<TelemetryRecord> {
        let sample = self.sampler.sample().await?;
        let record = self.synthesise(&sample);
        record.validate()?;
        Ok(record)
    }

    /// Burst estimate scales with CPU load; priority is uniform noise.
    fn synthesise(&self, sample: &SystemSample) -> TelemetryRecord {
        let (burst, priority) = {
            let mut rng = self.rng.lock();
            let mut uniform = |[lo, hi]: [f64; 2]| if lo < hi { rng.gen_range(lo..hi) } else { lo };
            (uniform(self.burst_range), uniform(self.priority_range))
        };

        TelemetryRecord {
            timestamp: Utc::now(),
            cpu_percent: sample.cpu_percent,
            memory_usage: sample.memory_percent,
            ready_queue_size: sample.process_count,
            avg_burst_time: burst * (sample.cpu_percent / 100.0),
            avg_priority: priority,
        }
    }

    /// Runs one sample-and-push cycle.
    pub async fn run_cycle(&self) -> Result<()> {
        let record = self.sample_record().await?;
        debug!(
            cpu_percent = record.cpu_percent,
            memory_usage = record.memory_usage,
            ready_queue_size = record.ready_queue_size,
            "telemetry collected"
        );
        self.store.add_record(record).await;
        Ok(())
    }

    /// Run the producer loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs_f64(), "telemetry producer started");

        while !cancel.is_cancelled() {
            let started = Instant::now();

            if let Err(e) = self.run_cycle().await {
                warn!(error = %e, "telemetry cycle skipped");
            }

            let remaining = self.interval.saturating_sub(started.elapsed());
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,
                () = tokio::time::sleep(remaining) => {}
            }
        }

        info!("telemetry producer stopped");
    }
}

impl std::fmt::Debug for TelemetryProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryProducer")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
