//! Optios scheduler binary.
//!
//! Runs the telemetry producer and the trainer until interrupted, logging a
//! policy recommendation at startup and at shutdown.

use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use optios_scheduler::{
    Collaborators, CsvDecisionLog, NullSink, OptiosConfig, OptiosService, PersistenceSink,
    ProcfsSampler, SqliteSink,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("optios_scheduler=info".parse()?),
        )
        .init();

    info!("Optios scheduler starting");

    let config = OptiosConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        OptiosConfig::default()
    });

    info!(
        monitor_interval_secs = config.monitor.interval.as_secs(),
        trainer_interval_secs = config.trainer.interval.as_secs(),
        history_len = config.store.history_len,
        "configuration loaded"
    );

    let sink = open_sink(&config).await;

    let service = OptiosService::start(
        &config,
        Collaborators {
            sampler: Arc::new(ProcfsSampler::new(config.monitor.cpu_sample_window())),
            sink,
            decision_log: Arc::new(CsvDecisionLog::new(&config.decision_log.path)),
        },
    );
    info!(status = ?service.status(), "background loops started");

    log_recommendation(&service, "startup").await;

    shutdown_signal().await;

    log_recommendation(&service, "shutdown").await;
    service.shutdown().await;

    info!("Optios scheduler shutdown complete");
    Ok(())
}

async fn open_sink(config: &OptiosConfig) -> Arc<dyn PersistenceSink> {
    if !config.store.persist {
        info!("persistence disabled");
        return Arc::new(NullSink);
    }

    match SqliteSink::open(&config.store.db_path).await {
        Ok(sink) => {
            match sink.count().await {
                Ok(rows) => info!(path = %config.store.db_path.display(), rows, "telemetry database opened"),
                Err(e) => warn!(error = %e, "failed to count persisted telemetry"),
            }
            Arc::new(sink)
        }
        Err(e) => {
            error!(error = %e, "failed to open telemetry database, records will not be persisted");
            Arc::new(NullSink)
        }
    }
}

async fn log_recommendation(service: &OptiosService, stage: &str) {
    match service.advisor().recommend().await {
        Ok(recommendation) => match serde_json::to_string(&recommendation) {
            Ok(json) => info!(stage, choice = %recommendation.choice, recommendation = %json, "policy recommendation"),
            Err(e) => warn!(error = %e, "failed to serialise recommendation"),
        },
        Err(e) => warn!(stage, error = %e, "failed to build recommendation"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("received SIGTERM, initiating shutdown");
        }
    }
}
