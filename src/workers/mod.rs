pub mod priority_refresh;
pub mod session_sweep;

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::SchedulerDb;

/// Cron-driven background jobs: the periodic priority refresh and the stale
/// session sweep. Jobs only run on the instance flagged as worker leader.
pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    db: Arc<SchedulerDb>,
    config: Arc<Config>,
}

impl WorkerManager {
    pub async fn new(db: Arc<SchedulerDb>, config: Arc<Config>) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await.map_err(WorkerError::Scheduler)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            db,
            config,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        let leader = std::env::var("WORKER_LEADER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if !leader {
            info!("WORKER_LEADER not set, skipping worker startup");
            return Ok(());
        }

        info!("Starting workers (leader mode)");

        let scheduler = self.scheduler.lock().await;

        let enable_priority_refresh = std::env::var("ENABLE_PRIORITY_REFRESH_WORKER")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        if enable_priority_refresh {
            let schedule = std::env::var("PRIORITY_REFRESH_SCHEDULE")
                .unwrap_or_else(|_| "0 */10 * * * *".to_string());
            let db = Arc::clone(&self.db);
            let config = Arc::clone(&self.config);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(&schedule, move |_uuid, _lock| {
                let db = Arc::clone(&db);
                let config = Arc::clone(&config);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        result = priority_refresh::refresh_recent_users(&db, &config) => {
                            if let Err(e) = result {
                                error!(error = %e, "Priority refresh worker error");
                            }
                        }
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!(schedule = %schedule, "Priority refresh worker scheduled");
        }

        let enable_session_sweep = std::env::var("ENABLE_SESSION_SWEEP_WORKER")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        if enable_session_sweep {
            let schedule = std::env::var("SESSION_SWEEP_SCHEDULE")
                .unwrap_or_else(|_| "0 * * * * *".to_string());
            let db = Arc::clone(&self.db);
            let config = Arc::clone(&self.config);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async(&schedule, move |_uuid, _lock| {
                let db = Arc::clone(&db);
                let config = Arc::clone(&config);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        result = session_sweep::sweep_stale_sessions(&db, &config, chrono::Utc::now()) => {
                            if let Err(e) = result {
                                error!(error = %e, "Session sweep worker error");
                            }
                        }
                    }
                })
            })
            .map_err(WorkerError::Scheduler)?;
            scheduler.add(job).await.map_err(WorkerError::Scheduler)?;
            info!(schedule = %schedule, "Session sweep worker scheduled");
        }

        scheduler.start().await.map_err(WorkerError::Scheduler)?;
        info!("All workers started");

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }

        info!("Workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Core error: {0}")]
    Core(#[from] crate::error::SchedulerError),
}
