//! Halqa attendance worker.
//!
//! Main entry point that wires all crates together and runs the background
//! attendance pipeline until a shutdown signal arrives.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use halqa_cache::CacheManager;
use halqa_core::config::AppConfig;
use halqa_core::error::{AppError, ErrorKind};
use halqa_core::traits::CacheProvider;
use halqa_database::DatabasePool;
use halqa_database::repositories::{
    AttendanceEventRepository, EarningRepository, JobRepository, MeetingAttendanceRepository,
    ReportRepository, SessionRepository, UserRepository,
};
use halqa_service::{
    AttendanceCalculationService, AttendanceReconciler, EarningsService,
    FlatRateEarningsCalculator, LiveKitRoomClient, MeetingAttendanceRecorder,
    RecordingRetryService, ReportSynchronizer,
};
use halqa_worker::jobs::{
    AttendanceCalculationJobHandler, EarningsJobHandler, EarningsSweepJobHandler,
    QueueMaintenanceJobHandler, ReconcileJobHandler, RecordingRetryJobHandler,
};
use halqa_worker::{CronScheduler, JobExecutor, JobQueue, WorkerRunner};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Worker error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("HALQA_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Halqa attendance worker v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;
    if !db.health_check().await? {
        return Err(AppError::new(ErrorKind::Database, "Database health check failed"));
    }

    tracing::info!("Running database migrations...");
    halqa_database::migration::run_migrations(db.pool()).await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Initialize cache ─────────────────────────────────
    tracing::info!(
        "Initializing cache (provider: {})...",
        config.cache.provider
    );
    let cache: Arc<dyn CacheProvider> = Arc::new(CacheManager::new(&config.cache).await?);
    match cache.health_check().await {
        Ok(true) => tracing::info!("Cache initialized"),
        Ok(false) => tracing::warn!("Cache initialized but health check reported unhealthy"),
        Err(e) => tracing::warn!("Cache health check failed: {}", e),
    }

    // ── Step 3: Initialize repositories ──────────────────────────
    let pool = db.pool().clone();
    let event_repo = Arc::new(AttendanceEventRepository::new(pool.clone()));
    let attendance_repo = Arc::new(MeetingAttendanceRepository::new(pool.clone()));
    let session_repo = Arc::new(SessionRepository::new(pool.clone()));
    let report_repo = Arc::new(ReportRepository::new(pool.clone()));
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let earning_repo = Arc::new(EarningRepository::new(pool.clone()));
    let job_repo = Arc::new(JobRepository::new(pool));

    // ── Step 4: Conferencing provider ────────────────────────────
    let rooms = Arc::new(LiveKitRoomClient::new(&config.livekit)?);
    tracing::info!("LiveKit room client configured for {}", config.livekit.url);

    // ── Step 5: Initialize services ──────────────────────────────
    let reconciler = AttendanceReconciler::new(
        event_repo,
        session_repo.clone(),
        rooms,
        Arc::clone(&cache),
        &config.attendance,
    );
    let calculation = AttendanceCalculationService::new(
        session_repo.clone(),
        attendance_repo.clone(),
        ReportSynchronizer::new(report_repo),
        &config.attendance,
    );
    let earnings = EarningsService::new(
        session_repo.clone(),
        Arc::new(FlatRateEarningsCalculator::new(
            attendance_repo.clone(),
            earning_repo,
            config.earnings.clone(),
        )),
        &config.attendance,
    );
    let recorder = Arc::new(MeetingAttendanceRecorder::new(
        attendance_repo,
        Arc::clone(&cache),
    ));
    let recording_retry = RecordingRetryService::new(session_repo, user_repo, recorder);

    // ── Step 6: Job queue + handlers ─────────────────────────────
    let worker_id = format!("worker-{}", uuid::Uuid::new_v4());
    let queue = Arc::new(JobQueue::new(job_repo, worker_id.clone()));

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(ReconcileJobHandler::new(reconciler)));
    executor.register(Arc::new(AttendanceCalculationJobHandler::new(
        calculation,
        Arc::clone(&queue),
        config.worker.retry_max_attempts,
    )));
    executor.register(Arc::new(EarningsJobHandler::new(earnings.clone())));
    executor.register(Arc::new(EarningsSweepJobHandler::new(earnings)));
    executor.register(Arc::new(RecordingRetryJobHandler::new(recording_retry)));
    executor.register(Arc::new(QueueMaintenanceJobHandler::new(
        Arc::clone(&queue),
        &config.worker,
    )));
    let mut job_types = executor.registered_types();
    job_types.sort();
    tracing::info!("Registered job handlers: {}", job_types.join(", "));
    let executor = Arc::new(executor);

    match queue.stats().await {
        Ok(stats) => tracing::info!(
            "Job queue: pending={}, running={}, failed={}",
            stats.pending,
            stats.running,
            stats.failed
        ),
        Err(e) => tracing::warn!("Failed to read job queue stats: {}", e),
    }

    // ── Step 7: Scheduler + worker ───────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (mut scheduler, worker_handle) = if config.worker.enabled {
        let scheduler = CronScheduler::new(Arc::clone(&queue), config.worker.clone()).await?;
        scheduler.register_default_tasks().await?;
        scheduler.start().await?;

        let runner = WorkerRunner::new(
            Arc::clone(&queue),
            Arc::clone(&executor),
            config.worker.clone(),
            worker_id,
        );
        let worker_cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            runner.run(worker_cancel).await;
        });

        tracing::info!("Background worker started");
        (Some(scheduler), Some(handle))
    } else {
        tracing::info!("Background worker disabled");
        (None, None)
    };

    // ── Step 8: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("Scheduler shutdown failed: {}", e);
        }
    }

    if let Some(handle) = worker_handle {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(30), handle).await;
    }

    db.close().await;
    tracing::info!("Halqa attendance worker shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
