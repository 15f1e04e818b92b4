//! Standalone mode — every subsystem in one process.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use aura_api::ApiState;
use aura_core::AuraConfig;
use aura_deploy::{BuildQueue, Pipeline, ShellBuildWorker};
use aura_serve::StaticResolver;
use aura_state::{LifecycleTracker, StateStore};
use aura_store::ObjectStoreClient;
use aura_sync::TreeSync;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub async fn run_standalone(config: AuraConfig) -> anyhow::Result<()> {
    info!("Aura daemon starting in standalone mode");

    // ── Initialize subsystems ──────────────────────────────────

    tokio::fs::create_dir_all(&config.state.data_dir)
        .await
        .with_context(|| format!("creating {}", config.state.data_dir.display()))?;
    let db_path = config.state.data_dir.join("aura.redb");
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let client = ObjectStoreClient::from_config(&config.store)?;
    let sync = TreeSync::new(client.clone(), config.sync.max_in_flight);
    let tracker = LifecycleTracker::new(store, config.hosting.clone());
    let abandoned = tracker.fail_unfinished()?;
    if !abandoned.is_empty() {
        warn!(count = abandoned.len(), "failed deployments left unfinished by a previous run");
    }

    let (queue, jobs) = BuildQueue::channel(config.build.queue_capacity, tracker.clone());
    let worker = Arc::new(ShellBuildWorker::new(config.build.clone(), sync.clone()));
    let pipeline = Pipeline::new(tracker.clone(), sync, worker);
    info!(
        workers = config.build.workers,
        queue = config.build.queue_capacity,
        "build pipeline initialized"
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // ── Start build workers ────────────────────────────────────

    let workers = config.build.workers;
    let worker_shutdown = shutdown_rx.clone();
    let workers_handle =
        tokio::spawn(async move { pipeline.run_workers(jobs, workers, worker_shutdown).await });

    // ── Start servers ──────────────────────────────────────────

    let api_router = aura_api::build_router(ApiState {
        tracker,
        queue,
        repo: config.repo.clone(),
    });
    let api_addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
    let api_listener = TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("binding deploy API on {api_addr}"))?;
    info!(addr = %api_addr, "deploy API listening");

    let hosting_router = aura_serve::hosting_router(StaticResolver::new(client));
    let hosting_addr = SocketAddr::from(([0, 0, 0, 0], config.hosting.port));
    let hosting_listener = TcpListener::bind(hosting_addr)
        .await
        .with_context(|| format!("binding static host on {hosting_addr}"))?;
    info!(
        addr = %hosting_addr,
        domain = %config.hosting.base_domain,
        "static host listening"
    );

    let api = axum::serve(api_listener, api_router)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let hosting = axum::serve(hosting_listener, hosting_router)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    let (api_result, hosting_result) = tokio::join!(api, hosting);
    api_result.context("deploy API server")?;
    hosting_result.context("static host server")?;

    // In-flight builds finish before the workers exit.
    if let Err(e) = workers_handle.await {
        error!(error = %e, "build workers panicked");
    }

    info!("Aura daemon stopped");
    Ok(())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}
